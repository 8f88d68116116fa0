use dockwright_core_types::AnchorEdge;

use crate::model::Profile;

/// Built-in profiles used when the store holds none.
pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile::new("chatgpt", "chatgpt.com")
            .with_selectors([
                "#prompt-textarea",
                "div[contenteditable='true'].ProseMirror",
                "textarea[data-id='root']",
            ])
            .with_platform("chatgpt"),
        Profile::new("claude", "claude.ai")
            .with_selectors([
                "fieldset div[contenteditable='true'].ProseMirror",
                "div[contenteditable='true'][aria-label*='prompt' i]",
            ])
            .with_platform("claude"),
        Profile::new("gemini", "gemini.google.com")
            .with_selectors([
                "rich-textarea div.ql-editor[contenteditable='true']",
                "div[role='textbox'][contenteditable='true']",
            ])
            .with_platform("gemini"),
        Profile::new("gmail-compose", "mail.google.com")
            .with_selectors([
                "div[aria-label='Message Body'][contenteditable='true']",
                "div[role='textbox'][g_editable='true']",
            ])
            .with_platform("gmail"),
        Profile::new("linkedin-messaging", "*.linkedin.com")
            .with_path("/messaging/**")
            .with_selectors([".msg-form__contenteditable[contenteditable='true']"])
            .floating(AnchorEdge::Right, 8.0, 0.0),
        Profile::new("x-compose", "x.com")
            .with_selectors(["div[data-testid='tweetTextarea_0']"])
            .floating(AnchorEdge::Bottom, 0.0, 8.0),
    ]
}
