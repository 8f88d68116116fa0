//! Loading pages and profile lists from disk.

use std::path::Path;

use dom_port::MemoryDocument;
use profile_center::{load_profiles_file, Profile};
use tracing::debug;

use crate::errors::DockwrightResult;

/// Build an in-memory document from a JSON page fixture.
pub fn load_page(path: &Path) -> DockwrightResult<MemoryDocument> {
    let raw = std::fs::read_to_string(path)?;
    let page = MemoryDocument::from_json(&raw)?;
    debug!(target: "dockwright::dom", path = %path.display(), "page fixture loaded");
    Ok(page)
}

/// Read and validate a JSON or YAML profile list.
pub fn load_profiles(path: &Path) -> DockwrightResult<Vec<Profile>> {
    Ok(load_profiles_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DockwrightError;
    use dom_port::Document;

    #[test]
    fn fixture_errors_are_classified() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_page(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, DockwrightError::Io(_)));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ nope").unwrap();
        assert!(matches!(load_page(&broken), Err(DockwrightError::Fixture(_))));

        let ok = dir.path().join("page.json");
        std::fs::write(&ok, r#"{"url": "https://a.example/", "body": []}"#).unwrap();
        assert_eq!(load_page(&ok).unwrap().url(), "https://a.example/");
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.yaml");
        std::fs::write(&path, "- id: ''\n  domainPattern: a.example\n").unwrap();
        assert!(matches!(load_profiles(&path), Err(DockwrightError::Profile(_))));
    }
}
