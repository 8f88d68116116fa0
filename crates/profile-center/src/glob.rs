//! URL path globs.
//!
//! `**` spans any number of path segments, `*` stays inside one segment, `?`
//! is exactly one character, everything else is literal. The compiled
//! expression is anchored at both ends.

use regex::Regex;

pub fn glob_to_pattern(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len() * 2 + 2);
    pattern.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pattern.push_str(".*");
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push('.'),
            literal => {
                let mut buf = [0u8; 4];
                pattern.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
            }
        }
    }
    pattern.push('$');
    pattern
}

pub fn compile(glob: &str) -> Result<Regex, regex::Error> {
    Regex::new(&glob_to_pattern(glob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_star_stays_in_segment() {
        let re = compile("/c/*").unwrap();
        assert!(re.is_match("/c/abc"));
        assert!(!re.is_match("/c/abc/def"));
    }

    #[test]
    fn double_star_spans_segments() {
        let re = compile("/c/**").unwrap();
        assert!(re.is_match("/c/abc"));
        assert!(re.is_match("/c/abc/def"));
        assert!(!re.is_match("/d/abc"));
    }

    #[test]
    fn question_mark_and_literal_dots() {
        let re = compile("/v?/page.html").unwrap();
        assert!(re.is_match("/v1/page.html"));
        assert!(!re.is_match("/v1/pageXhtml"));
        assert!(!re.is_match("/v10/page.html"));
    }

    #[test]
    fn anchored_at_both_ends() {
        let re = compile("/chat").unwrap();
        assert!(re.is_match("/chat"));
        assert!(!re.is_match("/chat/1"));
        assert!(!re.is_match("/x/chat"));
    }

    #[test]
    fn double_star_is_not_split_into_two_singles() {
        assert_eq!(glob_to_pattern("/a/**"), "^/a/.*$");
        assert_eq!(glob_to_pattern("/a/*"), "^/a/[^/]*$");
    }
}
