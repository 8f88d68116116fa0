use thiserror::Error;

/// Malformed or unsupported selector expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected '{found}' at offset {offset} in '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("unterminated {what} in '{selector}'")]
    Unterminated { selector: String, what: &'static str },
    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
    #[error("dangling combinator in '{0}'")]
    DanglingCombinator(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node belongs to another document")]
    ForeignNode,
    #[error("reference node is not a child of the container")]
    NotAChild,
    #[error("insertion would create a cycle")]
    Hierarchy,
    #[error("document has been dropped")]
    Gone,
}
