//! CSS selector subset for documents without a native query engine.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`, with the `i` flag),
//! `:not(<compound>)`, `:first-child`, `:disabled`, `:enabled`, selector lists
//! and all four combinators. Anything else is a [`SelectorError`].

use crate::errors::SelectorError;

/// What the matcher needs from a node.
pub trait SelectorSubject: Sized {
    /// Lower-case tag name.
    fn local_name(&self) -> String;
    fn attr(&self, name: &str) -> Option<String>;
    fn parent_element(&self) -> Option<Self>;
    fn prev_sibling_element(&self) -> Option<Self>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse_list()
    }

    pub fn matches<S: SelectorSubject>(&self, subject: &S) -> bool {
        self.selectors
            .iter()
            .any(|complex| matches_at(complex, complex.compounds.len() - 1, subject))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

#[derive(Clone, Debug, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<Pseudo>,
}

#[derive(Clone, Debug, PartialEq)]
enum Pseudo {
    Not(Box<Compound>),
    FirstChild,
    Disabled,
    Enabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Clone, Debug, PartialEq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

impl AttrSelector {
    fn test(&self, actual: Option<String>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        if self.op == AttrOp::Exists {
            return true;
        }
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual, self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttrOp::DashMatch => {
                actual == expected || actual.starts_with(&format!("{expected}-"))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

fn matches_at<S: SelectorSubject>(complex: &Complex, index: usize, subject: &S) -> bool {
    if !compound_matches(&complex.compounds[index], subject) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match complex.combinators[index - 1] {
        Combinator::Child => subject
            .parent_element()
            .map_or(false, |parent| matches_at(complex, index - 1, &parent)),
        Combinator::Descendant => {
            let mut current = subject.parent_element();
            while let Some(ancestor) = current {
                if matches_at(complex, index - 1, &ancestor) {
                    return true;
                }
                current = ancestor.parent_element();
            }
            false
        }
        Combinator::Adjacent => subject
            .prev_sibling_element()
            .map_or(false, |sibling| matches_at(complex, index - 1, &sibling)),
        Combinator::Sibling => {
            let mut current = subject.prev_sibling_element();
            while let Some(sibling) = current {
                if matches_at(complex, index - 1, &sibling) {
                    return true;
                }
                current = sibling.prev_sibling_element();
            }
            false
        }
    }
}

fn compound_matches<S: SelectorSubject>(compound: &Compound, subject: &S) -> bool {
    if let Some(tag) = &compound.tag {
        if subject.local_name() != *tag {
            return false;
        }
    }
    if !compound.ids.is_empty() {
        let id = subject.attr("id");
        if !compound.ids.iter().all(|want| id.as_deref() == Some(want.as_str())) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = subject.attr("class").unwrap_or_default();
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound
            .classes
            .iter()
            .all(|want| classes.contains(&want.as_str()))
        {
            return false;
        }
    }
    if !compound
        .attrs
        .iter()
        .all(|attr| attr.test(subject.attr(&attr.name)))
    {
        return false;
    }
    compound.pseudos.iter().all(|pseudo| match pseudo {
        Pseudo::Not(inner) => !compound_matches(inner, subject),
        Pseudo::FirstChild => subject.prev_sibling_element().is_none(),
        Pseudo::Disabled => subject.attr("disabled").is_some(),
        Pseudo::Enabled => subject.attr("disabled").is_none(),
    })
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                selector: self.source.to_string(),
                found,
                offset: self.pos,
            },
            None => SelectorError::Unterminated {
                selector: self.source.to_string(),
                what: "selector",
            },
        }
    }

    fn expect(&mut self, want: char, what: &'static str) -> Result<(), SelectorError> {
        match self.peek() {
            Some(ch) if ch == want => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SelectorError::Unterminated {
                selector: self.source.to_string(),
                what,
            }),
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::Adjacent,
                Some('~') => Combinator::Sibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_ws();
            }
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator(self.source.to_string()));
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut seen = false;

        if self.peek() == Some('*') {
            self.pos += 1;
            seen = true;
        } else if self.peek().map_or(false, is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            seen = true;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
            seen = true;
        }

        if !seen {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                match self.bump() {
                    Some(escaped) => ident.push(escaped),
                    None => {
                        return Err(SelectorError::Unterminated {
                            selector: self.source.to_string(),
                            what: "escape",
                        })
                    }
                }
            } else if is_ident_char(ch) {
                ident.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.unexpected());
        }
        Ok(ident)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(AttrSelector {
                name,
                op: AttrOp::Exists,
                value: String::new(),
                case_insensitive: false,
            });
        }

        let op = match self.bump() {
            Some('=') => AttrOp::Equals,
            Some(prefix @ ('~' | '|' | '^' | '$' | '*')) => {
                self.expect('=', "attribute operator")?;
                match prefix {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
            None => {
                return Err(SelectorError::Unterminated {
                    selector: self.source.to_string(),
                    what: "attribute selector",
                })
            }
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(ch) if ch == quote => break,
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some(ch) => value.push(ch),
                        None => {
                            return Err(SelectorError::Unterminated {
                                selector: self.source.to_string(),
                                what: "string",
                            })
                        }
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };

        self.skip_ws();
        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            self.pos += 1;
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_ws();
        }
        self.expect(']', "attribute selector")?;

        Ok(AttrSelector {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        if self.peek() == Some(':') {
            return Err(SelectorError::UnsupportedPseudo(":".to_string()));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "not" => {
                self.expect('(', "negation")?;
                self.skip_ws();
                let inner = self.parse_compound()?;
                self.skip_ws();
                self.expect(')', "negation")?;
                Ok(Pseudo::Not(Box::new(inner)))
            }
            "first-child" => Ok(Pseudo::FirstChild),
            "disabled" => Ok(Pseudo::Disabled),
            "enabled" => Ok(Pseudo::Enabled),
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}
