//! Placeholder references — the `thermos.ports[http]` inside `{{...}}`.
//!
//! A ref is an address made of components: dotted members (`.name`) and
//! bracketed indexes (`[key]`). The first component is always a member.
//! Refs compare by their parsed components, so surrounding whitespace in
//! the address does not matter.

use std::fmt;
use std::str::FromStr;

/// One step of a ref address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Component {
    /// `.name`
    Member(String),
    /// `[key]`
    Index(String),
}

/// A parsed placeholder address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefError {
    #[error("empty ref address")]
    Empty,
    #[error("invalid ref address {0:?}")]
    Invalid(String),
}

fn is_member_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_index_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl Ref {
    /// Parse an address such as `thermos.ports[http]`.
    pub fn from_address(address: &str) -> Result<Self, RefError> {
        let invalid = || RefError::Invalid(address.to_string());

        let mut rest = address.trim();
        if rest.is_empty() {
            return Err(RefError::Empty);
        }

        let mut components = Vec::new();
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix('[') {
                if components.is_empty() {
                    return Err(invalid());
                }
                let end = tail.find(']').ok_or_else(invalid)?;
                let key = &tail[..end];
                if key.is_empty() || !key.chars().all(is_index_char) {
                    return Err(invalid());
                }
                components.push(Component::Index(key.to_string()));
                rest = &tail[end + 1..];
            } else {
                let body = if components.is_empty() {
                    rest
                } else {
                    rest.strip_prefix('.').ok_or_else(invalid)?
                };
                let end = body.find(['.', '[']).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() || !name.chars().all(is_member_char) {
                    return Err(invalid());
                }
                components.push(Component::Member(name.to_string()));
                rest = &body[end..];
            }
        }

        Ok(Self { components })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// True when this ref lives strictly underneath `prefix`.
    ///
    /// `thermos.ports[http]` and `thermos.ports.http` are subscopes of
    /// `thermos.ports`; `thermos.ports` itself is not.
    pub fn is_subscope_of(&self, prefix: &Ref) -> bool {
        self.components.len() > prefix.components.len()
            && self.components.starts_with(&prefix.components)
    }
}

impl FromStr for Ref {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_address(s)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            match component {
                Component::Member(name) if i == 0 => write!(f, "{name}")?,
                Component::Member(name) => write!(f, ".{name}")?,
                Component::Index(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}
