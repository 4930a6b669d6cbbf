//! Node identity
//!
//! A [`NodeId`] is an opaque, whitespace-free token. Simulations usually name
//! nodes with a single capital letter ('A'..'Z') or a small number, but any
//! token that survives the line-oriented wire format is accepted.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Tokens with a fixed meaning on the wire; a node may not be named after them.
pub const RESERVED_TOKENS: &[&str] = &["*", "HELLO", "TC", "DATA", "UNIDIR", "BIDIR", "MPR", "MS"];

/// Identifier of a node in the ad-hoc network
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id, validating it against the wire format
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(IdentityError::ContainsWhitespace(id));
        }
        if RESERVED_TOKENS.contains(&id.as_str()) {
            return Err(IdentityError::Reserved(id));
        }
        Ok(Self(id))
    }

    /// Create an id from a single capital letter, as the topology builders do
    pub fn from_letter(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(Self(c.to_string()))
        } else {
            None
        }
    }

    /// Generate all letter ids from 'A' to the given letter (inclusive)
    pub fn range_to(end: char) -> Vec<Self> {
        ('A'..=end).filter_map(Self::from_letter).collect()
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_creation() {
        assert!(NodeId::new("A").is_ok());
        assert!(NodeId::new("node-7").is_ok());
        assert_eq!(NodeId::new(""), Err(IdentityError::Empty));
        assert!(matches!(
            NodeId::new("a b"),
            Err(IdentityError::ContainsWhitespace(_))
        ));
        assert!(matches!(NodeId::new("MPR"), Err(IdentityError::Reserved(_))));
        assert!(matches!(NodeId::new("*"), Err(IdentityError::Reserved(_))));
    }

    #[test]
    fn test_letter_range() {
        let ids = NodeId::range_to('C');
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0].as_str(), "A");
        assert_eq!(ids[2].as_str(), "C");
        assert!(NodeId::from_letter('a').is_none());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a: NodeId = "A".parse().unwrap();
        let b: NodeId = "B".parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_try_from_string_validates() {
        assert!(NodeId::try_from("HELLO".to_string()).is_err());
        let id = NodeId::try_from("7".to_string()).unwrap();
        assert_eq!(String::from(id), "7");
    }
}
