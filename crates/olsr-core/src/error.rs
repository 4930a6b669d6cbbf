//! Error types for the OLSR simulator

use thiserror::Error;

/// Errors related to node identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Node id must not be empty")]
    Empty,

    #[error("Node id contains whitespace: {0:?}")]
    ContainsWhitespace(String),

    #[error("Node id is a reserved token: {0}")]
    Reserved(String),
}

/// Errors produced while decoding a wire line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("Empty line")]
    Empty,

    #[error("Line too short: {0:?}")]
    Truncated(String),

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    #[error("Missing keyword {keyword} in {kind} message")]
    MissingKeyword {
        kind: &'static str,
        keyword: &'static str,
    },

    #[error("Broadcast message must start with '*', got {0:?}")]
    NotBroadcast(String),

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(String),

    #[error("Invalid node id: {0}")]
    Identity(#[from] IdentityError),
}

/// Errors related to transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Channel closed")]
    Closed,
}
