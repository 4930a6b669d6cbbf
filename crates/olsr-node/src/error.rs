//! Error types for the node

use thiserror::Error;

use olsr_core::TransportError;

/// Errors that can stop a node
///
/// Malformed inbound lines are not among them: those are logged and dropped.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A node task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for NodeError {
    fn from(e: tokio::task::JoinError) -> Self {
        NodeError::Task(e.to_string())
    }
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
