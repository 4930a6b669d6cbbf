//! Error types for the simulation crate

use thiserror::Error;

use olsr_core::{IdentityError, NodeId};
use olsr_node::NodeError;

/// Errors while reading a link schedule
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Failed to read schedule: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors of a simulation run
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Simulation has no nodes")]
    NoNodes,

    #[error("Epoch length must be greater than zero")]
    ZeroEpoch,

    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    #[error("Scheduled send from unknown node: {0}")]
    UnknownSender(NodeId),

    #[error("Invalid node id: {0}")]
    Identity(#[from] IdentityError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
