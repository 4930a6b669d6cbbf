//! Node context for multi-node logging
//!
//! Every node of a run executes its loops inside the span returned by
//! [`NodeContext::span`], so each event it emits carries the node's id and a
//! per-run instance id. Spans follow async tasks across worker threads, so
//! the context survives `.instrument(..)` boundaries.

use olsr_core::NodeId;
use tracing::Span;
use uuid::Uuid;

/// Identity fields attached to a node's log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    /// The node's identity as a string
    pub node_id: String,
    /// Unique instance ID for this node's run
    pub instance_id: Uuid,
}

impl NodeContext {
    /// Create a context with a fresh instance ID
    pub fn new(node: &NodeId) -> Self {
        Self::with_instance_id(node, Uuid::new_v4())
    }

    /// Create a context with a specific instance ID
    ///
    /// Useful when several components of one node should share an instance.
    pub fn with_instance_id(node: &NodeId, instance_id: Uuid) -> Self {
        Self {
            node_id: node.to_string(),
            instance_id,
        }
    }

    /// Span carrying `node_id` and `instance_id`
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "node",
            node_id = %self.node_id,
            instance_id = %self.instance_id
        )
    }
}
