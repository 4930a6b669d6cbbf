//! # OLSR Node
//!
//! One simulated OLSR node: the epoch schedule that emits HELLO, TC and
//! scheduled DATA lines, and the inbound loop that applies received lines to
//! the node's routing state.
//!
//! ## Core Components
//!
//! - [`NodeConfig`]: Identity, optional scheduled payload, horizon and timing
//! - [`NodeState`]: Routing engine, TC dedup cache and pending payload of one
//!   node, with the HELLO / TC handlers and the epoch actions
//! - [`Forwarder`]: DATA delivery and hop-by-hop forwarding
//! - [`Node`] / [`NodeHandle`]: Spawned epoch and inbound loops, joined into
//!   a [`NodeReport`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use olsr_core::{LogicalClock, Metronome, NodeId};
//! use olsr_node::{Node, NodeConfig};
//!
//! let clock = LogicalClock::shared();
//! let metronome = Metronome::new(clock.clone(), Duration::from_secs(1));
//! let (node, peer) = Node::with_channel(NodeConfig::new(NodeId::new("A")?), clock, metronome.subscribe());
//! let handle = node.spawn();
//! metronome.run(120).await;
//! let report = handle.join().await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod forward;
pub mod state;

// Re-export main types
pub use config::{DEFAULT_HORIZON, NodeConfig, ProtocolTiming, ScheduledSend};
pub use dispatcher::{Node, NodeHandle, NodeReport};
pub use error::{NodeError, NodeResult};
pub use forward::{Delivery, ForwardAction, Forwarder};
pub use state::{EpochAction, NodeState};
