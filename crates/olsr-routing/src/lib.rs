//! # OLSR Routing
//!
//! Per-node routing state for an OLSR-style link-state protocol.
//!
//! Everything in this crate is owned by exactly one node and mutated only
//! through the operations of [`RoutingEngine`]. Time comes from the run's
//! shared [`olsr_core::LogicalClock`].
//!
//! ## Core Components
//!
//! - [`NeighborTable`]: Link state (unidirectional / bidirectional), advertised
//!   two-hop sets and last-heard ticks of every neighbor
//! - [`select_mpr`]: Greedy two-hop cover producing the multipoint relay set
//! - [`VersionedSet`]: Content-versioned set used for the MPR and MS sets
//! - [`TopologyStore`]: `(destination, last hop)` rows learned from TC messages
//! - [`RouteTable`] / [`SharedRouteTable`]: Shortest hop-count table, replaced
//!   atomically on every recomputation
//! - [`TcDedupCache`]: Per-originator TC loop suppression
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use olsr_core::{LogicalClock, NodeId};
//! use olsr_routing::{RoutingConfig, RoutingEngine};
//!
//! let clock = LogicalClock::shared();
//! let mut engine = RoutingEngine::new(NodeId::new("A")?, clock, RoutingConfig::default());
//!
//! // B heard us: B becomes a bidirectional neighbor
//! engine.hello_update(&b, &unidir, &bidir, &mpr);
//! assert_eq!(engine.routes().next_hop(&b), Some(b.clone()));
//! ```

pub mod config;
pub mod dedup;
pub mod engine;
pub mod mpr;
pub mod neighbor;
pub mod table;
pub mod topology;
pub mod versioned;

// Re-export main types
pub use config::RoutingConfig;
pub use dedup::TcDedupCache;
pub use engine::{HelloSnapshot, RoutingEngine, SweepReport};
pub use mpr::select_mpr;
pub use neighbor::{LinkState, Neighbor, NeighborTable};
pub use table::{Route, RouteTable, SharedRouteTable};
pub use topology::{TcOutcome, TopologyEntry, TopologyStore};
pub use versioned::VersionedSet;
