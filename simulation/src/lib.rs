//! # OLSR Simulation
//!
//! Runs a set of OLSR nodes over an in-memory link layer whose links come
//! and go on a schedule.
//!
//! ## Architecture
//!
//! - **Schedule** (`schedule.rs`): `<tick> <UP|DOWN> <from> <to>` link events
//!   and the live set of directed links
//! - **Controller** (`controller.rs`): Per-sender forwarding of node output to
//!   the receivers the link set allows
//! - **Topology** (`topology.rs`): Line, ring, star, full and random shapes
//! - **Simulation** (`simulation.rs`): One clock, one metronome, every node,
//!   joined into a [`SimReport`]
//! - **Scenarios** (`scenarios.rs`): Canned and JSON-described runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use olsr_simulation::*;
//!
//! let topology = TopologyBuilder::new(4).line();
//! let mut sim = Simulation::from_topology(SimConfig::default(), &topology);
//! sim.schedule_send(&NodeId::new("A")?, ScheduledSend::new(NodeId::new("D")?, "hi", 30))?;
//!
//! let report = sim.run().await?;
//! assert_eq!(report.route(&NodeId::new("A")?, &NodeId::new("D")?).unwrap().hop_count, 3);
//! ```

pub mod controller;
pub mod error;
pub mod scenarios;
pub mod schedule;
pub mod simulation;
pub mod topology;

// Re-export main types
pub use controller::{Controller, ControllerStats};
pub use error::{ScheduleError, SimError, SimResult};
pub use scenarios::{Scenario, SendSpec};
pub use schedule::{LinkChange, LinkEvent, LinkSchedule, LinkSet};
pub use simulation::{SimConfig, SimReport, Simulation};
pub use topology::{Topology, TopologyBuilder, from_edges};

// Re-export the types a run is configured with
pub use olsr_core::{NodeId, Tick};
pub use olsr_node::{Delivery, NodeReport, ScheduledSend};
