//! # OLSR Core
//!
//! Core types shared by every crate of the OLSR simulator.
//!
//! This crate provides the foundational pieces the routing engine and the
//! node dispatcher are built on:
//!
//! - [`NodeId`]: Opaque node identifier used as a map key throughout
//! - [`LogicalClock`]: The one time source of a simulation run
//! - [`Metronome`]: Drives a [`LogicalClock`] once per epoch and publishes ticks
//! - [`Message`]: The line-oriented HELLO / TC / DATA wire format
//! - [`Transport`]: FIFO line transport abstraction, with the in-memory
//!   [`ChannelTransport`] implementation

pub mod clock;
pub mod error;
pub mod identity;
pub mod message;
pub mod transport;

// Re-export main types
pub use clock::{LogicalClock, Metronome, Tick};
pub use error::*;
pub use identity::NodeId;
pub use message::{DataMessage, HelloMessage, Message, MessageKind, TcMessage};
pub use transport::{ChannelPeer, ChannelTransport, Transport};
