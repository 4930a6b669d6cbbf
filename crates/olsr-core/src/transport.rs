//! Transport abstraction for wire lines
//!
//! The routing core never knows how a line written by one node becomes
//! visible to another. It only needs an ordered outbound sink and an ordered
//! inbound source, which is what [`Transport`] provides.
//!
//! ## Implementations
//!
//! - [`ChannelTransport`]: bounded in-memory channels; the opposite ends
//!   ([`ChannelPeer`]) are held by whatever delivers lines between nodes
//!   (the simulation controller, or a test).

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::error::TransportError;

/// Default bound of each direction of a [`ChannelTransport`]
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Ordered line transport seen from a node
///
/// Implementations must be FIFO in both directions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a line on the outbound channel
    async fn send(&self, line: String) -> Result<(), TransportError>;

    /// Wait for the next inbound line
    ///
    /// Returns `Ok(None)` once the inbound side is closed and drained.
    async fn recv(&self) -> Result<Option<String>, TransportError>;
}

/// In-memory transport backed by two bounded `mpsc` channels
pub struct ChannelTransport {
    outbound: mpsc::Sender<String>,
    inbound: Mutex<mpsc::Receiver<String>>,
}

/// The far side of a [`ChannelTransport`]
///
/// Whoever holds it pushes lines into the node's inbox and drains the node's
/// outbox.
pub struct ChannelPeer {
    /// Lines delivered to the node
    pub inbox: mpsc::Sender<String>,
    /// Lines the node sent
    pub outbox: mpsc::Receiver<String>,
}

impl ChannelTransport {
    /// Create a transport and its far side with the default capacity
    pub fn new() -> (Self, ChannelPeer) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a transport and its far side with a specific capacity
    pub fn with_capacity(capacity: usize) -> (Self, ChannelPeer) {
        let (outbound, outbox) = mpsc::channel(capacity);
        let (inbox, inbound) = mpsc::channel(capacity);
        (
            Self {
                outbound,
                inbound: Mutex::new(inbound),
            },
            ChannelPeer { inbox, outbox },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, line: String) -> Result<(), TransportError> {
        self.outbound
            .send(line)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        Ok(inbound.recv().await)
    }
}
