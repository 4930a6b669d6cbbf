//! Routing timeouts

use serde::{Deserialize, Serialize};

use olsr_core::Tick;

/// Hold times of the timeout sweep, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// A neighbor last heard more than this many ticks ago is evicted
    pub neighbor_hold: Tick,
    /// A topology row received more than this many ticks ago is evicted
    pub topology_hold: Tick,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            neighbor_hold: 15,
            topology_hold: 30,
        }
    }
}

impl RoutingConfig {
    /// Set the neighbor hold time
    pub fn with_neighbor_hold(mut self, ticks: Tick) -> Self {
        self.neighbor_hold = ticks;
        self
    }

    /// Set the topology hold time
    pub fn with_topology_hold(mut self, ticks: Tick) -> Self {
        self.topology_hold = ticks;
        self
    }
}
