//! Configuration for a simulated node

use std::time::Duration;

use serde::{Deserialize, Serialize};

use olsr_core::{NodeId, Tick};
use olsr_core::transport::DEFAULT_CHANNEL_CAPACITY;
use olsr_routing::RoutingConfig;

/// Last tick on which a node still runs its epoch actions
pub const DEFAULT_HORIZON: Tick = 120;

/// Periods and phases of the epoch actions, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTiming {
    /// HELLO on every tick divisible by this
    pub hello_interval: Tick,
    /// TC period
    pub tc_interval: Tick,
    /// TC on ticks where `tick % tc_interval == tc_phase`
    pub tc_phase: Tick,
    /// TC dedup cache cleared where `tick % tc_interval == dedup_reset_phase`
    pub dedup_reset_phase: Tick,
    /// Delay before retrying a scheduled send that found no route
    pub data_retry: Tick,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            hello_interval: 5,
            tc_interval: 10,
            tc_phase: 0,
            dedup_reset_phase: 8,
            data_retry: 30,
        }
    }
}

impl ProtocolTiming {
    pub fn hello_due(&self, now: Tick) -> bool {
        self.hello_interval > 0 && now % self.hello_interval == 0
    }

    pub fn tc_due(&self, now: Tick) -> bool {
        self.tc_interval > 0 && now % self.tc_interval == self.tc_phase
    }

    pub fn dedup_reset_due(&self, now: Tick) -> bool {
        self.tc_interval > 0 && now % self.tc_interval == self.dedup_reset_phase
    }
}

/// Application payload a node originates once a route exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSend {
    pub destination: NodeId,
    pub payload: String,
    /// Tick of the next attempt
    pub at: Tick,
}

impl ScheduledSend {
    pub fn new(destination: NodeId, payload: impl Into<String>, at: Tick) -> Self {
        Self {
            destination,
            payload: payload.into(),
            at,
        }
    }
}

/// Configuration for one node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node identity
    pub id: NodeId,
    /// Optional outbound payload
    pub scheduled_send: Option<ScheduledSend>,
    /// Epoch actions stop once the clock exceeds this
    pub horizon: Tick,
    /// Time the inbound loop keeps draining after shutdown
    pub grace: Duration,
    /// Bound of the node's inbound and outbound channels
    pub channel_capacity: usize,
    /// Epoch action schedule
    pub timing: ProtocolTiming,
    /// Hold times of routing state
    pub routing: RoutingConfig,
}

impl NodeConfig {
    /// Create a configuration with defaults for `id`
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            scheduled_send: None,
            horizon: DEFAULT_HORIZON,
            grace: Duration::from_secs(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            timing: ProtocolTiming::default(),
            routing: RoutingConfig::default(),
        }
    }

    /// Schedule one outbound payload
    pub fn with_scheduled_send(mut self, send: ScheduledSend) -> Self {
        self.scheduled_send = Some(send);
        self
    }

    /// Set the horizon
    pub fn with_horizon(mut self, horizon: Tick) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the shutdown grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Set the channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the epoch action schedule
    pub fn with_timing(mut self, timing: ProtocolTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set the routing hold times
    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }
}
