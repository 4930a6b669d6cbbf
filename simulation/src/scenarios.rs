//! Pre-defined and JSON-described scenarios
//!
//! A [`Scenario`] is a topology, optional link changes and scheduled sends.
//! Scenarios can be loaded from JSON:
//!
//! ```json
//! {
//!   "name": "cut",
//!   "horizon": 80,
//!   "edges": [["A", "B"], ["B", "C"]],
//!   "changes": [{ "tick": 42, "change": "DOWN", "from": "B", "to": "C" }],
//!   "sends": [{ "from": "A", "to": "C", "at": 30, "payload": "hello" }]
//! }
//! ```
//!
//! Edges are symmetric and up at tick 0; `changes` are directed.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use olsr_core::{NodeId, Tick};
use olsr_node::ScheduledSend;

use crate::error::{SimError, SimResult};
use crate::schedule::LinkEvent;
use crate::simulation::{SimConfig, Simulation};
use crate::topology::{Topology, TopologyBuilder};

/// A payload one node originates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSpec {
    pub from: NodeId,
    pub to: NodeId,
    pub at: Tick,
    pub payload: String,
}

impl SendSpec {
    pub fn new(from: NodeId, to: NodeId, at: Tick, payload: impl Into<String>) -> Self {
        Self {
            from,
            to,
            at,
            payload: payload.into(),
        }
    }

    pub fn scheduled(&self) -> ScheduledSend {
        ScheduledSend::new(self.to.clone(), self.payload.clone(), self.at)
    }
}

/// Parses `SRC:DST:AT:PAYLOAD`; the payload may itself contain `:`
impl FromStr for SendSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let (Some(from), Some(to), Some(at), Some(payload)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected SRC:DST:AT:PAYLOAD, got {s:?}"));
        };
        let from = NodeId::new(from).map_err(|e| e.to_string())?;
        let to = NodeId::new(to).map_err(|e| e.to_string())?;
        let at = at
            .parse::<Tick>()
            .map_err(|e| format!("bad send tick {at:?}: {e}"))?;
        Ok(Self::new(from, to, at, payload))
    }
}

/// Topology, link changes and sends of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub horizon: Option<Tick>,
    #[serde(default)]
    pub epoch_ms: Option<u64>,
    pub edges: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    pub changes: Vec<LinkEvent>,
    #[serde(default)]
    pub sends: Vec<SendSpec>,
}

impl Scenario {
    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::Scenario(e.to_string()))
    }

    pub fn from_file(path: &Path) -> SimResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn from_topology(name: &str, description: &str, topology: &Topology) -> Self {
        let mut edges = Vec::new();
        for a in topology.node_ids() {
            if let Some(neighbors) = topology.neighbors(&a) {
                for b in neighbors.iter().filter(|b| a < **b) {
                    edges.push((a.clone(), b.clone()));
                }
            }
        }
        Self {
            name: name.to_string(),
            description: description.to_string(),
            horizon: None,
            epoch_ms: None,
            edges,
            changes: Vec::new(),
            sends: Vec::new(),
        }
    }

    pub fn with_send(mut self, send: SendSpec) -> Self {
        self.sends.push(send);
        self
    }

    pub fn with_horizon(mut self, horizon: Tick) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Take the `a`/`b` link down in both directions at `tick`
    pub fn with_link_down(mut self, tick: Tick, a: NodeId, b: NodeId) -> Self {
        self.changes.push(LinkEvent::down(tick, a.clone(), b.clone()));
        self.changes.push(LinkEvent::down(tick, b, a));
        self
    }

    /// Apply the scenario's own horizon and epoch on top of `base`
    pub fn sim_config(&self, base: SimConfig) -> SimConfig {
        let mut config = base;
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(ms) = self.epoch_ms {
            config.epoch = Duration::from_millis(ms);
        }
        config
    }

    pub fn into_simulation(self, base: SimConfig) -> SimResult<Simulation> {
        let config = self.sim_config(base);
        let mut topology = Topology::new();
        for (a, b) in &self.edges {
            topology.connect(a, b);
        }

        let mut schedule = topology.schedule();
        for event in self.changes {
            schedule.push(event);
        }

        let mut sim = Simulation::new(config, schedule);
        for id in topology.node_ids() {
            sim.add_node(id)?;
        }
        sim.add_scheduled_nodes();
        for send in &self.sends {
            sim.schedule_send(&send.from, send.scheduled())?;
        }
        info!(scenario = %self.name, nodes = sim.node_ids().len(), "scenario loaded");
        Ok(sim)
    }
}

/// Names accepted by [`builtin`]
pub const BUILTIN: &[&str] = &["line", "star", "ring", "cut"];

/// Look up a canned scenario by name
pub fn builtin(name: &str) -> Option<Scenario> {
    match name {
        "line" => Some(line_relay()),
        "star" => Some(star_hub()),
        "ring" => Some(ring_detour()),
        "cut" => Some(link_cut()),
        _ => None,
    }
}

/// A - B - C - D - E; A sends to E once routes have converged
pub fn line_relay() -> Scenario {
    let topology = TopologyBuilder::new(5).line();
    let ids = topology.node_ids();
    Scenario::from_topology("line", "Multi-hop relay along a line", &topology)
        .with_send(SendSpec::new(ids[0].clone(), ids[4].clone(), 30, "hello from A"))
}

/// A in the center of six nodes; two leaves talk through the hub
pub fn star_hub() -> Scenario {
    let topology = TopologyBuilder::new(6).star();
    let ids = topology.node_ids();
    Scenario::from_topology("star", "Leaves reach each other through the hub", &topology)
        .with_send(SendSpec::new(ids[1].clone(), ids[5].clone(), 25, "via the hub"))
}

/// Ring of six; the B - C link fails, so B's traffic to D goes the other way
pub fn ring_detour() -> Scenario {
    let topology = TopologyBuilder::new(6).ring();
    let ids = topology.node_ids();
    Scenario::from_topology("ring", "Traffic detours around a failed ring link", &topology)
        .with_link_down(41, ids[1].clone(), ids[2].clone())
        .with_send(SendSpec::new(ids[1].clone(), ids[3].clone(), 90, "the long way"))
}

/// A - B - C; the B - C link fails and a later send is lost
pub fn link_cut() -> Scenario {
    let topology = TopologyBuilder::new(3).line();
    let ids = topology.node_ids();
    Scenario::from_topology("cut", "Data lost on a failed link", &topology)
        .with_link_down(42, ids[1].clone(), ids[2].clone())
        .with_send(SendSpec::new(ids[0].clone(), ids[2].clone(), 50, "into the void"))
        .with_horizon(70)
}
