//! Network topologies
//!
//! Builds the link schedules most runs start from:
//! - Line: A - B - C - ...
//! - Ring: a line whose ends are joined
//! - Star: A in the center, linked to every other node
//! - Full mesh: every node linked to every other
//! - Random: each pair linked with a given probability
//! - Custom: from an edge list
//!
//! Every edge is symmetric and up from tick 0. Failures are added afterwards
//! with [`Topology::with_link_down`].

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use olsr_core::{NodeId, Tick};

use crate::schedule::{LinkChange, LinkSchedule};

/// Nodes, their symmetric edges, and the scheduled changes on top
#[derive(Debug, Clone, Default)]
pub struct Topology {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    changes: Vec<(Tick, LinkChange, NodeId, NodeId)>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: NodeId) {
        self.adjacency.entry(id).or_default();
    }

    /// Link two nodes in both directions from tick 0
    pub fn connect(&mut self, a: &NodeId, b: &NodeId) {
        if a == b {
            return;
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b.clone()).or_default().insert(a.clone());
    }

    /// Take the `a`/`b` link down in both directions at `tick`
    pub fn with_link_down(mut self, tick: Tick, a: &NodeId, b: &NodeId) -> Self {
        self.changes.push((tick, LinkChange::Down, a.clone(), b.clone()));
        self
    }

    /// Bring the `a`/`b` link up in both directions at `tick`
    pub fn with_link_up(mut self, tick: Tick, a: &NodeId, b: &NodeId) -> Self {
        self.add_node(a.clone());
        self.add_node(b.clone());
        self.changes.push((tick, LinkChange::Up, a.clone(), b.clone()));
        self
    }

    pub fn neighbors(&self, id: &NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(id)
    }

    pub fn are_connected(&self, a: &NodeId, b: &NodeId) -> bool {
        self.adjacency.get(a).is_some_and(|n| n.contains(b))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.adjacency.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// The link schedule: every edge up at tick 0, then the added changes
    pub fn schedule(&self) -> LinkSchedule {
        let mut schedule = LinkSchedule::new();
        for (a, neighbors) in &self.adjacency {
            for b in neighbors.iter().filter(|b| a < *b) {
                schedule.push_symmetric(0, LinkChange::Up, a, b);
            }
        }
        for (tick, change, a, b) in &self.changes {
            schedule.push_symmetric(*tick, *change, a, b);
        }
        schedule
    }

    /// Simple ASCII view of the tick-0 edges
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Topology:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Edges: {}\n\n", self.edge_count()));

        for (id, neighbors) in &self.adjacency {
            let names: Vec<&str> = neighbors.iter().map(NodeId::as_str).collect();
            output.push_str(&format!("  {} -> [{}]\n", id, names.join(", ")));
        }
        for (tick, change, a, b) in &self.changes {
            output.push_str(&format!("  @{tick} {change} {a} <-> {b}\n"));
        }
        output
    }
}

/// Builder for the standard shapes over nodes A, B, C, ...
pub struct TopologyBuilder {
    nodes: Vec<NodeId>,
}

impl TopologyBuilder {
    /// Nodes named 'A' onwards; at most 26
    pub fn new(node_count: usize) -> Self {
        let nodes = ('A'..='Z')
            .take(node_count)
            .filter_map(NodeId::from_letter)
            .collect();
        Self { nodes }
    }

    fn isolated(&self) -> Topology {
        let mut topology = Topology::new();
        for id in &self.nodes {
            topology.add_node(id.clone());
        }
        topology
    }

    pub fn line(self) -> Topology {
        let mut topology = self.isolated();
        for pair in self.nodes.windows(2) {
            topology.connect(&pair[0], &pair[1]);
        }
        topology
    }

    pub fn ring(self) -> Topology {
        let mut topology = self.isolated();
        let n = self.nodes.len();
        for i in 0..n {
            topology.connect(&self.nodes[i], &self.nodes[(i + 1) % n]);
        }
        topology
    }

    pub fn star(self) -> Topology {
        let mut topology = self.isolated();
        if let Some((center, leaves)) = self.nodes.split_first() {
            for leaf in leaves {
                topology.connect(center, leaf);
            }
        }
        topology
    }

    pub fn full_mesh(self) -> Topology {
        let mut topology = self.isolated();
        for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                topology.connect(a, b);
            }
        }
        topology
    }

    /// Link each pair with `probability`, then give isolated nodes one edge
    pub fn random(self, probability: f64) -> Topology {
        let mut topology = self.isolated();
        let mut rng = rand::rng();

        for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                if rng.random::<f64>() < probability {
                    topology.connect(a, b);
                }
            }
        }

        if self.nodes.len() > 1 {
            for (i, id) in self.nodes.iter().enumerate() {
                if topology.neighbors(id).is_some_and(BTreeSet::is_empty) {
                    // Any index but our own
                    let other = (i + rng.random_range(1..self.nodes.len())) % self.nodes.len();
                    topology.connect(id, &self.nodes[other]);
                }
            }
        }
        topology
    }
}

/// Build a topology from an edge list of node letters
pub fn from_edges(edges: &[(char, char)]) -> Topology {
    let mut topology = Topology::new();
    for (a, b) in edges {
        if let (Some(a), Some(b)) = (NodeId::from_letter(*a), NodeId::from_letter(*b)) {
            topology.connect(&a, &b);
        }
    }
    topology
}
