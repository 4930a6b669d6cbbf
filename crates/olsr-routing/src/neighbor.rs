//! Neighbor table
//!
//! Tracks every node we have heard a HELLO from. A neighbor is either
//! unidirectional (we hear it, it has not confirmed hearing us) or
//! bidirectional; a single map keyed by id keeps the two states disjoint.

use std::collections::{BTreeMap, BTreeSet};

use derive_more::Display;
use tracing::{debug, trace};

use olsr_core::{NodeId, Tick};

/// Link state of a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LinkState {
    #[display("UNIDIR")]
    Unidirectional,
    #[display("BIDIR")]
    Bidirectional,
}

/// A one-hop neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub id: NodeId,
    pub link: LinkState,
    /// Neighbor's advertised BIDIR set without ourselves; empty until the
    /// link becomes bidirectional
    pub two_hop: BTreeSet<NodeId>,
    pub last_heard: Tick,
}

impl Neighbor {
    pub fn is_bidirectional(&self) -> bool {
        self.link == LinkState::Bidirectional
    }
}

/// Neighbors of one node
#[derive(Debug, Clone)]
pub struct NeighborTable {
    local_id: NodeId,
    neighbors: BTreeMap<NodeId, Neighbor>,
}

impl NeighborTable {
    /// Create an empty table for `local_id`
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            neighbors: BTreeMap::new(),
        }
    }

    /// Apply a HELLO from `neighbor` heard at `now`
    ///
    /// A bidirectional neighbor stays bidirectional and refreshes its two-hop
    /// set. Any other neighbor becomes bidirectional once it lists us in its
    /// advertised UNIDIR or BIDIR set, and is (or stays) unidirectional
    /// otherwise. Returns the resulting link state.
    pub fn hello(
        &mut self,
        neighbor: &NodeId,
        unidir: &BTreeSet<NodeId>,
        bidir: &BTreeSet<NodeId>,
        now: Tick,
    ) -> LinkState {
        let already_bidir = self
            .neighbors
            .get(neighbor)
            .is_some_and(Neighbor::is_bidirectional);
        let hears_us = bidir.contains(&self.local_id) || unidir.contains(&self.local_id);

        if already_bidir || hears_us {
            let two_hop: BTreeSet<NodeId> = bidir
                .iter()
                .filter(|id| **id != self.local_id)
                .cloned()
                .collect();
            if !already_bidir {
                debug!(node = %self.local_id, neighbor = %neighbor, "link became bidirectional");
            }
            self.neighbors.insert(
                neighbor.clone(),
                Neighbor {
                    id: neighbor.clone(),
                    link: LinkState::Bidirectional,
                    two_hop,
                    last_heard: now,
                },
            );
            return LinkState::Bidirectional;
        }

        trace!(node = %self.local_id, neighbor = %neighbor, "unidirectional hello");
        self.neighbors
            .entry(neighbor.clone())
            .and_modify(|n| n.last_heard = now)
            .or_insert_with(|| Neighbor {
                id: neighbor.clone(),
                link: LinkState::Unidirectional,
                two_hop: BTreeSet::new(),
                last_heard: now,
            });
        LinkState::Unidirectional
    }

    /// Remove every neighbor last heard strictly before `deadline`
    pub fn evict_heard_before(&mut self, deadline: Tick) -> Vec<NodeId> {
        let stale: Vec<NodeId> = self
            .neighbors
            .values()
            .filter(|n| n.last_heard < deadline)
            .map(|n| n.id.clone())
            .collect();
        for id in &stale {
            self.neighbors.remove(id);
        }
        stale
    }

    pub fn get(&self, id: &NodeId) -> Option<&Neighbor> {
        self.neighbors.get(id)
    }

    pub fn link_state(&self, id: &NodeId) -> Option<LinkState> {
        self.neighbors.get(id).map(|n| n.link)
    }

    fn with_state(&self, link: LinkState) -> BTreeSet<NodeId> {
        self.neighbors
            .values()
            .filter(|n| n.link == link)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Ids of unidirectional neighbors
    pub fn unidir(&self) -> BTreeSet<NodeId> {
        self.with_state(LinkState::Unidirectional)
    }

    /// Ids of bidirectional neighbors
    pub fn bidir(&self) -> BTreeSet<NodeId> {
        self.with_state(LinkState::Bidirectional)
    }

    /// Two-hop sets of all bidirectional neighbors, taken as one snapshot
    pub fn coverage(&self) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        self.neighbors
            .values()
            .filter(|n| n.is_bidirectional())
            .map(|n| (n.id.clone(), n.two_hop.clone()))
            .collect()
    }

    /// Union of the two-hop sets of all bidirectional neighbors
    pub fn two_hop(&self) -> BTreeSet<NodeId> {
        self.neighbors
            .values()
            .filter(|n| n.is_bidirectional())
            .flat_map(|n| n.two_hop.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.values()
    }
}
