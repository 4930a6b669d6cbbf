//! Topology store built from TC messages
//!
//! Each row says "destination is reachable via last hop, as of sequence
//! number". Rows are grouped by last hop: a TC from a last hop replaces its
//! whole group at once, and a group is only ever replaced by a TC whose
//! sequence number is at least as new as every row already in it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use olsr_core::{NodeId, Tick};

/// Sequence number and receipt time of one topology row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyEntry {
    pub seqno: u64,
    pub received_at: Tick,
}

/// Result of applying a TC to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcOutcome {
    /// The last hop's rows were replaced
    Applied { removed: usize, installed: usize },
    /// A stored row for the last hop is newer; nothing changed
    Stale { stored: u64 },
}

impl TcOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TcOutcome::Applied { .. })
    }
}

/// `(destination, last hop)` rows grouped by last hop
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    by_last_hop: BTreeMap<NodeId, BTreeMap<NodeId, TopologyEntry>>,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a TC advertising `destinations` via `last_hop`
    ///
    /// If any stored row for `last_hop` carries a sequence number greater than
    /// `seqno` the whole update is rejected. Otherwise every row for
    /// `last_hop` is dropped and one fresh row per destination is installed;
    /// an empty destination set simply clears the group.
    pub fn apply(
        &mut self,
        last_hop: &NodeId,
        destinations: &BTreeSet<NodeId>,
        seqno: u64,
        now: Tick,
    ) -> TcOutcome {
        let removed = match self.by_last_hop.get(last_hop) {
            Some(group) => {
                let newest = group.values().map(|e| e.seqno).max();
                if let Some(newest) = newest.filter(|newest| *newest > seqno) {
                    trace!(last_hop = %last_hop, stored = newest, seqno, "stale TC rejected");
                    return TcOutcome::Stale { stored: newest };
                }
                group.len()
            }
            None => 0,
        };

        let entry = TopologyEntry {
            seqno,
            received_at: now,
        };
        let group: BTreeMap<NodeId, TopologyEntry> = destinations
            .iter()
            .map(|dst| (dst.clone(), entry))
            .collect();
        let installed = group.len();

        if group.is_empty() {
            self.by_last_hop.remove(last_hop);
        } else {
            self.by_last_hop.insert(last_hop.clone(), group);
        }

        TcOutcome::Applied { removed, installed }
    }

    /// Drop every last-hop group holding a row received strictly before `deadline`
    ///
    /// Returns the last hops whose groups were removed.
    pub fn evict_received_before(&mut self, deadline: Tick) -> Vec<NodeId> {
        let expired: Vec<NodeId> = self
            .by_last_hop
            .iter()
            .filter(|(_, group)| group.values().any(|e| e.received_at < deadline))
            .map(|(last_hop, _)| last_hop.clone())
            .collect();
        for last_hop in &expired {
            self.by_last_hop.remove(last_hop);
            debug!(last_hop = %last_hop, "topology rows expired");
        }
        expired
    }

    /// Look up the row for `(destination, last_hop)`
    pub fn get(&self, destination: &NodeId, last_hop: &NodeId) -> Option<&TopologyEntry> {
        self.by_last_hop.get(last_hop)?.get(destination)
    }

    /// Destinations currently advertised via `last_hop`
    pub fn destinations_via(&self, last_hop: &NodeId) -> BTreeSet<NodeId> {
        self.by_last_hop
            .get(last_hop)
            .map(|group| group.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All `(destination, last hop)` pairs
    pub fn pairs(&self) -> BTreeSet<(NodeId, NodeId)> {
        self.by_last_hop
            .iter()
            .flat_map(|(last_hop, group)| {
                group
                    .keys()
                    .map(move |dst| (dst.clone(), last_hop.clone()))
            })
            .collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.by_last_hop.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_last_hop.is_empty()
    }
}
