//! Routing engine
//!
//! [`RoutingEngine`] owns one node's neighbor table, MPR and MS sets and
//! topology store, and keeps the node's [`SharedRouteTable`] in step with
//! them. Each entry point performs the full recomputation cascade:
//!
//! - `hello_update`: neighbor state, then MPR set, then the sender's MS
//!   membership, then routes
//! - `tc_update`: topology rows, then routes
//! - `check_timeout`: neighbor and topology eviction, then MPR set and routes
//!   if anything was evicted

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use olsr_core::{LogicalClock, NodeId, Tick};

use crate::config::RoutingConfig;
use crate::mpr::select_mpr;
use crate::neighbor::{LinkState, NeighborTable};
use crate::table::{RouteTable, SharedRouteTable};
use crate::topology::{TcOutcome, TopologyStore};
use crate::versioned::VersionedSet;

/// Sets advertised in a HELLO
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloSnapshot {
    pub unidir: BTreeSet<NodeId>,
    pub bidir: BTreeSet<NodeId>,
    pub mpr: BTreeSet<NodeId>,
}

/// What one timeout sweep removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub neighbors: Vec<NodeId>,
    pub last_hops: Vec<NodeId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty() && self.last_hops.is_empty()
    }
}

/// Routing state of one node
pub struct RoutingEngine {
    local_id: NodeId,
    clock: Arc<LogicalClock>,
    config: RoutingConfig,
    neighbors: NeighborTable,
    mpr: VersionedSet<NodeId>,
    selectors: VersionedSet<NodeId>,
    topology: TopologyStore,
    routes: SharedRouteTable,
}

impl RoutingEngine {
    /// Create an engine for `local_id` reading time from `clock`
    pub fn new(local_id: NodeId, clock: Arc<LogicalClock>, config: RoutingConfig) -> Self {
        Self {
            neighbors: NeighborTable::new(local_id.clone()),
            local_id,
            clock,
            config,
            mpr: VersionedSet::new(),
            selectors: VersionedSet::new(),
            topology: TopologyStore::new(),
            routes: SharedRouteTable::new(),
        }
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Handle to the route table this engine maintains
    pub fn routes(&self) -> SharedRouteTable {
        self.routes.clone()
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn mpr(&self) -> &VersionedSet<NodeId> {
        &self.mpr
    }

    /// Neighbors that selected this node as their MPR
    pub fn selectors(&self) -> &VersionedSet<NodeId> {
        &self.selectors
    }

    /// True if `neighbor` selected this node as its MPR
    pub fn is_selector(&self, neighbor: &NodeId) -> bool {
        self.selectors.contains(neighbor)
    }

    /// Sets to advertise in the next HELLO
    pub fn hello_snapshot(&self) -> HelloSnapshot {
        HelloSnapshot {
            unidir: self.neighbors.unidir(),
            bidir: self.neighbors.bidir(),
            mpr: self.mpr.snapshot(),
        }
    }

    /// Apply a HELLO from `neighbor` advertising the given sets
    pub fn hello_update(
        &mut self,
        neighbor: &NodeId,
        unidir: &BTreeSet<NodeId>,
        bidir: &BTreeSet<NodeId>,
        mpr: &BTreeSet<NodeId>,
    ) -> LinkState {
        let now = self.clock.time();
        let link = self.neighbors.hello(neighbor, unidir, bidir, now);
        self.update_mpr_set();
        self.update_ms_set(neighbor, mpr);
        self.recompute_routes();
        link
    }

    /// Apply a TC advertising `ms` as reachable via `last_hop`
    pub fn tc_update(&mut self, last_hop: &NodeId, ms: &BTreeSet<NodeId>, seqno: u64) -> TcOutcome {
        let now = self.clock.time();
        let outcome = self.topology.apply(last_hop, ms, seqno, now);
        self.recompute_routes();
        outcome
    }

    /// Evict stale neighbors and topology rows
    pub fn check_timeout(&mut self) -> SweepReport {
        let now = self.clock.time();
        let mut report = SweepReport::default();

        if let Some(deadline) = now.checked_sub(self.config.neighbor_hold) {
            report.neighbors = self.neighbors.evict_heard_before(deadline);
            if !report.neighbors.is_empty() {
                for id in &report.neighbors {
                    self.selectors.remove(id);
                }
                debug!(node = %self.local_id, evicted = ?report.neighbors, tick = now, "neighbors timed out");
                self.update_mpr_set();
            }
        }

        if let Some(deadline) = now.checked_sub(self.config.topology_hold) {
            report.last_hops = self.topology.evict_received_before(deadline);
        }

        if !report.is_empty() {
            self.recompute_routes();
        }
        report
    }

    /// Recompute the MPR set from the current two-hop neighborhood
    fn update_mpr_set(&mut self) {
        let selected = select_mpr(&self.neighbors.coverage());
        if self.mpr.replace(selected) {
            debug!(
                node = %self.local_id,
                mpr = ?self.mpr.snapshot(),
                version = self.mpr.version(),
                "MPR set changed"
            );
        }
    }

    /// Track whether `neighbor` lists us in its advertised MPR set
    fn update_ms_set(&mut self, neighbor: &NodeId, mpr: &BTreeSet<NodeId>) {
        let changed = if mpr.contains(&self.local_id) {
            self.selectors.insert(neighbor.clone())
        } else {
            self.selectors.remove(neighbor)
        };
        if changed {
            debug!(
                node = %self.local_id,
                neighbor = %neighbor,
                version = self.selectors.version(),
                "MS set changed"
            );
        }
    }

    fn recompute_routes(&self) {
        let table = RouteTable::compute(
            &self.local_id,
            &self.neighbors.bidir(),
            &self.topology.pairs(),
        );
        trace!(node = %self.local_id, routes = table.len(), "route table rebuilt");
        self.routes.replace(table);
    }

    /// Current clock reading
    pub fn now(&self) -> Tick {
        self.clock.time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| id(s)).collect()
    }

    fn engine(name: &str) -> (RoutingEngine, Arc<LogicalClock>) {
        let clock = LogicalClock::shared();
        let engine = RoutingEngine::new(id(name), Arc::clone(&clock), RoutingConfig::default());
        (engine, clock)
    }

    #[test]
    fn test_hello_cascade_updates_routes() {
        let (mut a, _clock) = engine("A");
        a.hello_update(&id("B"), &set(&[]), &set(&["A", "C"]), &set(&[]));

        assert_eq!(a.routes().next_hop(&id("B")), Some(id("B")));
        assert_eq!(a.mpr().snapshot(), set(&["B"]));
        assert_eq!(a.mpr().version(), 1);
    }

    #[test]
    fn test_unidir_neighbor_has_no_route() {
        let (mut a, _clock) = engine("A");
        a.hello_update(&id("B"), &set(&[]), &set(&[]), &set(&[]));

        assert!(a.routes().next_hop(&id("B")).is_none());
        assert_eq!(a.hello_snapshot().unidir, set(&["B"]));
    }

    #[test]
    fn test_ms_membership_follows_advertised_mpr() {
        let (mut a, _clock) = engine("A");
        a.hello_update(&id("B"), &set(&["A"]), &set(&[]), &set(&["A"]));
        assert!(a.is_selector(&id("B")));
        assert_eq!(a.selectors().version(), 1);

        // Same advertisement: no version change
        a.hello_update(&id("B"), &set(&[]), &set(&["A"]), &set(&["A"]));
        assert_eq!(a.selectors().version(), 1);

        a.hello_update(&id("B"), &set(&[]), &set(&["A"]), &set(&[]));
        assert!(!a.is_selector(&id("B")));
        assert_eq!(a.selectors().version(), 2);
    }

    #[test]
    fn test_tc_extends_routes() {
        let (mut a, _clock) = engine("A");
        a.hello_update(&id("B"), &set(&[]), &set(&["A", "C"]), &set(&[]));
        let outcome = a.tc_update(&id("B"), &set(&["A", "C"]), 1);

        assert!(outcome.is_applied());
        let routes = a.routes().snapshot();
        assert_eq!(routes.get(&id("C")).unwrap().hop_count, 2);
        assert_eq!(routes.get(&id("C")).unwrap().next_hop, id("B"));
        assert!(routes.get(&id("A")).is_none());
    }

    #[test]
    fn test_sweep_is_noop_when_fresh() {
        let (mut a, clock) = engine("A");
        a.hello_update(&id("B"), &set(&[]), &set(&["A"]), &set(&["A"]));
        for _ in 0..15 {
            clock.tick();
        }
        let report = a.check_timeout();
        assert!(report.is_empty());
        assert_eq!(a.neighbors().len(), 1);
    }

    #[test]
    fn test_sweep_evicts_neighbor_and_selector() {
        let (mut a, clock) = engine("A");
        a.hello_update(&id("B"), &set(&[]), &set(&["A", "C"]), &set(&["A"]));
        assert!(a.is_selector(&id("B")));

        for _ in 0..16 {
            clock.tick();
        }
        let report = a.check_timeout();

        assert_eq!(report.neighbors, vec![id("B")]);
        assert!(a.neighbors().is_empty());
        assert!(!a.is_selector(&id("B")));
        assert!(a.mpr().is_empty());
        assert!(a.routes().snapshot().is_empty());
    }
}
