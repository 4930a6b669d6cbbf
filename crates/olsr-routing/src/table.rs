//! Route table
//!
//! The [`RouteTable`] maps each reachable destination to its next hop and hop
//! count. It is never patched: every recomputation builds a complete new
//! table from the bidirectional neighbors and the topology pairs, and
//! [`SharedRouteTable`] swaps it in under its own lock. Readers clone an
//! `Arc` snapshot, so they see either the old table or the new one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use olsr_core::NodeId;

/// Next hop and distance to one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub next_hop: NodeId,
    pub hop_count: u32,
}

/// Shortest hop-count routes of one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<NodeId, Route>,
}

impl RouteTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute routes for `local_id` by breadth-first hop layers
    ///
    /// Every bidirectional neighbor is a one-hop route through itself. Layer
    /// `h + 1` admits a destination only through a last hop routed at exactly
    /// `h`, so the first admission is a shortest path. Expansion stops at the
    /// first layer that admits nothing.
    pub fn compute(
        local_id: &NodeId,
        bidir: &BTreeSet<NodeId>,
        topology: &BTreeSet<(NodeId, NodeId)>,
    ) -> Self {
        let mut routes: BTreeMap<NodeId, Route> = bidir
            .iter()
            .filter(|n| *n != local_id)
            .map(|n| {
                (
                    n.clone(),
                    Route {
                        next_hop: n.clone(),
                        hop_count: 1,
                    },
                )
            })
            .collect();

        let mut hop = 1;
        loop {
            let layer: Vec<(NodeId, Route)> = topology
                .iter()
                .filter(|(dst, _)| dst != local_id && !routes.contains_key(dst))
                .filter_map(|(dst, last_hop)| {
                    let via = routes.get(last_hop).filter(|r| r.hop_count == hop)?;
                    Some((
                        dst.clone(),
                        Route {
                            next_hop: via.next_hop.clone(),
                            hop_count: hop + 1,
                        },
                    ))
                })
                .collect();

            if layer.is_empty() {
                break;
            }
            for (dst, route) in layer {
                routes.entry(dst).or_insert(route);
            }
            hop += 1;
        }

        Self { routes }
    }

    /// Route to `destination`, if any
    pub fn get(&self, destination: &NodeId) -> Option<&Route> {
        self.routes.get(destination)
    }

    /// Next hop towards `destination`; `None` means no route
    pub fn next_hop(&self, destination: &NodeId) -> Option<&NodeId> {
        self.routes.get(destination).map(|r| &r.next_hop)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All destinations with their routes, ordered by destination
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Route)> {
        self.routes.iter()
    }

    /// True if some route leaves through `neighbor`
    pub fn uses_next_hop(&self, neighbor: &NodeId) -> bool {
        self.routes.values().any(|r| &r.next_hop == neighbor)
    }
}

/// Route table shared between the node that rebuilds it and its forwarders
#[derive(Debug, Clone, Default)]
pub struct SharedRouteTable {
    inner: Arc<RwLock<Arc<RouteTable>>>,
}

impl SharedRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current complete table
    pub fn snapshot(&self) -> Arc<RouteTable> {
        Arc::clone(&self.inner.read())
    }

    /// Swap in a freshly computed table
    pub fn replace(&self, table: RouteTable) {
        *self.inner.write() = Arc::new(table);
    }

    /// Next hop towards `destination`; `None` means no route
    pub fn next_hop(&self, destination: &NodeId) -> Option<NodeId> {
        self.inner.read().next_hop(destination).cloned()
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

    fn pairs(entries: &[(&str, &str)]) -> BTreeSet<(NodeId, NodeId)> {
        entries.iter().map(|(d, l)| (id(d), id(l))).collect()
    }

    #[test]
    fn test_neighbors_only() {
        let table = RouteTable::compute(&id("A"), &set(&["B", "C"]), &BTreeSet::new());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(&id("B")),
            Some(&Route { next_hop: id("B"), hop_count: 1 })
        );
    }

    #[test]
    fn test_line_topology() {
        // A - B - C - D, topology learned from TCs of B, C and D
        let topo = pairs(&[("A", "B"), ("C", "B"), ("B", "C"), ("D", "C"), ("C", "D")]);
        let table = RouteTable::compute(&id("A"), &set(&["B"]), &topo);

        assert_eq!(table.get(&id("B")), Some(&Route { next_hop: id("B"), hop_count: 1 }));
        assert_eq!(table.get(&id("C")), Some(&Route { next_hop: id("B"), hop_count: 2 }));
        assert_eq!(table.get(&id("D")), Some(&Route { next_hop: id("B"), hop_count: 3 }));
        assert!(table.get(&id("A")).is_none());
    }

    #[test]
    fn test_shortest_path_wins() {
        // A-B, A-C bidir; D via C (2 hops) and via E which hangs off B (3 hops)
        let topo = pairs(&[("E", "B"), ("D", "E"), ("D", "C")]);
        let table = RouteTable::compute(&id("A"), &set(&["B", "C"]), &topo);

        assert_eq!(table.get(&id("D")), Some(&Route { next_hop: id("C"), hop_count: 2 }));
        assert_eq!(table.get(&id("E")), Some(&Route { next_hop: id("B"), hop_count: 2 }));
    }

    #[test]
    fn test_unreachable_last_hop_is_ignored() {
        let topo = pairs(&[("Z", "Y")]);
        let table = RouteTable::compute(&id("A"), &set(&["B"]), &topo);
        assert!(table.next_hop(&id("Z")).is_none());
    }

    #[test]
    fn test_shared_table_swaps_whole_snapshots() {
        let shared = SharedRouteTable::new();
        let before = shared.snapshot();
        assert!(before.is_empty());

        shared.replace(RouteTable::compute(&id("A"), &set(&["B"]), &BTreeSet::new()));

        // The old snapshot is unaffected by the swap
        assert!(before.is_empty());
        assert_eq!(shared.next_hop(&id("B")), Some(id("B")));
        assert!(shared.next_hop(&id("C")).is_none());
    }
}
