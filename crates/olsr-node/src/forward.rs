//! DATA forwarding
//!
//! Forwarding reads only the node's [`SharedRouteTable`], never the routing
//! state behind the node's mutex, so a lookup never waits on a HELLO or TC
//! being processed.

use std::sync::Arc;

use tracing::{debug, info};

use olsr_core::{DataMessage, LogicalClock, NodeId, Tick};
use olsr_routing::SharedRouteTable;

/// A DATA payload consumed at its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub originator: NodeId,
    pub payload: String,
    pub tick: Tick,
}

/// What to do with an inbound DATA message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAction {
    /// This node is the destination
    Deliver(Delivery),
    /// Re-emit towards the next hop
    Forward(DataMessage),
    /// No route; best effort, so the message is lost
    Drop,
}

/// Routes DATA messages for one node
#[derive(Debug, Clone)]
pub struct Forwarder {
    local_id: NodeId,
    routes: SharedRouteTable,
    clock: Arc<LogicalClock>,
}

impl Forwarder {
    pub fn new(local_id: NodeId, routes: SharedRouteTable, clock: Arc<LogicalClock>) -> Self {
        Self {
            local_id,
            routes,
            clock,
        }
    }

    /// Decide the fate of an inbound DATA message
    pub fn route(&self, message: &DataMessage) -> ForwardAction {
        if message.destination == self.local_id {
            let tick = self.clock.time();
            info!(
                originator = %message.originator,
                payload = %message.payload,
                tick,
                "data delivered"
            );
            return ForwardAction::Deliver(Delivery {
                originator: message.originator.clone(),
                payload: message.payload.clone(),
                tick,
            });
        }

        match self.routes.next_hop(&message.destination) {
            Some(next_hop) => {
                debug!(destination = %message.destination, next_hop = %next_hop, "forwarding data");
                ForwardAction::Forward(message.forwarded(next_hop, self.local_id.clone()))
            }
            None => {
                debug!(destination = %message.destination, "no route, data dropped");
                ForwardAction::Drop
            }
        }
    }

    /// Build the first hop of a locally originated payload, if a route exists
    pub fn originate(&self, destination: &NodeId, payload: &str) -> Option<DataMessage> {
        let next_hop = self.routes.next_hop(destination)?;
        Some(DataMessage {
            next_hop,
            sender: self.local_id.clone(),
            originator: self.local_id.clone(),
            destination: destination.clone(),
            payload: payload.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use olsr_routing::RouteTable;

    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn data(next_hop: &str, sender: &str, originator: &str, destination: &str) -> DataMessage {
        DataMessage {
            next_hop: id(next_hop),
            sender: id(sender),
            originator: id(originator),
            destination: id(destination),
            payload: "hello world".to_string(),
        }
    }

    fn forwarder(name: &str, neighbors: &[&str]) -> Forwarder {
        let routes = SharedRouteTable::new();
        let bidir: BTreeSet<NodeId> = neighbors.iter().map(|n| id(n)).collect();
        routes.replace(RouteTable::compute(&id(name), &bidir, &BTreeSet::new()));
        Forwarder::new(id(name), routes, LogicalClock::shared())
    }

    #[test]
    fn test_destination_consumes() {
        let fwd = forwarder("C", &["B"]);
        let action = fwd.route(&data("C", "B", "A", "C"));
        assert_eq!(
            action,
            ForwardAction::Deliver(Delivery {
                originator: id("A"),
                payload: "hello world".to_string(),
                tick: 0,
            })
        );
    }

    #[test]
    fn test_forward_rewrites_hop_fields() {
        let fwd = forwarder("B", &["A", "C"]);
        match fwd.route(&data("B", "A", "A", "C")) {
            ForwardAction::Forward(m) => {
                assert_eq!(m.next_hop, id("C"));
                assert_eq!(m.sender, id("B"));
                assert_eq!(m.originator, id("A"));
                assert_eq!(m.destination, id("C"));
                assert_eq!(m.payload, "hello world");
            }
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn test_unroutable_is_dropped() {
        let fwd = forwarder("B", &["A"]);
        assert_eq!(fwd.route(&data("B", "A", "A", "Z")), ForwardAction::Drop);
    }

    #[test]
    fn test_originate_needs_route() {
        let fwd = forwarder("A", &["B"]);
        assert!(fwd.originate(&id("C"), "x").is_none());

        let m = fwd.originate(&id("B"), "x").unwrap();
        assert_eq!(m.next_hop, id("B"));
        assert_eq!(m.originator, id("A"));
    }
}
