//! Transport controller
//!
//! The controller is the link layer of a simulation run. Each attached node
//! gets one forwarding task that reads the node's outbound lines in order and
//! delivers them according to the live [`LinkSet`]:
//!
//! - lines starting with `*` go to every node currently hearing the sender
//! - any other line is unicast to the node named by its first token, and only
//!   if that node currently hears the sender
//!
//! Delivery is best effort. A line is lost when no link is up, when the
//! receiver is unknown or stopped, or when the receiver's inbox is full.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, trace, warn};

use olsr_core::{ChannelPeer, NodeId};
use olsr_core::message::BROADCAST;

use crate::schedule::LinkSet;

/// Delivery counters of one run
#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of the controller counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Lines read from node outboxes
    pub sent: u64,
    /// Copies placed in a receiver's inbox
    pub delivered: u64,
    /// Copies lost on the way
    pub dropped: u64,
}

/// Routes lines between attached nodes over the live link set
pub struct Controller {
    links: Arc<LinkSet>,
    inboxes: Arc<DashMap<NodeId, mpsc::Sender<String>>>,
    counters: Arc<Counters>,
    forwarders: JoinSet<()>,
}

impl Controller {
    pub fn new(links: Arc<LinkSet>) -> Self {
        Self {
            links,
            inboxes: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            forwarders: JoinSet::new(),
        }
    }

    pub fn links(&self) -> &Arc<LinkSet> {
        &self.links
    }

    /// Attach a node's channel end and start forwarding its outbound lines
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(&mut self, id: NodeId, peer: ChannelPeer) {
        let ChannelPeer { inbox, outbox } = peer;
        self.inboxes.insert(id.clone(), inbox);

        let route = Route {
            sender: id.clone(),
            links: Arc::clone(&self.links),
            inboxes: Arc::clone(&self.inboxes),
            counters: Arc::clone(&self.counters),
        };
        let span = info_span!("link", sender = %id);
        self.forwarders.spawn(route.forward_all(outbox).instrument(span));
    }

    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Wait until every attached node has closed its outbound channel
    pub async fn join(mut self) -> ControllerStats {
        self.inboxes.clear();
        while let Some(result) = self.forwarders.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "forwarding task failed");
            }
        }
        self.stats()
    }
}

/// Forwarding context of one sender
struct Route {
    sender: NodeId,
    links: Arc<LinkSet>,
    inboxes: Arc<DashMap<NodeId, mpsc::Sender<String>>>,
    counters: Arc<Counters>,
}

impl Route {
    async fn forward_all(self, mut outbox: mpsc::Receiver<String>) {
        while let Some(line) = outbox.recv().await {
            self.counters.sent.fetch_add(1, Ordering::Relaxed);
            self.forward(&line);
        }
        debug!("outbound channel closed");
    }

    fn forward(&self, line: &str) {
        let Some(first) = line.split_whitespace().next() else {
            self.drop_copy(line, "empty line");
            return;
        };

        if first == BROADCAST {
            for receiver in self.links.receivers_of(&self.sender) {
                self.deliver(&receiver, line);
            }
            return;
        }

        match NodeId::new(first) {
            Ok(next_hop) if self.links.is_up(&self.sender, &next_hop) => {
                self.deliver(&next_hop, line);
            }
            Ok(_) => self.drop_copy(line, "link down"),
            Err(_) => self.drop_copy(line, "bad next hop"),
        }
    }

    fn deliver(&self, receiver: &NodeId, line: &str) {
        // Clone the sender out so no map guard is held while sending
        let inbox = self.inboxes.get(receiver).map(|entry| entry.value().clone());
        let Some(inbox) = inbox else {
            self.drop_copy(line, "unknown receiver");
            return;
        };

        match inbox.try_send(line.to_string()) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                trace!(%receiver, "delivered");
            }
            Err(TrySendError::Full(_)) => self.drop_copy(line, "inbox full"),
            Err(TrySendError::Closed(_)) => self.drop_copy(line, "receiver stopped"),
        }
    }

    fn drop_copy(&self, line: &str, reason: &'static str) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        trace!(reason, line = line.trim_end(), "line dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use olsr_core::ChannelTransport;
    use olsr_core::Transport;

    use super::*;
    use crate::schedule::LinkEvent;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn attach_all(controller: &mut Controller, names: &[&str]) -> Vec<ChannelTransport> {
        names
            .iter()
            .map(|name| {
                let (transport, peer) = ChannelTransport::new();
                controller.attach(id(name), peer);
                transport
            })
            .collect()
    }

    fn link(links: &LinkSet, from: &str, to: &str) {
        links.apply(&LinkEvent::up(0, id(from), id(to)));
    }

    async fn next_line(transport: &ChannelTransport) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(100), transport.recv())
            .await
            .ok()
            .and_then(|r| r.unwrap())
    }

    #[tokio::test]
    async fn test_broadcast_reaches_linked_receivers_only() {
        let links = Arc::new(LinkSet::new());
        link(&links, "A", "B");
        link(&links, "C", "A");
        let mut controller = Controller::new(Arc::clone(&links));
        let nodes = attach_all(&mut controller, &["A", "B", "C"]);

        let hello = "* A HELLO UNIDIR  BIDIR  MPR \n";
        nodes[0].send(hello.to_string()).await.unwrap();

        assert_eq!(next_line(&nodes[1]).await.as_deref(), Some(hello));
        // C -> A is up, but A -> C is not
        assert_eq!(next_line(&nodes[2]).await, None);
    }

    #[tokio::test]
    async fn test_unicast_needs_link_to_next_hop() {
        let links = Arc::new(LinkSet::new());
        link(&links, "A", "B");
        let mut controller = Controller::new(Arc::clone(&links));
        let nodes = attach_all(&mut controller, &["A", "B", "C"]);

        nodes[0].send("B A DATA A C first\n".to_string()).await.unwrap();
        nodes[0].send("C A DATA A C second\n".to_string()).await.unwrap();

        assert_eq!(next_line(&nodes[1]).await.as_deref(), Some("B A DATA A C first\n"));
        assert_eq!(next_line(&nodes[2]).await, None);
        assert_eq!(next_line(&nodes[1]).await, None);
    }

    #[tokio::test]
    async fn test_per_sender_order_is_kept() {
        let links = Arc::new(LinkSet::new());
        link(&links, "A", "B");
        let mut controller = Controller::new(Arc::clone(&links));
        let nodes = attach_all(&mut controller, &["A", "B"]);

        for i in 0..20 {
            nodes[0].send(format!("* A TC A {i} MS B\n")).await.unwrap();
        }
        for i in 0..20 {
            assert_eq!(next_line(&nodes[1]).await, Some(format!("* A TC A {i} MS B\n")));
        }
    }

    #[tokio::test]
    async fn test_join_reports_counters() {
        let links = Arc::new(LinkSet::new());
        link(&links, "A", "B");
        let mut controller = Controller::new(Arc::clone(&links));
        let mut nodes = attach_all(&mut controller, &["A", "B"]);

        nodes[0].send("* A HELLO UNIDIR  BIDIR  MPR \n".to_string()).await.unwrap();
        nodes[0].send("Z A DATA A Z lost\n".to_string()).await.unwrap();
        nodes[1].send("* B HELLO UNIDIR  BIDIR  MPR \n".to_string()).await.unwrap();
        assert!(next_line(&nodes[1]).await.is_some());

        // Dropping a transport closes its outbound channel
        nodes.clear();
        let stats = controller.join().await;
        assert_eq!(
            stats,
            ControllerStats {
                sent: 3,
                delivered: 1,
                dropped: 1,
            }
        );
    }
}
