//! Per-node protocol state
//!
//! [`NodeState`] is everything one node mutates while handling control
//! messages and epoch actions: its [`RoutingEngine`], its TC dedup cache and
//! its pending outbound payload. The dispatcher keeps it behind a single
//! mutex; every method here is a short synchronous mutation.

use std::sync::Arc;

use derive_more::Display;
use tracing::{debug, trace};

use olsr_core::{HelloMessage, LogicalClock, Message, NodeId, TcMessage, Tick};
use olsr_routing::{RoutingEngine, SharedRouteTable, TcDedupCache};

use crate::config::{NodeConfig, ProtocolTiming, ScheduledSend};
use crate::forward::Forwarder;

/// Work scheduled for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EpochAction {
    /// Evict stale neighbors and topology rows
    #[display("timeout")]
    Timeout,
    /// Try the scheduled outbound payload
    #[display("send-data")]
    SendData,
    /// Broadcast a HELLO
    #[display("hello")]
    Hello,
    /// Forget seen TC sequence numbers
    #[display("dedup-reset")]
    DedupReset,
    /// Originate a TC if anyone selected us as MPR
    #[display("tc")]
    Tc,
}

/// Protocol state of one node
pub struct NodeState {
    engine: RoutingEngine,
    dedup: TcDedupCache,
    forwarder: Forwarder,
    pending_send: Option<ScheduledSend>,
    timing: ProtocolTiming,
}

impl NodeState {
    pub fn new(config: &NodeConfig, clock: Arc<LogicalClock>) -> Self {
        let engine = RoutingEngine::new(config.id.clone(), Arc::clone(&clock), config.routing);
        let forwarder = Forwarder::new(config.id.clone(), engine.routes(), clock);
        Self {
            engine,
            dedup: TcDedupCache::new(),
            forwarder,
            pending_send: config.scheduled_send.clone(),
            timing: config.timing,
        }
    }

    pub fn local_id(&self) -> &NodeId {
        self.engine.local_id()
    }

    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    pub fn routes(&self) -> SharedRouteTable {
        self.engine.routes()
    }

    pub fn forwarder(&self) -> Forwarder {
        self.forwarder.clone()
    }

    /// Payload not yet sent, with its next attempt tick
    pub fn pending_send(&self) -> Option<&ScheduledSend> {
        self.pending_send.as_ref()
    }

    /// Actions due at `now`, in schedule order
    pub fn due_actions(&self, now: Tick) -> Vec<EpochAction> {
        let mut actions = vec![EpochAction::Timeout];
        if self.pending_send.as_ref().is_some_and(|s| s.at == now) {
            actions.push(EpochAction::SendData);
        }
        if self.timing.hello_due(now) {
            actions.push(EpochAction::Hello);
        }
        if self.timing.dedup_reset_due(now) {
            actions.push(EpochAction::DedupReset);
        }
        if self.timing.tc_due(now) {
            actions.push(EpochAction::Tc);
        }
        actions
    }

    /// Run one epoch action; returns the line to emit, if any
    pub fn perform(&mut self, action: EpochAction, now: Tick) -> Option<Message> {
        match action {
            EpochAction::Timeout => {
                let report = self.engine.check_timeout();
                if !report.is_empty() {
                    debug!(
                        tick = now,
                        neighbors = report.neighbors.len(),
                        last_hops = report.last_hops.len(),
                        "timeout sweep evicted state"
                    );
                }
                None
            }
            EpochAction::SendData => self.send_data(now),
            EpochAction::Hello => Some(self.build_hello().into()),
            EpochAction::DedupReset => {
                self.dedup.clear();
                None
            }
            EpochAction::Tc => self.build_tc().map(Message::from),
        }
    }

    fn send_data(&mut self, now: Tick) -> Option<Message> {
        let send = self.pending_send.as_mut()?;
        match self.forwarder.originate(&send.destination, &send.payload) {
            Some(data) => {
                debug!(destination = %send.destination, tick = now, "scheduled data sent");
                self.pending_send = None;
                Some(data.into())
            }
            None => {
                send.at += self.timing.data_retry;
                debug!(
                    destination = %send.destination,
                    retry_at = send.at,
                    "no route for scheduled data"
                );
                None
            }
        }
    }

    /// HELLO advertising the current neighbor and MPR sets
    pub fn build_hello(&self) -> HelloMessage {
        let snapshot = self.engine.hello_snapshot();
        HelloMessage {
            sender: self.local_id().clone(),
            unidir: snapshot.unidir,
            bidir: snapshot.bidir,
            mpr: snapshot.mpr,
        }
    }

    /// TC advertising our MPR selectors; `None` while nobody selected us
    pub fn build_tc(&self) -> Option<TcMessage> {
        let selectors = self.engine.selectors();
        if selectors.is_empty() {
            return None;
        }
        Some(TcMessage {
            sender: self.local_id().clone(),
            source: self.local_id().clone(),
            seqno: selectors.version(),
            ms: selectors.snapshot(),
        })
    }

    /// Apply an inbound HELLO
    pub fn on_hello(&mut self, hello: &HelloMessage) {
        if hello.sender == *self.local_id() {
            return;
        }
        let link = self
            .engine
            .hello_update(&hello.sender, &hello.unidir, &hello.bidir, &hello.mpr);
        trace!(neighbor = %hello.sender, link = %link, "hello processed");
    }

    /// Apply an inbound TC; returns the copy to relay, if any
    ///
    /// Our own TCs and already-seen sequence numbers are ignored. Rows are
    /// stored with the originator as last hop, and the TC is relayed only
    /// when the neighbor that delivered it selected us as MPR.
    pub fn on_tc(&mut self, tc: &TcMessage) -> Option<TcMessage> {
        if tc.source == *self.local_id() {
            return None;
        }
        if !self.dedup.admit(&tc.source, tc.seqno) {
            trace!(source = %tc.source, seqno = tc.seqno, "duplicate TC");
            return None;
        }
        self.engine.tc_update(&tc.source, &tc.ms, tc.seqno);
        if self.engine.is_selector(&tc.sender) {
            Some(tc.relayed_by(self.local_id()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| id(s)).collect()
    }

    fn hello(sender: &str, unidir: &[&str], bidir: &[&str], mpr: &[&str]) -> HelloMessage {
        HelloMessage {
            sender: id(sender),
            unidir: set(unidir),
            bidir: set(bidir),
            mpr: set(mpr),
        }
    }

    fn tc(sender: &str, source: &str, seqno: u64, ms: &[&str]) -> TcMessage {
        TcMessage {
            sender: id(sender),
            source: id(source),
            seqno,
            ms: set(ms),
        }
    }

    fn state(name: &str) -> (NodeState, Arc<LogicalClock>) {
        let clock = LogicalClock::shared();
        let state = NodeState::new(&NodeConfig::new(id(name)), Arc::clone(&clock));
        (state, clock)
    }

    #[test]
    fn test_due_actions_follow_schedule() {
        let (s, _clock) = state("A");
        use EpochAction::*;
        assert_eq!(s.due_actions(0), vec![Timeout, Hello, Tc]);
        assert_eq!(s.due_actions(3), vec![Timeout]);
        assert_eq!(s.due_actions(5), vec![Timeout, Hello]);
        assert_eq!(s.due_actions(8), vec![Timeout, DedupReset]);
        assert_eq!(s.due_actions(10), vec![Timeout, Hello, Tc]);
    }

    #[test]
    fn test_scheduled_send_is_due_at_its_tick() {
        let clock = LogicalClock::shared();
        let config = NodeConfig::new(id("A")).with_scheduled_send(ScheduledSend::new(id("C"), "x", 7));
        let s = NodeState::new(&config, clock);
        assert!(s.due_actions(7).contains(&EpochAction::SendData));
        assert!(!s.due_actions(6).contains(&EpochAction::SendData));
    }

    #[test]
    fn test_send_without_route_is_rescheduled() {
        let clock = LogicalClock::shared();
        let config = NodeConfig::new(id("A")).with_scheduled_send(ScheduledSend::new(id("C"), "x", 7));
        let mut s = NodeState::new(&config, clock);

        assert!(s.perform(EpochAction::SendData, 7).is_none());
        assert_eq!(s.pending_send().unwrap().at, 37);
    }

    #[test]
    fn test_send_with_route_completes() {
        let clock = LogicalClock::shared();
        let config = NodeConfig::new(id("A")).with_scheduled_send(ScheduledSend::new(id("B"), "ping", 0));
        let mut s = NodeState::new(&config, clock);
        s.on_hello(&hello("B", &["A"], &[], &[]));

        let line = s.perform(EpochAction::SendData, 0).unwrap().to_line();
        assert_eq!(line, "B A DATA A B ping\n");
        assert!(s.pending_send().is_none());
    }

    #[test]
    fn test_tc_only_when_selected() {
        let (mut s, _clock) = state("B");
        assert!(s.perform(EpochAction::Tc, 0).is_none());

        s.on_hello(&hello("A", &["B"], &[], &["B"]));
        let line = s.perform(EpochAction::Tc, 10).unwrap().to_line();
        assert_eq!(line, "* B TC B 1 MS A\n");
    }

    #[test]
    fn test_hello_advertises_link_sets() {
        let (mut s, _clock) = state("A");
        s.on_hello(&hello("B", &[], &[], &[]));
        s.on_hello(&hello("C", &["A"], &[], &[]));

        let line = s.perform(EpochAction::Hello, 5).unwrap().to_line();
        assert_eq!(line, "* A HELLO UNIDIR B BIDIR C MPR \n");
    }

    #[test]
    fn test_own_tc_is_ignored() {
        let (mut s, _clock) = state("A");
        assert!(s.on_tc(&tc("B", "A", 3, &["B"])).is_none());
        assert!(s.engine().topology().is_empty());
    }

    #[test]
    fn test_tc_relay_requires_selector_sender() {
        let (mut s, _clock) = state("B");
        // A selected B as MPR, C did not
        s.on_hello(&hello("A", &["B"], &[], &["B"]));
        s.on_hello(&hello("C", &["B"], &[], &[]));

        let relayed = s.on_tc(&tc("A", "X", 1, &["A"])).unwrap();
        assert_eq!(relayed.sender, id("B"));
        assert_eq!(relayed.source, id("X"));

        assert!(s.on_tc(&tc("C", "Y", 1, &["C"])).is_none());
        // Both were applied to topology regardless of relaying
        assert_eq!(s.engine().topology().destinations_via(&id("Y")), set(&["C"]));
    }

    #[test]
    fn test_duplicate_tc_until_dedup_reset() {
        let (mut s, _clock) = state("B");
        s.on_hello(&hello("A", &["B"], &[], &["B"]));

        assert!(s.on_tc(&tc("A", "X", 4, &["A"])).is_some());
        assert!(s.on_tc(&tc("A", "X", 4, &["A"])).is_none());
        assert!(s.on_tc(&tc("A", "X", 3, &["A"])).is_none());

        s.perform(EpochAction::DedupReset, 8);
        assert!(s.on_tc(&tc("A", "X", 4, &["A"])).is_some());
    }
}
