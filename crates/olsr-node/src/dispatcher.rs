//! Node dispatcher: epoch loop and inbound loop
//!
//! A spawned node runs two loops inside its [`NodeContext`] span:
//!
//! - the epoch loop follows the run's tick announcements and, once for every
//!   tick, runs the due [`EpochAction`]s on a `JoinSet` and waits for all of
//!   them
//! - the inbound loop decodes every received line and hands it to the HELLO,
//!   TC or DATA handler, sending whatever the handler produces
//!
//! When the clock passes the horizon (or [`NodeHandle::shutdown`] is called)
//! the epoch loop stops and raises the shutdown flag. The inbound loop then
//! keeps draining for one grace period before the node reports.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{Instrument, debug, info, trace, warn};

use olsr_core::{ChannelPeer, ChannelTransport, LogicalClock, Message, NodeId, Tick, Transport};
use olsr_logging::NodeContext;
use olsr_routing::{RouteTable, SharedRouteTable};

use crate::config::{NodeConfig, ScheduledSend};
use crate::error::NodeResult;
use crate::forward::{Delivery, ForwardAction, Forwarder};
use crate::state::{EpochAction, NodeState};

/// Final state of a node after it stopped
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub id: NodeId,
    pub routes: RouteTable,
    pub bidir: BTreeSet<NodeId>,
    pub mpr: BTreeSet<NodeId>,
    pub selectors: BTreeSet<NodeId>,
    /// DATA payloads consumed here, in arrival order
    pub deliveries: Vec<Delivery>,
    /// Every inbound line, in arrival order, without its newline
    pub received: Vec<String>,
    /// Scheduled payload that never found a route
    pub pending_send: Option<ScheduledSend>,
}

#[derive(Debug, Default)]
struct InboundLog {
    received: Vec<String>,
    deliveries: Vec<Delivery>,
}

/// State shared by a node's loops and epoch workers
struct Shared {
    state: Mutex<NodeState>,
    forwarder: Forwarder,
    log: Mutex<InboundLog>,
    transport: Arc<dyn Transport>,
}

impl Shared {
    /// Emit one line; a failed send loses only that line
    async fn send(&self, message: Message) {
        trace!(kind = %message.kind(), sender = %message.sender(), "sending");
        if let Err(e) = self.transport.send(message.to_line()).await {
            warn!(error = %e, kind = %message.kind(), "dropping outbound line");
        }
    }

    async fn handle_line(&self, line: String) {
        if let Some(message) = self.process(&line) {
            self.send(message).await;
        }
    }

    /// Record, decode and apply one inbound line
    fn process(&self, line: &str) -> Option<Message> {
        let line = line.trim_end_matches(['\r', '\n']);
        self.log.lock().received.push(line.to_string());

        let message = match Message::parse(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, line, "dropping malformed line");
                return None;
            }
        };

        match message {
            Message::Hello(hello) => {
                self.state.lock().on_hello(&hello);
                None
            }
            Message::Tc(tc) => self.state.lock().on_tc(&tc).map(Message::from),
            Message::Data(data) => match self.forwarder.route(&data) {
                ForwardAction::Deliver(delivery) => {
                    self.log.lock().deliveries.push(delivery);
                    None
                }
                ForwardAction::Forward(data) => Some(data.into()),
                ForwardAction::Drop => None,
            },
        }
    }

    fn report(&self) -> NodeReport {
        let state = self.state.lock();
        let engine = state.engine();
        let log = self.log.lock();
        NodeReport {
            id: state.local_id().clone(),
            routes: (*engine.routes().snapshot()).clone(),
            bidir: engine.neighbors().bidir(),
            mpr: engine.mpr().snapshot(),
            selectors: engine.selectors().snapshot(),
            deliveries: log.deliveries.clone(),
            received: log.received.clone(),
            pending_send: state.pending_send().cloned(),
        }
    }
}

/// A node ready to be spawned
pub struct Node {
    config: NodeConfig,
    clock: Arc<LogicalClock>,
    ticks: watch::Receiver<Tick>,
    transport: Arc<dyn Transport>,
}

impl Node {
    /// Create a node reading time from `clock` and following `ticks`
    pub fn new(
        config: NodeConfig,
        clock: Arc<LogicalClock>,
        ticks: watch::Receiver<Tick>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            clock,
            ticks,
            transport,
        }
    }

    /// Create a node on an in-memory transport; the peer end is returned
    pub fn with_channel(
        config: NodeConfig,
        clock: Arc<LogicalClock>,
        ticks: watch::Receiver<Tick>,
    ) -> (Self, ChannelPeer) {
        let (transport, peer) = ChannelTransport::with_capacity(config.channel_capacity);
        (Self::new(config, clock, ticks, Arc::new(transport)), peer)
    }

    pub fn id(&self) -> &NodeId {
        &self.config.id
    }

    /// Start both loops on the current runtime
    pub fn spawn(self) -> NodeHandle {
        let context = NodeContext::new(&self.config.id);
        let state = NodeState::new(&self.config, Arc::clone(&self.clock));
        let routes = state.routes();
        let shared = Arc::new(Shared {
            forwarder: state.forwarder(),
            state: Mutex::new(state),
            log: Mutex::new(InboundLog::default()),
            transport: self.transport,
        });

        // Both loops subscribe before the handle exists, so an early
        // shutdown is never missed
        let (shutdown, epoch_stop) = watch::channel(false);
        let first = *self.ticks.borrow();
        let loops = Loops {
            first,
            ticks: self.ticks,
            epoch_stop,
            inbound_stop: shutdown.subscribe(),
            horizon: self.config.horizon,
            grace: self.config.grace,
        };
        let task = tokio::spawn(run(shared, loops, shutdown.clone()).instrument(context.span()));

        NodeHandle {
            id: self.config.id,
            routes,
            shutdown,
            task,
        }
    }
}

/// Handle to a running node
pub struct NodeHandle {
    id: NodeId,
    routes: SharedRouteTable,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<NodeResult<NodeReport>>,
}

impl NodeHandle {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Live view of the node's route table
    pub fn routes(&self) -> SharedRouteTable {
        self.routes.clone()
    }

    /// Stop the epoch loop before the horizon
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for the node to stop and collect its report
    pub async fn join(self) -> NodeResult<NodeReport> {
        self.task.await?
    }
}

/// Inputs of the two loops of one node
struct Loops {
    ticks: watch::Receiver<Tick>,
    /// Tick announced when the node was spawned; its first epoch
    first: Tick,
    epoch_stop: watch::Receiver<bool>,
    inbound_stop: watch::Receiver<bool>,
    horizon: Tick,
    grace: Duration,
}

async fn run(
    shared: Arc<Shared>,
    loops: Loops,
    shutdown: watch::Sender<bool>,
) -> NodeResult<NodeReport> {
    info!(horizon = loops.horizon, "node started");

    let inbound = tokio::spawn(
        inbound_loop(Arc::clone(&shared), loops.inbound_stop, loops.grace).in_current_span(),
    );
    let epochs = epoch_loop(
        Arc::clone(&shared),
        loops.ticks,
        loops.first,
        loops.horizon,
        loops.epoch_stop,
    )
    .await;

    shutdown.send_replace(true);
    let inbound = inbound.await;
    epochs?;
    inbound??;

    let report = shared.report();
    info!(
        routes = report.routes.len(),
        deliveries = report.deliveries.len(),
        received = report.received.len(),
        "node stopped"
    );
    Ok(report)
}

async fn epoch_loop(
    shared: Arc<Shared>,
    mut ticks: watch::Receiver<Tick>,
    first: Tick,
    horizon: Tick,
    mut shutdown: watch::Receiver<bool>,
) -> NodeResult<()> {
    // Ticks announced while we were busy are merged by the watch channel;
    // every one of them still gets its epoch, in order
    let mut next = first;
    loop {
        if *shutdown.borrow_and_update() {
            debug!("shutdown requested");
            break;
        }
        let now = *ticks.borrow_and_update();
        if now > next {
            debug!(from = next, tick = now, "catching up on epochs");
        }
        while next <= now.min(horizon) {
            run_epoch(&shared, next).await?;
            next += 1;
        }
        if now > horizon {
            debug!(tick = now, "horizon passed");
            break;
        }

        tokio::select! {
            changed = ticks.changed() => {
                if changed.is_err() {
                    debug!("clock stopped");
                    break;
                }
            }
            _ = shutdown.changed() => {}
        }
    }
    Ok(())
}

/// Run the actions due at `now` concurrently and wait for all of them
async fn run_epoch(shared: &Arc<Shared>, now: Tick) -> NodeResult<()> {
    let actions = shared.state.lock().due_actions(now);
    trace!(tick = now, ?actions, "epoch");

    let mut workers = JoinSet::new();
    for action in actions {
        let shared = Arc::clone(shared);
        workers.spawn(
            async move {
                let message = shared.state.lock().perform(action, now);
                if let Some(message) = message {
                    shared.send(message).await;
                }
                action
            }
            .in_current_span(),
        );
    }

    while let Some(result) = workers.join_next().await {
        let action: EpochAction = result?;
        trace!(tick = now, %action, "action done");
    }
    Ok(())
}

async fn inbound_loop(
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
    grace: Duration,
) -> NodeResult<()> {
    while !*shutdown.borrow_and_update() {
        tokio::select! {
            line = shared.transport.recv() => match line? {
                Some(line) => shared.handle_line(line).await,
                None => {
                    debug!("inbound channel closed");
                    return Ok(());
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    // Drain what is already in flight
    let deadline = Instant::now() + grace;
    let mut drained = 0usize;
    loop {
        match tokio::time::timeout_at(deadline, shared.transport.recv()).await {
            Ok(Ok(Some(line))) => {
                shared.handle_line(line).await;
                drained += 1;
            }
            Ok(Ok(None)) | Err(_) => break,
            Ok(Err(e)) => return Err(e.into()),
        }
    }
    debug!(drained, "inbound loop stopped");
    Ok(())
}
