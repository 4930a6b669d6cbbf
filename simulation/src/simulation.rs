//! Simulation runner
//!
//! A [`Simulation`] owns one [`LogicalClock`] and everything that reads it:
//! the nodes, the link schedule and the [`Controller`]. [`Simulation::run`]
//!
//! 1. resets the clock and brings up the tick-0 links
//! 2. spawns every node and attaches it to the controller
//! 3. spawns the schedule follower, which applies link changes as ticks pass
//! 4. drives the clock with a [`Metronome`] until the horizon is passed
//! 5. joins the nodes and the controller into a [`SimReport`]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use olsr_core::transport::DEFAULT_CHANNEL_CAPACITY;
use olsr_core::{LogicalClock, Metronome, NodeId, Tick};
use olsr_node::{DEFAULT_HORIZON, Delivery, Node, NodeConfig, NodeReport, ScheduledSend};
use olsr_routing::Route;

use crate::controller::{Controller, ControllerStats};
use crate::error::{SimError, SimResult};
use crate::schedule::{LinkSchedule, LinkSet};
use crate::topology::Topology;

/// Configuration of a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Last tick on which nodes run their epoch actions
    pub horizon: Tick,
    /// Wall-clock length of one tick
    pub epoch: Duration,
    /// Capacity of every node's inbound and outbound channel
    pub channel_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            epoch: Duration::from_secs(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SimConfig {
    pub fn with_horizon(mut self, horizon: Tick) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Nodes, link schedule and clock of one run
pub struct Simulation {
    config: SimConfig,
    clock: Arc<LogicalClock>,
    schedule: LinkSchedule,
    nodes: BTreeMap<NodeId, Option<ScheduledSend>>,
}

impl Simulation {
    pub fn new(config: SimConfig, schedule: LinkSchedule) -> Self {
        Self {
            config,
            clock: LogicalClock::shared(),
            schedule,
            nodes: BTreeMap::new(),
        }
    }

    /// A run over every node of `topology`, with its schedule
    pub fn from_topology(config: SimConfig, topology: &Topology) -> Self {
        let mut sim = Self::new(config, topology.schedule());
        for id in topology.node_ids() {
            sim.nodes.insert(id, None);
        }
        sim
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<LogicalClock> {
        &self.clock
    }

    pub fn schedule(&self) -> &LinkSchedule {
        &self.schedule
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn add_node(&mut self, id: NodeId) -> SimResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        self.nodes.insert(id, None);
        Ok(())
    }

    /// Add every node the schedule mentions that is not yet part of the run
    pub fn add_scheduled_nodes(&mut self) {
        for id in self.schedule.nodes() {
            self.nodes.entry(id).or_insert(None);
        }
    }

    /// Give `from` a payload to originate; replaces any earlier one
    pub fn schedule_send(&mut self, from: &NodeId, send: ScheduledSend) -> SimResult<()> {
        let slot = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| SimError::UnknownSender(from.clone()))?;
        *slot = Some(send);
        Ok(())
    }

    fn node_config(&self, id: &NodeId, send: &Option<ScheduledSend>) -> NodeConfig {
        let config = NodeConfig::new(id.clone())
            .with_horizon(self.config.horizon)
            .with_grace(self.config.epoch)
            .with_channel_capacity(self.config.channel_capacity);
        match send {
            Some(send) => config.with_scheduled_send(send.clone()),
            None => config,
        }
    }

    /// Run until the clock passes the horizon and collect every node's report
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run(self) -> SimResult<SimReport> {
        if self.nodes.is_empty() {
            return Err(SimError::NoNodes);
        }
        if self.config.epoch.is_zero() {
            return Err(SimError::ZeroEpoch);
        }

        self.clock.reset();
        let links = Arc::new(LinkSet::new());
        self.schedule.apply(0, &links);

        let metronome = Metronome::new(Arc::clone(&self.clock), self.config.epoch);
        let mut controller = Controller::new(Arc::clone(&links));
        let mut handles = Vec::with_capacity(self.nodes.len());
        for (id, send) in &self.nodes {
            let config = self.node_config(id, send);
            let (node, peer) = Node::with_channel(config, Arc::clone(&self.clock), metronome.subscribe());
            controller.attach(id.clone(), peer);
            handles.push(node.spawn());
        }
        info!(
            nodes = handles.len(),
            links = links.len(),
            horizon = self.config.horizon,
            "simulation started"
        );

        let follower = tokio::spawn(follow_schedule(
            self.schedule.clone(),
            Arc::clone(&links),
            metronome.subscribe(),
        ));
        let final_tick = metronome.run(self.config.horizon).await;

        let mut nodes = BTreeMap::new();
        for handle in handles {
            let report = handle.join().await?;
            nodes.insert(report.id.clone(), report);
        }
        follower.await?;
        let links = controller.join().await;

        let report = SimReport {
            final_tick,
            nodes,
            links,
        };
        info!(
            final_tick,
            deliveries = report.deliveries().count(),
            dropped = report.links.dropped,
            "simulation finished"
        );
        Ok(report)
    }
}

/// Apply link changes for every tick the clock passes
///
/// Tick 0 is applied before the nodes start. Ends when the metronome stops.
async fn follow_schedule(schedule: LinkSchedule, links: Arc<LinkSet>, mut ticks: watch::Receiver<Tick>) {
    let mut applied: Tick = 0;
    while ticks.changed().await.is_ok() {
        let now = *ticks.borrow_and_update();
        for tick in applied + 1..=now {
            schedule.apply(tick, &links);
        }
        applied = applied.max(now);
    }
    debug!(applied, "schedule follower stopped");
}

/// Outcome of a simulation run
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Tick at which the metronome stopped
    pub final_tick: Tick,
    pub nodes: BTreeMap<NodeId, NodeReport>,
    pub links: ControllerStats,
}

impl SimReport {
    pub fn node(&self, id: &NodeId) -> Option<&NodeReport> {
        self.nodes.get(id)
    }

    /// Route of `from` towards `to` at the end of the run
    pub fn route(&self, from: &NodeId, to: &NodeId) -> Option<&Route> {
        self.nodes.get(from)?.routes.get(to)
    }

    /// Every delivery, paired with the node that consumed it
    pub fn deliveries(&self) -> impl Iterator<Item = (&NodeId, &Delivery)> {
        self.nodes
            .iter()
            .flat_map(|(id, report)| report.deliveries.iter().map(move |d| (id, d)))
    }

    /// Write each node's received lines to `<dir>/<id>received.txt`
    pub fn write_received(&self, dir: &Path) -> SimResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.nodes.len());
        for (id, report) in &self.nodes {
            let path = dir.join(format!("{id}received.txt"));
            let mut contents = String::new();
            for line in &report.received {
                contents.push_str(line);
                contents.push('\n');
            }
            std::fs::write(&path, contents)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Human-readable routes and deliveries of every node
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Simulation stopped at tick {}\n", self.final_tick));
        output.push_str(&format!(
            "  Lines sent: {}, delivered: {}, dropped: {}\n",
            self.links.sent, self.links.delivered, self.links.dropped
        ));

        for (id, report) in &self.nodes {
            output.push_str(&format!("\nNode {id}\n"));
            let bidir: Vec<&str> = report.bidir.iter().map(NodeId::as_str).collect();
            let mpr: Vec<&str> = report.mpr.iter().map(NodeId::as_str).collect();
            let selectors: Vec<&str> = report.selectors.iter().map(NodeId::as_str).collect();
            output.push_str(&format!("  BIDIR [{}]\n", bidir.join(", ")));
            output.push_str(&format!("  MPR [{}]  MS [{}]\n", mpr.join(", "), selectors.join(", ")));
            for (destination, route) in report.routes.iter() {
                output.push_str(&format!(
                    "  route {} via {} ({} hops)\n",
                    destination, route.next_hop, route.hop_count
                ));
            }
            for delivery in &report.deliveries {
                output.push_str(&format!(
                    "  received {:?} from {} at tick {}\n",
                    delivery.payload, delivery.originator, delivery.tick
                ));
            }
            if let Some(pending) = &report.pending_send {
                output.push_str(&format!(
                    "  undelivered {:?} for {} (next attempt at tick {})\n",
                    pending.payload, pending.destination, pending.at
                ));
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_empty_simulation_is_rejected() {
        let sim = Simulation::new(SimConfig::default(), LinkSchedule::new());
        assert!(matches!(sim.run().await, Err(SimError::NoNodes)));
    }

    #[tokio::test]
    async fn test_zero_epoch_is_rejected() {
        let sim = Simulation::from_topology(
            SimConfig::default().with_epoch(Duration::ZERO),
            &TopologyBuilder::new(2).line(),
        );
        assert!(matches!(sim.run().await, Err(SimError::ZeroEpoch)));
    }

    #[test]
    fn test_duplicate_and_unknown_nodes() {
        let mut sim = Simulation::from_topology(SimConfig::default(), &TopologyBuilder::new(2).line());
        assert!(matches!(sim.add_node(id("A")), Err(SimError::DuplicateNode(_))));
        assert!(sim.add_node(id("C")).is_ok());

        let send = ScheduledSend::new(id("A"), "x", 1);
        assert!(matches!(
            sim.schedule_send(&id("Z"), send.clone()),
            Err(SimError::UnknownSender(_))
        ));
        assert!(sim.schedule_send(&id("B"), send).is_ok());
    }

    #[test]
    fn test_scheduled_nodes_are_added() {
        let schedule = LinkSchedule::parse("0 UP A B\n9 UP B C\n").unwrap();
        let mut sim = Simulation::new(SimConfig::default(), schedule);
        sim.add_scheduled_nodes();
        assert_eq!(sim.node_ids(), vec![id("A"), id("B"), id("C")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_resets_clock_and_reports_every_node() {
        let sim = Simulation::from_topology(
            SimConfig::default().with_horizon(12),
            &TopologyBuilder::new(3).line(),
        );
        sim.clock().tick();
        sim.clock().tick();

        let report = sim.run().await.unwrap();
        assert_eq!(report.final_tick, 13);
        assert_eq!(report.nodes.len(), 3);
        assert_eq!(report.route(&id("A"), &id("B")).unwrap().hop_count, 1);
        assert!(report.links.delivered > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_received_files() {
        let sim = Simulation::from_topology(
            SimConfig::default().with_horizon(6),
            &TopologyBuilder::new(2).line(),
        );
        let report = sim.run().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = report.write_received(dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let contents = std::fs::read_to_string(dir.path().join("Areceived.txt")).unwrap();
        assert!(contents.starts_with("* B HELLO"));
        assert!(contents.ends_with('\n'));
        assert!(report.summary().contains("Node B"));
    }
}
