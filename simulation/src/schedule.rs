//! Link schedule
//!
//! The schedule decides which directed sender/receiver pairs may exchange
//! messages at each tick. It is read from lines of the form
//!
//! ```text
//! <tick> <UP|DOWN> <from> <to>
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Links are directed:
//! `0 UP A B` lets B hear A, not the other way round.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use olsr_core::{NodeId, Tick};

use crate::error::ScheduleError;

/// Direction of a link change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkChange {
    Up,
    Down,
}

impl Display for LinkChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkChange::Up => f.write_str("UP"),
            LinkChange::Down => f.write_str("DOWN"),
        }
    }
}

impl FromStr for LinkChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(LinkChange::Up),
            "DOWN" => Ok(LinkChange::Down),
            other => Err(format!("expected UP or DOWN, got {other:?}")),
        }
    }
}

/// One scheduled change of a directed link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvent {
    pub tick: Tick,
    pub change: LinkChange,
    pub from: NodeId,
    pub to: NodeId,
}

impl LinkEvent {
    pub fn up(tick: Tick, from: NodeId, to: NodeId) -> Self {
        Self {
            tick,
            change: LinkChange::Up,
            from,
            to,
        }
    }

    pub fn down(tick: Tick, from: NodeId, to: NodeId) -> Self {
        Self {
            tick,
            change: LinkChange::Down,
            from,
            to,
        }
    }
}

impl Display for LinkEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.tick, self.change, self.from, self.to)
    }
}

fn parse_event(line: &str) -> Result<LinkEvent, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [tick, change, from, to] = tokens.as_slice() else {
        return Err(format!("expected 4 tokens, got {}", tokens.len()));
    };
    let tick = tick
        .parse::<Tick>()
        .map_err(|e| format!("bad tick {tick:?}: {e}"))?;
    let change = change.parse::<LinkChange>()?;
    let from = NodeId::new(*from).map_err(|e| e.to_string())?;
    let to = NodeId::new(*to).map_err(|e| e.to_string())?;
    Ok(LinkEvent {
        tick,
        change,
        from,
        to,
    })
}

/// Link events grouped by tick
///
/// Events of the same tick are applied in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSchedule {
    events: BTreeMap<Tick, Vec<LinkEvent>>,
}

impl LinkSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schedule; errors name the offending line (1-based)
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let mut schedule = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let event = parse_event(line).map_err(|reason| ScheduleError::Parse {
                line: index + 1,
                reason,
            })?;
            schedule.push(event);
        }
        Ok(schedule)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScheduleError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn push(&mut self, event: LinkEvent) {
        self.events.entry(event.tick).or_default().push(event);
    }

    /// Schedule `change` in both directions between `a` and `b`
    pub fn push_symmetric(&mut self, tick: Tick, change: LinkChange, a: &NodeId, b: &NodeId) {
        for (from, to) in [(a, b), (b, a)] {
            self.push(LinkEvent {
                tick,
                change,
                from: from.clone(),
                to: to.clone(),
            });
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &LinkEvent> {
        self.events.values().flatten()
    }

    pub fn events_at(&self, tick: Tick) -> &[LinkEvent] {
        self.events.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every node named by some event
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.events()
            .flat_map(|e| [e.from.clone(), e.to.clone()])
            .collect()
    }

    /// Last tick that changes anything
    pub fn last_tick(&self) -> Option<Tick> {
        self.events.keys().next_back().copied()
    }

    /// Apply the events of exactly `tick`; returns how many were applied
    pub fn apply(&self, tick: Tick, links: &LinkSet) -> usize {
        let events = self.events_at(tick);
        for event in events {
            trace!(%event, "link change");
            links.apply(event);
        }
        if !events.is_empty() {
            debug!(tick, changes = events.len(), "schedule applied");
        }
        events.len()
    }
}

impl Display for LinkSchedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for event in self.events() {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}

impl FromStr for LinkSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Directed links that are currently up
#[derive(Debug, Default)]
pub struct LinkSet {
    up: RwLock<BTreeSet<(NodeId, NodeId)>>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: &LinkEvent) {
        let key = (event.from.clone(), event.to.clone());
        let mut up = self.up.write();
        match event.change {
            LinkChange::Up => {
                up.insert(key);
            }
            LinkChange::Down => {
                up.remove(&key);
            }
        }
    }

    /// Whether `to` currently hears `from`
    pub fn is_up(&self, from: &NodeId, to: &NodeId) -> bool {
        self.up.read().contains(&(from.clone(), to.clone()))
    }

    /// Every node currently hearing `from`
    pub fn receivers_of(&self, from: &NodeId) -> Vec<NodeId> {
        self.up
            .read()
            .iter()
            .filter(|(sender, _)| sender == from)
            .map(|(_, receiver)| receiver.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.up.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.up.read().is_empty()
    }
}
