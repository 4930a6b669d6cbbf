//! Logical time for a simulation run
//!
//! A [`LogicalClock`] is a tick counter guarded by a single mutex: increment,
//! reset and read never interleave. One clock is created per simulation run
//! and handed by `Arc` to every component that makes timing decisions, so
//! independent runs (and parallel tests) never share time.
//!
//! The [`Metronome`] advances a clock once per epoch of wall time and
//! publishes each new tick on a `watch` channel that node epoch loops and the
//! link schedule follow.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

/// One discrete unit of logical time
pub type Tick = u64;

/// Linearizable tick counter
#[derive(Debug, Default)]
pub struct LogicalClock {
    value: Mutex<Tick>,
}

impl LogicalClock {
    /// Create a clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock already shared behind an `Arc`
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance by one tick and return the new value
    pub fn tick(&self) -> Tick {
        let mut value = self.value.lock();
        *value += 1;
        *value
    }

    /// Set the clock back to 0
    pub fn reset(&self) {
        *self.value.lock() = 0;
    }

    /// Current tick
    pub fn time(&self) -> Tick {
        *self.value.lock()
    }
}

/// Drives a [`LogicalClock`] in wall time
///
/// Subscribers see the clock's value at subscription time first, then every
/// tick produced by [`Metronome::run`].
pub struct Metronome {
    clock: Arc<LogicalClock>,
    period: Duration,
    tx: watch::Sender<Tick>,
}

impl Metronome {
    /// Create a metronome ticking `clock` once every `period`
    pub fn new(clock: Arc<LogicalClock>, period: Duration) -> Self {
        let (tx, _rx) = watch::channel(clock.time());
        Self { clock, period, tx }
    }

    /// The clock this metronome drives
    pub fn clock(&self) -> &Arc<LogicalClock> {
        &self.clock
    }

    /// Epoch length in wall time
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Subscribe to tick announcements
    pub fn subscribe(&self) -> watch::Receiver<Tick> {
        self.tx.subscribe()
    }

    /// Tick until the published value exceeds `horizon`
    ///
    /// Returns the last tick published. Subscribers observe the channel
    /// closing once this future completes and the metronome is dropped.
    pub async fn run(self, horizon: Tick) -> Tick {
        self.tx.send_replace(self.clock.time());
        loop {
            tokio::time::sleep(self.period).await;
            let now = self.clock.tick();
            trace!(tick = now, "epoch");
            self.tx.send_replace(now);
            if now > horizon {
                debug!(tick = now, horizon, "metronome reached horizon");
                return now;
            }
        }
    }
}
