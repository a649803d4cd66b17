//! Drift-free tick loop.
//!
//! Tick `i` targets `start + i * delay`, measured from the instant the loop
//! starts rather than from when the previous tick finished, so a slow tick
//! delays only itself. A tick whose target has already passed fires at once;
//! no tick number is ever skipped.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::error::ScheduleError;
use crate::monitor::Monitor;

/// What to do when a monitor's sample step fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Close everything and stop the run.
    #[default]
    FailFast,
    /// Close and disable only the failing monitor.
    Isolate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// 1-based sequence number.
    pub seq: u64,
    pub target: Instant,
    /// Wall clock at firing, seconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shutdown {
    Interrupted,
    /// The configured tick count was reached.
    Completed,
}

struct Slot {
    monitor: Monitor,
    enabled: bool,
}

pub struct Scheduler {
    delay: Duration,
    policy: FailurePolicy,
    max_ticks: Option<u64>,
    slots: Vec<Slot>,
}

impl Tick {
    /// How far past its target this tick is running.
    pub fn late_by(&self) -> Duration {
        Instant::now().saturating_duration_since(self.target)
    }
}

pub fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Target fire time of tick `seq`.
pub fn tick_target(start: Instant, delay: Duration, seq: u64) -> Instant {
    match u32::try_from(seq) {
        Ok(n) => start + delay * n,
        Err(_) => start + delay.mul_f64(seq as f64),
    }
}

impl Scheduler {
    pub fn new(delay: Duration, policy: FailurePolicy) -> Self {
        Scheduler {
            delay,
            policy,
            max_ticks: None,
            slots: Vec::new(),
        }
    }

    /// Stop cleanly after `ticks` ticks instead of running until interrupted.
    pub fn with_max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Monitors of equal priority keep their registration order.
    pub fn register(&mut self, monitor: Monitor) {
        let at = self
            .slots
            .partition_point(|s| s.monitor.priority() <= monitor.priority());
        self.slots.insert(
            at,
            Slot {
                monitor,
                enabled: true,
            },
        );
    }

    /// Registered monitor names in execution order.
    pub fn order(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.monitor.name()).collect()
    }

    /// Runs until `shutdown` turns true, the tick limit is reached, or a
    /// monitor fails under [`FailurePolicy::FailFast`]. Every monitor is
    /// closed exactly once before this returns.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Shutdown, ScheduleError> {
        let result = self.tick_loop(&mut shutdown).await;
        for slot in &mut self.slots {
            slot.monitor.close();
        }
        result
    }

    async fn tick_loop(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Shutdown, ScheduleError> {
        let start = Instant::now();
        let policy = self.policy;
        let mut seq: u64 = 0;

        loop {
            if self.max_ticks.is_some_and(|max| seq >= max) {
                return Ok(Shutdown::Completed);
            }
            seq += 1;
            let target = tick_target(start, self.delay, seq);
            if wait_until(target, shutdown).await {
                return Ok(Shutdown::Interrupted);
            }

            let tick = Tick {
                seq,
                target,
                timestamp: epoch_secs(),
            };
            debug!(seq, late_by = ?tick.late_by(), "tick");

            for slot in self.slots.iter_mut().filter(|s| s.enabled) {
                if *shutdown.borrow() {
                    return Ok(Shutdown::Interrupted);
                }
                if let Err(source) = slot.monitor.sample(&tick) {
                    let name = slot.monitor.name();
                    match policy {
                        FailurePolicy::FailFast => {
                            return Err(ScheduleError::Collector { name, source });
                        }
                        FailurePolicy::Isolate => {
                            error!(monitor = name, %source, "monitor failed, disabling it");
                            slot.monitor.close();
                            slot.enabled = false;
                        }
                    }
                }
                // Lets a pending interrupt land before the next monitor.
                tokio::task::yield_now().await;
            }

            if !self.slots.is_empty() && self.slots.iter().all(|s| !s.enabled) {
                return Err(ScheduleError::AllCollectorsFailed);
            }
        }
    }
}

/// Sleeps until `target`. Returns `true` if shutdown was requested first.
async fn wait_until(target: Instant, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = time::sleep_until(target);
    tokio::pin!(sleep);
    loop {
        if *shutdown.borrow_and_update() {
            info!("shutdown requested");
            return true;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Nobody can request shutdown any more; just wait.
                    sleep.as_mut().await;
                    return *shutdown.borrow();
                }
            }
            () = &mut sleep => return false,
        }
    }
}
