//! Scheduler loop.
//!
//! One dedicated thread parks on the dispatcher's condition variable until the ready queue
//! is non-empty or shutdown is requested. Each wake takes the whole ready queue and
//! dispatches it in one pass outside the table lock, then sleeps for
//! [SchedulerConfig::drain_pause] before waiting again. Shutdown is seen at the next wait.

use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::kernel::error::KernelError;

use super::dispatcher::Shared;

/// Scheduler tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pause after each drain pass, in milliseconds.
    pub drain_pause_ms: u64,
    /// Name given to the scheduler thread.
    pub thread_name: String,
}

impl SchedulerConfig {
    pub fn drain_pause(&self) -> Duration {
        Duration::from_millis(self.drain_pause_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_pause_ms: 100,
            thread_name: "procsim-scheduler".to_string(),
        }
    }
}

/// Result of one drain pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records moved into the running set.
    pub launched: usize,
    /// Records discarded after a launch failure, resources released.
    pub failed: usize,
    /// Records launched while shutdown was in progress, terminated immediately.
    pub terminated_on_shutdown: usize,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.launched + self.failed + self.terminated_on_shutdown
    }
}

/// Join handle for the scheduler thread.
#[derive(Debug)]
pub struct SchedulerHandle {
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Result<Self, KernelError> {
        let name = shared.config.thread_name.clone();
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || run_loop(&shared))
            .map_err(|e| KernelError::Scheduler(format!("spawn scheduler thread: {e}")))?;
        Ok(Self { thread })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to exit. Must not be called from the scheduler thread itself.
    pub fn join(self) {
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        if self.thread.join().is_err() {
            warn!("scheduler thread panicked");
        }
    }
}

fn run_loop(shared: &Shared) {
    info!("scheduler started");
    let mut passes: u64 = 0;
    loop {
        let batch = {
            let table = shared.lock_table();
            let mut table = shared
                .wake
                .wait_while(table, |t| t.ready.is_empty() && !t.stopping)
                .unwrap_or_else(PoisonError::into_inner);
            if table.stopping {
                break;
            }
            std::mem::take(&mut table.ready)
        };

        let report = shared.dispatch_batch(batch);
        passes += 1;
        debug!(
            "drain pass {}: launched={} failed={} terminated_on_shutdown={}",
            passes, report.launched, report.failed, report.terminated_on_shutdown
        );
        thread::sleep(shared.config.drain_pause());
    }
    info!("scheduler stopped after {} drain passes", passes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_pauses_100ms() {
        let config = SchedulerConfig::default();
        assert_eq!(config.drain_pause(), Duration::from_millis(100));
        assert_eq!(config.thread_name, "procsim-scheduler");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"drain_pause_ms": 5}"#).unwrap();
        assert_eq!(config.drain_pause(), Duration::from_millis(5));
        assert_eq!(config.thread_name, "procsim-scheduler");
    }

    #[test]
    fn report_counts_attempts() {
        let report = DrainReport {
            launched: 2,
            failed: 1,
            terminated_on_shutdown: 1,
        };
        assert_eq!(report.attempted(), 4);
    }
}
