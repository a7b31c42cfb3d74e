//! Read-only views handed to the presentation layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kernel::identity::Pid;
use crate::kernel::ledger::LedgerCounters;
use crate::kernel::process::{ProcessRecord, ProcessState};

/// User/kernel mode flag. Informational only: no operation checks it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    #[default]
    User,
    Kernel,
}

impl SystemMode {
    pub fn toggled(self) -> Self {
        match self {
            SystemMode::User => SystemMode::Kernel,
            SystemMode::Kernel => SystemMode::User,
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemMode::User => f.write_str("USER"),
            SystemMode::Kernel => f.write_str("KERNEL"),
        }
    }
}

/// Per-record summary: pid, name, state, declared footprint, execution time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub memory_required: u64,
    pub disk_required: u64,
    pub elapsed_secs: u64,
}

impl ProcessSummary {
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid(),
            name: record.name().to_string(),
            state: record.state(),
            memory_required: record.memory_required(),
            disk_required: record.disk_required(),
            elapsed_secs: record.elapsed().as_secs(),
        }
    }
}

/// Used vs. total capacity. Cores in use is the size of the running set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub ram_used: u64,
    pub ram_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub cores_in_use: u32,
    pub cores_total: u32,
}

impl ResourceSnapshot {
    pub fn new(counters: LedgerCounters, running: usize) -> Self {
        Self {
            ram_used: counters.total_ram - counters.available_ram,
            ram_total: counters.total_ram,
            disk_used: counters.total_disk - counters.available_disk,
            disk_total: counters.total_disk,
            cores_in_use: u32::try_from(running).unwrap_or(u32::MAX),
            cores_total: counters.total_cores,
        }
    }

    pub fn ram_available(&self) -> u64 {
        self.ram_total - self.ram_used
    }

    pub fn disk_available(&self) -> u64 {
        self.disk_total - self.disk_used
    }
}

/// Status view of the running and blocked sets. Ready-queue records are only counted.
#[derive(Clone, Debug, Serialize)]
pub struct SystemSnapshot {
    pub taken_at: DateTime<Utc>,
    pub mode: SystemMode,
    pub scheduler_running: bool,
    pub resources: ResourceSnapshot,
    pub ready_count: usize,
    pub running: Vec<ProcessSummary>,
    pub blocked: Vec<ProcessSummary>,
}

impl SystemSnapshot {
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    /// Summary for `pid` if it is running or blocked.
    pub fn find(&self, pid: Pid) -> Option<&ProcessSummary> {
        self.running
            .iter()
            .chain(self.blocked.iter())
            .find(|p| p.pid == pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.find(pid).is_some()
    }
}

/// Outcome of [Dispatcher::shutdown](super::Dispatcher::shutdown).
#[derive(Clone, Debug, Default, Serialize)]
pub struct ShutdownReport {
    /// Running records, now Terminated with their resources released.
    pub terminated: Vec<ProcessSummary>,
    /// Blocked records dropped without releasing their resources.
    pub discarded_blocked: Vec<Pid>,
    /// Ready records dropped without releasing their resources.
    pub discarded_ready: Vec<Pid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_toggles_and_displays() {
        assert_eq!(SystemMode::default(), SystemMode::User);
        assert_eq!(SystemMode::User.toggled(), SystemMode::Kernel);
        assert_eq!(SystemMode::Kernel.toggled().to_string(), "USER");
    }

    #[test]
    fn resource_snapshot_derives_usage() {
        let counters = LedgerCounters {
            total_ram: 2048,
            total_disk: 1000,
            total_cores: 4,
            available_ram: 2008,
            available_disk: 990,
            available_cores: 4,
        };
        let snap = ResourceSnapshot::new(counters, 2);
        assert_eq!(snap.ram_used, 40);
        assert_eq!(snap.disk_used, 10);
        assert_eq!(snap.cores_in_use, 2);
        assert_eq!(snap.ram_available(), 2008);
        assert_eq!(snap.disk_available(), 990);
    }

    #[test]
    fn summary_of_unstarted_record_has_zero_elapsed() {
        let mut record = ProcessRecord::new(Pid::from_raw(2), "calendar", 25, 8);
        record.ready();
        let summary = ProcessSummary::from_record(&record);
        assert_eq!(summary.state, ProcessState::Ready);
        assert_eq!(summary.elapsed_secs, 0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pid"], 2);
        assert_eq!(json["state"], "ready");
    }
}
