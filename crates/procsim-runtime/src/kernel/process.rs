//! Process lifecycle record and its state machine.
//!
//! Transitions are guarded: a call that does not apply to the current state is absorbed
//! silently so that requests issued against a stale record cannot corrupt it.
//!
//! ```text
//! New     --ready-->     Ready
//! Blocked --ready-->     Ready
//! Ready   --run-->       Running
//! Running --block-->     Blocked
//! Running --terminate--> Terminated
//! Blocked --terminate--> Terminated
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::identity::Pid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Terminated,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::New => "new",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
            ProcessState::Terminated => "terminated",
        }
    }
}

/// One simulated process. Owned by exactly one dispatcher container at a time.
#[derive(Debug)]
pub struct ProcessRecord {
    pid: Pid,
    name: String,
    memory_required: u64,
    disk_required: u64,
    state: ProcessState,
    creation_time: Instant,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl ProcessRecord {
    /// New record in [ProcessState::New].
    pub fn new(
        pid: Pid,
        name: impl Into<String>,
        memory_required: u64,
        disk_required: u64,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            memory_required,
            disk_required,
            state: ProcessState::New,
            creation_time: Instant::now(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory_required(&self) -> u64 {
        self.memory_required
    }

    pub fn disk_required(&self) -> u64 {
        self.disk_required
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn creation_time(&self) -> Instant {
        self.creation_time
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    /// New or Blocked → Ready.
    pub fn ready(&mut self) {
        if matches!(self.state, ProcessState::New | ProcessState::Blocked) {
            self.state = ProcessState::Ready;
        }
    }

    /// Ready → Running; stamps the start time.
    pub fn run(&mut self) {
        if self.state == ProcessState::Ready {
            self.state = ProcessState::Running;
            self.start_time = Some(Instant::now());
        }
    }

    /// Running → Blocked.
    pub fn block(&mut self) {
        if self.state == ProcessState::Running {
            self.state = ProcessState::Blocked;
        }
    }

    /// Any state → Terminated; stamps the end time. Idempotent.
    pub fn terminate(&mut self) {
        if self.state != ProcessState::Terminated {
            self.state = ProcessState::Terminated;
            self.end_time = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    /// Execution time so far: `now - start` while Running, `end - start` once Terminated,
    /// zero otherwise.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match (self.state, self.start_time, self.end_time) {
            (ProcessState::Running, Some(start), _) => now.saturating_duration_since(start),
            (ProcessState::Terminated, Some(start), Some(end)) => {
                end.saturating_duration_since(start)
            }
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProcessRecord {
        ProcessRecord::new(Pid::from_raw(1), "notepad", 50, 10)
    }

    #[test]
    fn full_lifecycle_follows_table() {
        let mut p = record();
        assert_eq!(p.state(), ProcessState::New);
        p.ready();
        assert_eq!(p.state(), ProcessState::Ready);
        p.run();
        assert_eq!(p.state(), ProcessState::Running);
        assert!(p.start_time().is_some());
        p.block();
        assert_eq!(p.state(), ProcessState::Blocked);
        p.ready();
        assert_eq!(p.state(), ProcessState::Ready);
        p.run();
        p.terminate();
        assert_eq!(p.state(), ProcessState::Terminated);
        assert!(p.end_time().is_some());
    }

    #[test]
    fn guards_absorb_out_of_order_transitions() {
        let mut p = record();
        p.run();
        assert_eq!(p.state(), ProcessState::New, "run from New is a no-op");
        p.block();
        assert_eq!(p.state(), ProcessState::New, "block from New is a no-op");

        p.ready();
        p.ready();
        assert_eq!(p.state(), ProcessState::Ready);
        p.block();
        assert_eq!(p.state(), ProcessState::Ready, "block from Ready is a no-op");

        p.run();
        p.ready();
        assert_eq!(p.state(), ProcessState::Running, "ready from Running is a no-op");
    }

    #[test]
    fn terminate_is_terminal_and_idempotent() {
        let mut p = record();
        p.ready();
        p.run();
        p.terminate();
        let end = p.end_time();
        p.terminate();
        assert_eq!(p.end_time(), end);
        p.ready();
        p.run();
        p.block();
        assert_eq!(p.state(), ProcessState::Terminated);
    }

    #[test]
    fn elapsed_depends_on_state() {
        let mut p = record();
        let later = Instant::now() + Duration::from_secs(5);
        assert_eq!(p.elapsed_at(later), Duration::ZERO);

        p.ready();
        p.run();
        let start = p.start_time().unwrap();
        assert_eq!(
            p.elapsed_at(start + Duration::from_secs(3)),
            Duration::from_secs(3)
        );

        p.block();
        assert_eq!(p.elapsed_at(later), Duration::ZERO);

        p.terminate();
        let end = p.end_time().unwrap();
        assert_eq!(
            p.elapsed_at(later + Duration::from_secs(100)),
            end - start
        );
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProcessState::Terminated).unwrap(),
            "\"terminated\""
        );
        assert_eq!(ProcessState::Blocked.as_str(), "blocked");
    }
}
