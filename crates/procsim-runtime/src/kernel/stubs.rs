//! Launchers with fixed or scripted outcomes, for tests and demos.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::KernelError;
use super::identity::Pid;
use super::runtime::{LaunchRequest, Launcher};

/// Every launch succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysLaunch;

impl Launcher for AlwaysLaunch {
    fn launch(&self, _request: &LaunchRequest) -> Result<(), KernelError> {
        Ok(())
    }
}

/// Every launch fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverLaunch;

impl Launcher for NeverLaunch {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError> {
        Err(KernelError::LaunchFailed {
            pid: request.pid,
            reason: "launcher refuses all requests".to_string(),
        })
    }
}

#[derive(Debug, Default)]
struct Script {
    requests: Vec<LaunchRequest>,
    failing_names: HashSet<String>,
    failing_pids: HashSet<Pid>,
}

/// Records every request. Succeeds unless the name or pid has been marked as failing.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    script: Mutex<Script>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_name(&self, name: impl Into<String>) {
        self.script().failing_names.insert(name.into());
    }

    pub fn fail_pid(&self, pid: Pid) {
        self.script().failing_pids.insert(pid);
    }

    /// Clears every failure mark.
    pub fn succeed_all(&self) {
        let mut script = self.script();
        script.failing_names.clear();
        script.failing_pids.clear();
    }

    /// All requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.script().requests.clone()
    }

    pub fn launches_of(&self, pid: Pid) -> usize {
        self.script().requests.iter().filter(|r| r.pid == pid).count()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError> {
        let mut script = self.script();
        script.requests.push(request.clone());
        let failing = script.failing_names.contains(&request.name)
            || script.failing_pids.contains(&request.pid);
        if failing {
            return Err(KernelError::LaunchFailed {
                pid: request.pid,
                reason: format!("scripted failure for {}", request.name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pid: u64, name: &str) -> LaunchRequest {
        LaunchRequest {
            pid: Pid::from_raw(pid),
            name: name.to_string(),
            memory_required: 1,
            disk_required: 1,
        }
    }

    #[test]
    fn fixed_outcome_launchers() {
        assert!(AlwaysLaunch.launch(&request(1, "a")).is_ok());
        assert!(matches!(
            NeverLaunch.launch(&request(1, "a")),
            Err(KernelError::LaunchFailed { .. })
        ));
    }

    #[test]
    fn recording_launcher_scripts_failures() {
        let launcher = RecordingLauncher::new();
        launcher.fail_name("minesweeper");
        launcher.fail_pid(Pid::from_raw(3));

        assert!(launcher.launch(&request(1, "clock")).is_ok());
        assert!(launcher.launch(&request(2, "minesweeper")).is_err());
        assert!(launcher.launch(&request(3, "clock")).is_err());

        launcher.succeed_all();
        assert!(launcher.launch(&request(3, "clock")).is_ok());
        assert_eq!(launcher.requests().len(), 4);
        assert_eq!(launcher.launches_of(Pid::from_raw(3)), 2);
    }
}
