//! External launch contract.
//!
//! The dispatcher hands a [LaunchRequest] to a [Launcher] and only looks at whether it
//! succeeded. Whatever the launched routine does afterwards is invisible to the kernel.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use serde::Serialize;

use crate::kernel::error::KernelError;
use crate::kernel::identity::Pid;
use crate::kernel::process::ProcessRecord;

/// What a launcher is told about the process it should start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LaunchRequest {
    pub pid: Pid,
    pub name: String,
    pub memory_required: u64,
    pub disk_required: u64,
}

impl LaunchRequest {
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid(),
            name: record.name().to_string(),
            memory_required: record.memory_required(),
            disk_required: record.disk_required(),
        }
    }
}

/// Starts the routine a process stands for. Success or failure, nothing in between.
pub trait Launcher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError>;
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError> {
        (**self).launch(request)
    }
}

impl<L: Launcher + ?Sized> Launcher for Box<L> {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError> {
        (**self).launch(request)
    }
}

/// Runs `<program_dir>/<name> <pid> <ram> <disk>` as a child process.
///
/// The child is not waited on by the dispatcher. Exited children are reaped on the next
/// launch so they do not linger as zombies.
#[derive(Debug)]
pub struct CommandLauncher {
    program_dir: PathBuf,
    children: Mutex<Vec<Child>>,
}

impl CommandLauncher {
    pub fn new(program_dir: impl Into<PathBuf>) -> Self {
        Self {
            program_dir: program_dir.into(),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Programs under `./build` relative to the current directory.
    pub fn from_current_dir() -> Result<Self, KernelError> {
        let cwd = std::env::current_dir()
            .map_err(|e| KernelError::Launcher(format!("current dir: {e}")))?;
        Ok(Self::new(cwd.join("build")))
    }

    pub fn program_dir(&self) -> &Path {
        &self.program_dir
    }

    /// Resolve a task name to its executable path. Names that would escape the
    /// program directory are rejected.
    pub fn program_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        plain.then(|| self.program_dir.join(name))
    }

    /// Number of launched children that have not exited yet.
    pub fn live_children(&self) -> usize {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut children);
        children.len()
    }
}

fn reap(children: &mut Vec<Child>) {
    children.retain_mut(|child| match child.try_wait() {
        Ok(Some(status)) => {
            debug!("child {} exited with {}", child.id(), status);
            false
        }
        Ok(None) => true,
        Err(e) => {
            warn!("child {} wait failed: {}", child.id(), e);
            false
        }
    });
}

impl Launcher for CommandLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<(), KernelError> {
        let failed = |reason: String| KernelError::LaunchFailed {
            pid: request.pid,
            reason,
        };
        let path = self
            .program_path(&request.name)
            .ok_or_else(|| failed(format!("invalid program name {:?}", request.name)))?;
        if !path.is_file() {
            return Err(failed(format!("executable not found: {}", path.display())));
        }

        let child = Command::new(&path)
            .arg(request.pid.to_string())
            .arg(request.memory_required.to_string())
            .arg(request.disk_required.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| failed(format!("spawn {}: {e}", path.display())))?;
        debug!(
            "launched {} for process {} as os pid {}",
            path.display(),
            request.pid,
            child.id()
        );

        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut children);
        children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> LaunchRequest {
        LaunchRequest {
            pid: Pid::from_raw(3),
            name: name.to_string(),
            memory_required: 20,
            disk_required: 5,
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "procsim-launcher-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn request_copies_record_footprint() {
        let record = ProcessRecord::new(Pid::from_raw(4), "clock", 15, 2);
        let req = LaunchRequest::from_record(&record);
        assert_eq!(req.pid, Pid::from_raw(4));
        assert_eq!(req.name, "clock");
        assert_eq!(req.memory_required, 15);
        assert_eq!(req.disk_required, 2);
    }

    #[test]
    fn program_path_rejects_traversal() {
        let launcher = CommandLauncher::new("/opt/procsim/build");
        assert_eq!(
            launcher.program_path("clock"),
            Some(PathBuf::from("/opt/procsim/build/clock"))
        );
        assert_eq!(launcher.program_path("../bin/sh"), None);
        assert_eq!(launcher.program_path(".."), None);
        assert_eq!(launcher.program_path(""), None);
    }

    #[test]
    fn missing_executable_is_a_launch_failure() {
        let launcher = CommandLauncher::new(scratch_dir("missing"));
        let err = launcher.launch(&request("no_such_task")).unwrap_err();
        match err {
            KernelError::LaunchFailed { pid, reason } => {
                assert_eq!(pid, Pid::from_raw(3));
                assert!(reason.contains("executable not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn existing_executable_is_spawned_with_footprint_args() {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch_dir("spawn");
        let out = dir.join("args.txt");
        let script = dir.join("calculator");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > '{}'\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let launcher = CommandLauncher::new(&dir);
        launcher.launch(&request("calculator")).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while launcher.live_children() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "3 20 5");
    }
}
