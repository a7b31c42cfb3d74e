//! Built-in applications and their declared footprints.

use log::warn;
use serde::Serialize;

use crate::kernel::error::KernelError;
use crate::kernel::identity::Pid;
use crate::kernel::runtime::Dispatcher;

/// A launchable application: name plus the RAM/disk it asks for at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    pub name: &'static str,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl TaskSpec {
    pub const fn new(name: &'static str, memory_mb: u64, disk_mb: u64) -> Self {
        Self {
            name,
            memory_mb,
            disk_mb,
        }
    }

    pub fn launch(&self, dispatcher: &Dispatcher) -> Result<Pid, KernelError> {
        dispatcher.create_process(self.name, self.memory_mb, self.disk_mb)
    }
}

pub const BUILTIN_TASKS: &[TaskSpec] = &[
    TaskSpec::new("notepad", 50, 10),
    TaskSpec::new("calculator", 20, 5),
    TaskSpec::new("clock", 15, 2),
    TaskSpec::new("file_manager", 40, 5),
    TaskSpec::new("minesweeper", 30, 10),
    TaskSpec::new("music_player", 60, 20),
    TaskSpec::new("calendar", 25, 8),
    TaskSpec::new("timer", 10, 2),
    TaskSpec::new("terminal", 15, 3),
    TaskSpec::new("system_monitor", 25, 4),
    TaskSpec::new("settings", 20, 3),
];

/// Started right after boot.
pub const BACKGROUND_SERVICES: &[&str] = &["clock", "calendar"];

pub fn find_task(name: &str) -> Option<&'static TaskSpec> {
    BUILTIN_TASKS.iter().find(|t| t.name == name)
}

/// Admit every background service. Services that fail admission are logged and skipped.
pub fn boot_background_services(dispatcher: &Dispatcher) -> Vec<Pid> {
    BACKGROUND_SERVICES
        .iter()
        .filter_map(|name| find_task(name))
        .filter_map(|task| match task.launch(dispatcher) {
            Ok(pid) => Some(pid),
            Err(err) => {
                warn!("background service {} not started: {}", task.name, err);
                None
            }
        })
        .collect()
}
