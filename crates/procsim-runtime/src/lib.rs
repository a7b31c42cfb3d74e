//! procsim runtime: capacity-checked process admission and a background dispatch loop.
//!
//! The [kernel] module holds the coordination core (records, ledger, dispatcher, scheduler
//! loop). [config] supplies machine totals and [catalog] lists the built-in applications
//! that can be launched.

pub mod catalog;
pub mod config;
pub mod kernel;

pub use catalog::{boot_background_services, TaskSpec, BACKGROUND_SERVICES, BUILTIN_TASKS};
pub use config::SystemConfig;
pub use kernel::{
    CommandLauncher, Dispatcher, KernelError, LaunchRequest, Launcher, Pid, ProcessRecord,
    ProcessState, ResourceLedger, SchedulerConfig, ShutdownReport, SystemMode, SystemSnapshot,
};
