//! Dispatcher runtime: process containers, scheduler loop, launch contract, status views.

pub mod dispatcher;
pub mod launcher;
pub mod models;
pub mod scheduler;

pub use dispatcher::Dispatcher;
pub use launcher::{CommandLauncher, LaunchRequest, Launcher};
pub use models::{ProcessSummary, ResourceSnapshot, ShutdownReport, SystemMode, SystemSnapshot};
pub use scheduler::{DrainReport, SchedulerConfig, SchedulerHandle};
