//! procsim kernel.
//!
//! Leaves first: [identity] (pids), [error] (the single error type), [process] (lifecycle
//! record and state machine), [ledger] (RAM/disk/core accounting). The [runtime] module
//! composes them into the [Dispatcher] and its scheduler loop; [stubs] holds launchers
//! with fixed outcomes.

pub mod error;
pub mod identity;
pub mod ledger;
pub mod process;
pub mod runtime;
pub mod stubs;

pub use error::KernelError;
pub use identity::{Pid, PidAllocator};
pub use ledger::{LedgerCounters, ResourceLedger};
pub use process::{ProcessRecord, ProcessState};
pub use runtime::{
    CommandLauncher, Dispatcher, DrainReport, LaunchRequest, Launcher, ProcessSummary,
    ResourceSnapshot, SchedulerConfig, SchedulerHandle, ShutdownReport, SystemMode,
    SystemSnapshot,
};
pub use stubs::{AlwaysLaunch, NeverLaunch, RecordingLauncher};
