//! Kernel error type.

use thiserror::Error;

use super::identity::Pid;

/// Every failure the kernel reports. None of them is fatal to the host process; each leaves
/// the ledger and the process containers consistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Requested RAM or disk exceeds what is currently available. Nothing was reserved.
    #[error(
        "admission failed: requested {requested_ram} MB RAM / {requested_disk} MB disk, \
         available {available_ram} MB RAM / {available_disk} MB disk"
    )]
    AdmissionFailed {
        requested_ram: u64,
        requested_disk: u64,
        available_ram: u64,
        available_disk: u64,
    },
    /// The pid is not in the container the operation searches.
    #[error("process {0} not found")]
    NotFound(Pid),
    /// The launcher refused or failed to start the process.
    #[error("launch of process {pid} failed: {reason}")]
    LaunchFailed { pid: Pid, reason: String },
    /// The dispatcher has been shut down and accepts no new work.
    #[error("dispatcher is shut down")]
    ShutDown,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The scheduler thread could not be spawned.
    #[error("scheduler: {0}")]
    Scheduler(String),
    /// I/O or environment failure inside a launcher implementation.
    #[error("launcher: {0}")]
    Launcher(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_failed_message_names_both_sides() {
        let err = KernelError::AdmissionFailed {
            requested_ram: 50,
            requested_disk: 10,
            available_ram: 40,
            available_disk: 90,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 50 MB RAM"));
        assert!(msg.contains("available 40 MB RAM"));
    }

    #[test]
    fn not_found_includes_pid() {
        assert_eq!(
            KernelError::NotFound(Pid::from_raw(9)).to_string(),
            "process 9 not found"
        );
    }
}
