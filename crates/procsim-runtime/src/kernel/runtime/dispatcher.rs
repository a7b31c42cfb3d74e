//! Dispatcher: admission, dispatch, state transitions, teardown.
//!
//! ## Locking
//!
//! Two independent critical sections: the [ResourceLedger] counters and the
//! [ProcessTable] (ready queue, running set, blocked set, pid counter, mode, flags).
//! The only nesting allowed is table → ledger (terminate and shutdown release while holding
//! the table). Admission takes the ledger, drops it, then takes the table. A release and
//! the matching container update are therefore not observed atomically by a third party;
//! each structure is consistent on its own.
//!
//! Launches run with no lock held. A record being launched is in none of the containers,
//! so it is not terminable by pid until it lands in the running set.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, info, warn};

use crate::kernel::error::KernelError;
use crate::kernel::identity::{Pid, PidAllocator};
use crate::kernel::ledger::ResourceLedger;
use crate::kernel::process::{ProcessRecord, ProcessState};

use super::launcher::{LaunchRequest, Launcher};
use super::models::{ProcessSummary, ResourceSnapshot, ShutdownReport, SystemMode, SystemSnapshot};
use super::scheduler::{DrainReport, SchedulerConfig, SchedulerHandle};

/// The containers and everything that must change together with them.
#[derive(Debug, Default)]
pub(crate) struct ProcessTable {
    pub(crate) ready: VecDeque<ProcessRecord>,
    pub(crate) running: Vec<ProcessRecord>,
    pub(crate) blocked: Vec<ProcessRecord>,
    pub(crate) pids: PidAllocator,
    pub(crate) mode: SystemMode,
    pub(crate) scheduler_started: bool,
    pub(crate) stopping: bool,
}

fn take_by_pid(records: &mut Vec<ProcessRecord>, pid: Pid) -> Option<ProcessRecord> {
    let idx = records.iter().position(|r| r.pid() == pid)?;
    Some(records.remove(idx))
}

/// State shared between client handles and the scheduler thread.
pub(crate) struct Shared {
    pub(crate) ledger: ResourceLedger,
    pub(crate) table: Mutex<ProcessTable>,
    pub(crate) wake: Condvar,
    pub(crate) launcher: Box<dyn Launcher>,
    pub(crate) config: SchedulerConfig,
}

impl Shared {
    // Container mutations are never left half-done inside the lock, so recover from poisoning.
    pub(crate) fn lock_table(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_for(&self, record: &ProcessRecord) {
        self.ledger
            .release(record.memory_required(), record.disk_required());
    }

    /// Attempt a launch for every record in `batch`, in order.
    pub(crate) fn dispatch_batch(&self, batch: VecDeque<ProcessRecord>) -> DrainReport {
        let mut report = DrainReport::default();
        for mut record in batch {
            if record.state() != ProcessState::Ready {
                warn!(
                    "process {} left the ready queue in state {}, discarding",
                    record.pid(),
                    record.state().as_str()
                );
                self.release_for(&record);
                report.failed += 1;
                continue;
            }

            let request = LaunchRequest::from_record(&record);
            match self.launcher.launch(&request) {
                Ok(()) => {
                    record.run();
                    let mut table = self.lock_table();
                    if table.stopping {
                        self.release_for(&record);
                        record.terminate();
                        drop(table);
                        info!(
                            "process {} ({}) launched during shutdown, terminated",
                            request.pid, request.name
                        );
                        report.terminated_on_shutdown += 1;
                    } else {
                        table.running.push(record);
                        drop(table);
                        info!("process {} ({}) running", request.pid, request.name);
                        report.launched += 1;
                    }
                }
                Err(err) => {
                    self.release_for(&record);
                    warn!(
                        "process {} ({}) discarded: {}",
                        request.pid, request.name, err
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Handle to one simulated machine. Cheap to clone; every clone addresses the same
/// ledger, containers and scheduler thread.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
    scheduler: Arc<Mutex<Option<SchedulerHandle>>>,
}

impl Dispatcher {
    pub fn new(
        ledger: ResourceLedger,
        config: SchedulerConfig,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                ledger,
                table: Mutex::new(ProcessTable::default()),
                wake: Condvar::new(),
                launcher,
                config,
            }),
            scheduler: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the scheduler thread. Starting an already started dispatcher is a no-op.
    pub fn start(&self) -> Result<(), KernelError> {
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut table = self.shared.lock_table();
            if table.stopping {
                return Err(KernelError::ShutDown);
            }
            if table.scheduler_started {
                return Ok(());
            }
            table.scheduler_started = true;
        }
        match SchedulerHandle::spawn(Arc::clone(&self.shared)) {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.lock_table().scheduler_started = false;
                Err(err)
            }
        }
    }

    /// True while the scheduler thread is started and shutdown has not been requested.
    pub fn is_running(&self) -> bool {
        let table = self.shared.lock_table();
        table.scheduler_started && !table.stopping
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.shared.ledger
    }

    /// Admit `ram`/`disk`, then enqueue a Ready record and wake the scheduler.
    ///
    /// Pid allocation and the queue append happen under the same lock, so pids appear in
    /// the ready queue in increasing order.
    pub fn create_process(&self, name: &str, ram: u64, disk: u64) -> Result<Pid, KernelError> {
        if let Err(err) = self.shared.ledger.try_admit(ram, disk) {
            warn!("process {:?} rejected: {}", name, err);
            return Err(err);
        }

        let mut table = self.shared.lock_table();
        if table.stopping {
            drop(table);
            self.shared.ledger.release(ram, disk);
            return Err(KernelError::ShutDown);
        }
        let pid = table.pids.allocate();
        let mut record = ProcessRecord::new(pid, name, ram, disk);
        record.ready();
        table.ready.push_back(record);
        drop(table);

        self.shared.wake.notify_one();
        info!(
            "process {} ({}) admitted: {} MB RAM, {} MB disk",
            pid, name, ram, disk
        );
        Ok(pid)
    }

    /// Terminate a running or blocked process and release its resources.
    ///
    /// Records still waiting in the ready queue are not found.
    pub fn terminate_process(&self, pid: Pid) -> Result<(), KernelError> {
        let mut table = self.shared.lock_table();
        let mut record = take_by_pid(&mut table.running, pid)
            .or_else(|| take_by_pid(&mut table.blocked, pid))
            .ok_or(KernelError::NotFound(pid))?;
        self.shared.release_for(&record);
        record.terminate();
        drop(table);

        info!(
            "process {} ({}) terminated after {}s",
            pid,
            record.name(),
            record.elapsed().as_secs()
        );
        Ok(())
    }

    /// Running → Blocked.
    pub fn minimize_process(&self, pid: Pid) -> Result<(), KernelError> {
        let mut table = self.shared.lock_table();
        let mut record = take_by_pid(&mut table.running, pid).ok_or(KernelError::NotFound(pid))?;
        record.block();
        table.blocked.push(record);
        drop(table);

        debug!("process {} minimized", pid);
        Ok(())
    }

    /// Blocked → Ready, appended to the ready queue; wakes the scheduler.
    pub fn resume_process(&self, pid: Pid) -> Result<(), KernelError> {
        let mut table = self.shared.lock_table();
        let mut record = take_by_pid(&mut table.blocked, pid).ok_or(KernelError::NotFound(pid))?;
        record.ready();
        table.ready.push_back(record);
        drop(table);

        self.shared.wake.notify_one();
        debug!("process {} resumed", pid);
        Ok(())
    }

    /// Run one drain pass on the calling thread: take the whole ready queue and attempt a
    /// launch for each record. The scheduler loop does the same on every wake.
    pub fn dispatch_pending(&self) -> DrainReport {
        let batch = std::mem::take(&mut self.shared.lock_table().ready);
        self.shared.dispatch_batch(batch)
    }

    /// Stop the scheduler and tear down.
    ///
    /// Running records are terminated and their resources released. Blocked and ready
    /// records are dropped *without* releasing their resources. Calling it again is a no-op
    /// that returns an empty report.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        {
            let mut table = self.shared.lock_table();
            if table.stopping {
                return report;
            }
            table.stopping = true;

            for mut record in std::mem::take(&mut table.running) {
                self.shared.release_for(&record);
                record.terminate();
                report.terminated.push(ProcessSummary::from_record(&record));
            }
            report.discarded_blocked = std::mem::take(&mut table.blocked)
                .iter()
                .map(ProcessRecord::pid)
                .collect();
            report.discarded_ready = std::mem::take(&mut table.ready)
                .iter()
                .map(ProcessRecord::pid)
                .collect();
        }
        self.shared.wake.notify_all();

        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.join();
        }

        info!(
            "shutdown: {} terminated, {} blocked and {} ready discarded",
            report.terminated.len(),
            report.discarded_blocked.len(),
            report.discarded_ready.len()
        );
        report
    }

    pub fn mode(&self) -> SystemMode {
        self.shared.lock_table().mode
    }

    pub fn switch_to_user_mode(&self) {
        self.set_mode(SystemMode::User);
    }

    pub fn switch_to_kernel_mode(&self) {
        self.set_mode(SystemMode::Kernel);
    }

    /// Flip the mode and return the new one.
    pub fn toggle_mode(&self) -> SystemMode {
        let mut table = self.shared.lock_table();
        table.mode = table.mode.toggled();
        let mode = table.mode;
        drop(table);
        info!("system now in {} MODE", mode);
        mode
    }

    fn set_mode(&self, mode: SystemMode) {
        self.shared.lock_table().mode = mode;
        info!("system now in {} MODE", mode);
    }

    /// Pids currently waiting in the ready queue, in dispatch order.
    pub fn ready_queue(&self) -> Vec<Pid> {
        self.shared
            .lock_table()
            .ready
            .iter()
            .map(ProcessRecord::pid)
            .collect()
    }

    pub fn resource_snapshot(&self) -> ResourceSnapshot {
        let running = self.shared.lock_table().running.len();
        ResourceSnapshot::new(self.shared.ledger.counters(), running)
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let table = self.shared.lock_table();
        let running: Vec<_> = table.running.iter().map(ProcessSummary::from_record).collect();
        let blocked: Vec<_> = table.blocked.iter().map(ProcessSummary::from_record).collect();
        let resources = ResourceSnapshot::new(self.shared.ledger.counters(), running.len());
        SystemSnapshot {
            taken_at: Utc::now(),
            mode: table.mode,
            scheduler_running: table.scheduler_started && !table.stopping,
            resources,
            ready_count: table.ready.len(),
            running,
            blocked,
        }
    }

    #[cfg(test)]
    fn membership_count(&self, pid: Pid) -> usize {
        let table = self.shared.lock_table();
        table.ready.iter().filter(|r| r.pid() == pid).count()
            + table.running.iter().filter(|r| r.pid() == pid).count()
            + table.blocked.iter().filter(|r| r.pid() == pid).count()
    }
}
