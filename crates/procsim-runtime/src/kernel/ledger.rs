//! Resource ledger: total vs. available RAM, disk and cores.
//!
//! Admit and release each run inside one critical section, so no caller observes a
//! partially applied update. Cores are tracked for reporting but never consumed by admission.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::error::KernelError;

/// Point-in-time copy of the ledger counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerCounters {
    pub total_ram: u64,
    pub total_disk: u64,
    pub total_cores: u32,
    pub available_ram: u64,
    pub available_disk: u64,
    pub available_cores: u32,
}

#[derive(Debug)]
pub struct ResourceLedger {
    counters: Mutex<LedgerCounters>,
}

impl ResourceLedger {
    pub fn new(total_ram: u64, total_disk: u64, total_cores: u32) -> Self {
        Self {
            counters: Mutex::new(LedgerCounters {
                total_ram,
                total_disk,
                total_cores,
                available_ram: total_ram,
                available_disk: total_disk,
                available_cores: total_cores,
            }),
        }
    }

    // Every critical section leaves the counters consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LedgerCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `ram` and `disk` iff both fit. No side effect on failure.
    pub fn admit(&self, ram: u64, disk: u64) -> bool {
        self.try_admit(ram, disk).is_ok()
    }

    /// Like [admit](Self::admit) but reports what was available on failure.
    pub fn try_admit(&self, ram: u64, disk: u64) -> Result<(), KernelError> {
        let mut c = self.lock();
        if ram > c.available_ram || disk > c.available_disk {
            return Err(KernelError::AdmissionFailed {
                requested_ram: ram,
                requested_disk: disk,
                available_ram: c.available_ram,
                available_disk: c.available_disk,
            });
        }
        c.available_ram -= ram;
        c.available_disk -= disk;
        Ok(())
    }

    /// Return `ram` and `disk`, clamped so available never exceeds total.
    pub fn release(&self, ram: u64, disk: u64) {
        let mut c = self.lock();
        c.available_ram = c.available_ram.saturating_add(ram).min(c.total_ram);
        c.available_disk = c.available_disk.saturating_add(disk).min(c.total_disk);
    }

    pub fn counters(&self) -> LedgerCounters {
        *self.lock()
    }

    pub fn available_ram(&self) -> u64 {
        self.lock().available_ram
    }

    pub fn available_disk(&self) -> u64 {
        self.lock().available_disk
    }

    pub fn available_cores(&self) -> u32 {
        self.lock().available_cores
    }
}
