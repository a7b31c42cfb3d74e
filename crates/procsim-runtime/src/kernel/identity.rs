//! Process identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process identifier: positive, monotonic, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(u64);

impl Pid {
    pub fn from_raw(raw: u64) -> Self {
        Pid(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Pid {
    fn from(raw: u64) -> Self {
        Pid(raw)
    }
}

/// Hands out pids starting at 1.
///
/// Not synchronized on its own; the dispatcher keeps it inside the process table lock so that
/// allocation and ready-queue append are observed in the same order.
#[derive(Debug)]
pub struct PidAllocator {
    next: u64,
}

impl PidAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> Pid {
        let pid = Pid(self.next);
        self.next += 1;
        pid
    }

    /// The pid the next call to [allocate](Self::allocate) will return.
    pub fn peek(&self) -> Pid {
        Pid(self.next)
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_starts_at_one_and_increases() {
        let mut alloc = PidAllocator::new();
        assert_eq!(alloc.peek(), Pid::from_raw(1));
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a.as_raw(), 1);
        assert_eq!(b.as_raw(), 2);
        assert!(b > a);
        assert_eq!(alloc.peek().as_raw(), 3);
    }

    #[test]
    fn pid_serializes_as_bare_integer() {
        let json = serde_json::to_string(&Pid::from_raw(7)).unwrap();
        assert_eq!(json, "7");
        assert_eq!(Pid::from_raw(7).to_string(), "7");
    }
}
