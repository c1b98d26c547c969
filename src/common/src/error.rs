//! System-wide error types for Loom OS.

use core::fmt;

use crate::process::{Pid, TerminalId};

/// Scheduler and process-table error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchedError {
    /// The pid lies outside the process table.
    InvalidPid(usize),
    /// The pid addresses a slot that holds no live process.
    ProcessAbsent(Pid),
    /// Every slot of the process table is occupied.
    TableFull,
    /// The operation needs a running process but none has been started.
    NotRunning,
    /// The terminal has no process bound to it.
    NoOwner(TerminalId),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidPid(raw) => write!(f, "pid {} is out of range", raw),
            SchedError::ProcessAbsent(pid) => write!(f, "no live process with {}", pid),
            SchedError::TableFull => write!(f, "process table is full"),
            SchedError::NotRunning => write!(f, "no process is running"),
            SchedError::NoOwner(terminal) => write!(f, "{} has no process", terminal),
        }
    }
}
