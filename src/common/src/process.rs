//! Process and terminal identities.

use core::fmt;

/// Index of a slot in the process table.
///
/// A pid is stable for the lifetime of the process and equals its table
/// index. Range checks against the table capacity happen in the kernel, which
/// owns the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid(u8);

impl Pid {
    /// Wrap a raw table index.
    pub const fn new(index: u8) -> Self {
        Pid(index)
    }

    /// The table index this pid addresses.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Index of a virtual terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminalId(u8);

impl TerminalId {
    /// Wrap a raw terminal index.
    pub const fn new(index: u8) -> Self {
        TerminalId(index)
    }

    /// The slot this id addresses.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tty{}", self.0)
    }
}

/// Status a process reports when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExitStatus(u32);

impl ExitStatus {
    /// Reserved for processes killed by the keyboard interrupt combination.
    pub const INTERRUPTED: ExitStatus = ExitStatus(128);

    /// Wrap a raw status value.
    pub const fn new(code: u32) -> Self {
        ExitStatus(code)
    }

    /// The raw status value.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Whether the process was forcibly terminated from the keyboard.
    pub const fn is_interrupted(self) -> bool {
        self.0 == Self::INTERRUPTED.0
    }
}

/// Stack the CPU switches to when a trap enters kernel mode.
///
/// Every process owns one; the one belonging to the running process is
/// mirrored into the CPU's "current privileged stack" register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrivilegedStack {
    /// Initial stack pointer loaded on the trap.
    pub top: u64,
    /// Stack segment selector loaded on the trap.
    pub segment: u16,
}

impl PrivilegedStack {
    /// A stack with the given top and segment.
    pub const fn new(top: u64, segment: u16) -> Self {
        Self { top, segment }
    }
}
