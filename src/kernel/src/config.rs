//! Compile-time kernel configuration.
//!
//! The kernel is sized statically: every table below is a fixed array
//! allocated at boot, so changing a value here means recompiling.

use log::LevelFilter;

/// Maximum number of processes alive at once. Each owns one PCB slot, one
/// privileged stack and one physical user region.
pub const MAX_PROCESSES: usize = 6;

/// Number of virtual terminals, one top-level shell each.
pub const NUM_TERMINALS: usize = 3;

/// Capacity of the keyboard line buffer. One slot is always reserved for
/// the terminating newline, so a line stores at most `LINE_BUFFER_SIZE - 1`
/// typed characters.
pub const LINE_BUFFER_SIZE: usize = 128;

/// Byte the line buffer is padded with.
pub const LINE_PAD: u8 = b'\n';

/// IRQ line of the PS/2 keyboard.
pub const KEYBOARD_IRQ: u8 = 1;

/// IRQ line of the preemption timer.
pub const TIMER_IRQ: u8 = 0;

/// Physical region index backing the user window of pid 0. Pid `p` uses
/// region `USER_REGION_BASE + p`.
pub const USER_REGION_BASE: usize = 2;

/// Program started on a terminal that has no process.
pub const SHELL_PROGRAM: &str = "shell";

/// Size of each process's privileged (kernel-mode) stack.
pub const PRIVILEGED_STACK_SIZE: usize = 16 * 1024;

/// Maximum level forwarded to the serial logger.
#[cfg(feature = "trace-switches")]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Trace;

/// Maximum level forwarded to the serial logger.
#[cfg(not(feature = "trace-switches"))]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Physical region index for `pid`'s user memory.
pub const fn user_region(pid: loom_common::Pid) -> usize {
    USER_REGION_BASE + pid.index()
}
