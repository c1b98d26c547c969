//! Completed-line delivery from the keyboard to blocked readers, and the
//! built-in shell.
//!
//! # Architecture
//!
//! - `LineQueue`: one pending line per terminal, filled from the keyboard
//!   interrupt with the foreground terminal's id
//! - `commands`: parsing of shell command lines
//! - `shell`: the program started on every vacant terminal

pub mod commands;
#[cfg(target_arch = "x86_64")]
pub mod shell;

pub use commands::Command;

use crate::config::{LINE_BUFFER_SIZE, LINE_PAD, NUM_TERMINALS};
use loom_common::TerminalId;
use spin::Mutex;

/// Lines waiting for their terminal's reader.
pub static LINES: Mutex<LineQueue> = Mutex::new(LineQueue::new());

/// The last completed line of each terminal that nobody has read yet.
pub struct LineQueue {
    pending: [Option<[u8; LINE_BUFFER_SIZE]>; NUM_TERMINALS],
}

impl Default for LineQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LineQueue {
    /// No lines pending.
    pub const fn new() -> Self {
        Self {
            pending: [None; NUM_TERMINALS],
        }
    }

    /// Stores `line` for `terminal`, replacing an unread one.
    pub fn deliver(&mut self, terminal: TerminalId, line: &[u8]) {
        let mut stored = [LINE_PAD; LINE_BUFFER_SIZE];
        let len = line.len().min(LINE_BUFFER_SIZE);
        stored[..len].copy_from_slice(&line[..len]);
        self.pending[terminal.index()] = Some(stored);
    }

    /// Drops whatever is pending for `terminal`.
    pub fn discard(&mut self, terminal: TerminalId) {
        self.pending[terminal.index()] = None;
    }

    /// Whether a line is waiting for `terminal`.
    pub fn is_pending(&self, terminal: TerminalId) -> bool {
        self.pending[terminal.index()].is_some()
    }

    /// Moves the pending line of `terminal` into `buf`.
    ///
    /// Copies up to and including the first newline, but never more than
    /// `buf.len()` bytes. Returns the number of bytes copied, or `None` if
    /// nothing is pending.
    pub fn take(&mut self, terminal: TerminalId, buf: &mut [u8]) -> Option<usize> {
        let line = self.pending[terminal.index()].take()?;
        let end = line
            .iter()
            .position(|&b| b == b'\n')
            .map_or(line.len(), |i| i + 1);
        let len = end.min(buf.len());
        buf[..len].copy_from_slice(&line[..len]);
        Some(len)
    }
}

/// Blocks until the keyboard completes a line on `terminal` and copies it
/// into `buf`, as [`LineQueue::take`] does.
///
/// Starts from an empty keyboard line. Halts between interrupts while
/// waiting.
#[cfg(target_arch = "x86_64")]
pub fn read_line(terminal: TerminalId, buf: &mut [u8]) -> usize {
    use x86_64::instructions::interrupts;

    crate::keyboard::reset_buffer();
    interrupts::without_interrupts(|| LINES.lock().discard(terminal));
    loop {
        interrupts::disable();
        if let Some(len) = LINES.lock().take(terminal, buf) {
            interrupts::enable();
            return len;
        }
        // Atomic with the check above, so a line arriving in between
        // still wakes us.
        interrupts::enable_and_hlt();
    }
}
