//! Loom OS Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines traits that abstract away platform-specific hardware
//! details and the kernel's out-of-core collaborators (loader, teardown,
//! blocking terminal reader). The scheduler and the keyboard line discipline
//! are written against these traits only, so they can be driven by a mock on
//! the host as well as by the x86_64 binding.

#![no_std]

use loom_common::{ExitStatus, PrivilegedStack, TerminalId};

/// Source of raw keyboard scan codes.
pub trait ScancodePort {
    /// Reads the pending scan code from the keyboard data port.
    fn read_scancode(&mut self) -> u8;
}

/// Trait for a text-based console output.
pub trait Console {
    /// Writes a single byte, interpreting `\n` and backspace (0x08).
    fn write_byte(&mut self, byte: u8);
    /// Writes a string to the console.
    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }
    /// Clears the console screen.
    fn clear(&mut self);
}

/// Trait for controlling interrupts.
pub trait InterruptController {
    /// Globally enables interrupts.
    fn enable(&mut self);
    /// Globally disables interrupts.
    fn disable(&mut self);
    /// Signals the end of an interrupt to the controller.
    fn end_of_interrupt(&mut self, irq: u8);
}

/// Receiver of completed input lines.
pub trait LineSink {
    /// Called once per completed line with the full line buffer.
    fn line_ready(&mut self, line: &[u8]);
}

/// The program loader and the process teardown path.
pub trait ProcessControl {
    /// Loads and starts the named program as the root process of
    /// `terminal`.
    ///
    /// On real hardware control passes into the new process and this does
    /// not return while it runs.
    fn launch(&mut self, program: &'static str, terminal: TerminalId);
    /// Tears down the process owning the foreground terminal with
    /// `status`. That need not be the process on the CPU.
    fn terminate_foreground(&mut self, status: ExitStatus);
}

/// The single user-space virtual window shared by all processes.
pub trait UserAddressSpace {
    /// Points the user window at physical region `region` and flushes any
    /// cached translations so the mapping is live on return.
    fn map_user_region(&mut self, region: usize);
}

/// The CPU's "current privileged stack" register pair.
pub trait TrapStack {
    /// The stack the next trap into kernel mode will use.
    fn current(&self) -> PrivilegedStack;
    /// Sets the stack the next trap into kernel mode will use.
    fn set_current(&mut self, stack: PrivilegedStack);
}

/// Raw execution-context exchange.
pub trait FrameSwitch {
    /// Stores the running context's frame anchor into `*save` and resumes the
    /// context suspended at anchor `next`.
    ///
    /// # Safety
    ///
    /// `save` must be valid for writes and must stay untouched until the
    /// suspended context is resumed. `next` must be an anchor previously
    /// written by this method (or a correctly constructed initial frame).
    /// Interrupts must be disabled.
    unsafe fn switch_frames(&mut self, save: *mut usize, next: usize);
}
