//! The x86_64 binding of the HAL traits, used by the interrupt vectors.
//!
//! An interrupt vector builds an [`X86Machine`], hands it to the scheduler
//! or the keyboard while holding their lock, drops the lock and calls
//! [`X86Machine::finish`]. Re-enabling interrupts and the two divergent
//! process operations are recorded during the critical section and only
//! carried out by `finish`, so nothing can preempt a context that still
//! holds a lock.

use super::pic::PICS;
use super::{context, gdt, paging, vga};
use crate::process::PendingAction;
use crate::sched::SCHEDULER;
use crate::terminal::LINES;
use log::{debug, warn};
use loom_common::{ExitStatus, PrivilegedStack, TerminalId};
use loom_hal::{
    Console, FrameSwitch, InterruptController, LineSink, ProcessControl, ScancodePort, TrapStack,
    UserAddressSpace,
};
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

/// PS/2 controller data port.
const KEYBOARD_DATA_PORT: u16 = 0x60;

/// Hardware and collaborator access for one interrupt vector invocation.
#[derive(Debug, Default)]
pub struct X86Machine {
    reenable: bool,
    pending: Option<PendingAction>,
}

impl X86Machine {
    /// A machine with nothing deferred yet.
    pub const fn new() -> Self {
        Self {
            reenable: false,
            pending: None,
        }
    }

    /// Carries out what was deferred. Call only after every lock handed
    /// to the scheduler or the keyboard has been released.
    pub fn finish(self) {
        if self.reenable {
            interrupts::enable();
        }
        if let Some(action) = self.pending {
            action.run();
        }
    }
}

impl ScancodePort for X86Machine {
    fn read_scancode(&mut self) -> u8 {
        let mut port = Port::new(KEYBOARD_DATA_PORT);
        // SAFETY: reading the PS/2 data port has no side effect beyond
        // consuming the byte the interrupt announced.
        unsafe { port.read() }
    }
}

impl Console for X86Machine {
    fn write_byte(&mut self, byte: u8) {
        vga::write_byte(byte);
    }

    fn clear(&mut self) {
        vga::clear_screen();
    }
}

impl InterruptController for X86Machine {
    fn enable(&mut self) {
        self.reenable = true;
    }

    fn disable(&mut self) {
        interrupts::disable();
        self.reenable = false;
    }

    fn end_of_interrupt(&mut self, irq: u8) {
        // SAFETY: `irq` is the line whose handler is running.
        unsafe {
            PICS.lock().notify_end_of_interrupt(super::pic::PIC_1_OFFSET + irq);
        }
    }
}

impl LineSink for X86Machine {
    fn line_ready(&mut self, line: &[u8]) {
        let terminal = match SCHEDULER.get() {
            Some(sched) => sched.lock().terminals().foreground(),
            None => return,
        };
        let mut lines = LINES.lock();
        if lines.is_pending(terminal) {
            debug!("unread line on {} replaced", terminal);
        }
        lines.deliver(terminal, line);
    }
}

impl ProcessControl for X86Machine {
    fn launch(&mut self, program: &'static str, terminal: TerminalId) {
        self.pending = Some(PendingAction::Launch { program, terminal });
    }

    fn terminate_foreground(&mut self, status: ExitStatus) {
        self.pending = Some(PendingAction::Terminate(status));
    }
}

impl UserAddressSpace for X86Machine {
    fn map_user_region(&mut self, region: usize) {
        paging::map_region(region);
    }
}

impl TrapStack for X86Machine {
    fn current(&self) -> PrivilegedStack {
        gdt::current()
    }

    fn set_current(&mut self, stack: PrivilegedStack) {
        gdt::set_current(stack);
    }
}

impl FrameSwitch for X86Machine {
    unsafe fn switch_frames(&mut self, save: *mut usize, next: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { context::swap_frames(save, next) }
    }
}

/// Timer tick: moves the CPU on to the next terminal's process.
///
/// The caller has already acknowledged the tick.
pub fn preempt() {
    let Some(scheduler) = SCHEDULER.get() else {
        return;
    };
    let mut machine = X86Machine::new();
    {
        let mut sched = scheduler.lock();
        let target = sched.next_target();
        if let Err(e) = sched.switch_to(&mut machine, target) {
            warn!("tick could not switch to {:?}: {}", target, e);
        }
    }
    machine.finish();
}
