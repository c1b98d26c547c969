//! Test support.
//!
//! Host unit tests drive the scheduler and the keyboard through
//! [`mock::MockHardware`]. The QEMU test binaries under `tests/` use the
//! runner below, which reports over serial and leaves QEMU through the
//! isa-debug-exit device.

#[cfg(test)]
pub mod mock;

#[cfg(target_arch = "x86_64")]
use crate::serial_println;

/// isa-debug-exit I/O port (`-device isa-debug-exit,iobase=0xf4,iosize=0x04`).
const DEBUG_EXIT_PORT: u16 = 0xf4;

/// Values written to the debug-exit port. QEMU exits with `(value << 1) | 1`,
/// so 33 for success and 35 for failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    /// Every case passed.
    Success = 0x10,
    /// A case panicked.
    Failed = 0x11,
}

/// Ends the QEMU run with `code`. Does nothing off x86_64.
pub fn exit_qemu(code: QemuExitCode) {
    #[cfg(target_arch = "x86_64")]
    {
        use x86_64::instructions::port::Port;

        // SAFETY: the port belongs to QEMU's debug-exit device; writing it
        // only ends the emulator.
        unsafe { Port::new(DEBUG_EXIT_PORT).write(code as u32) };
    }
}

/// A case the QEMU runner can execute.
#[cfg(target_arch = "x86_64")]
pub trait Testable {
    /// Runs the case, naming it on serial.
    fn run(&self);
}

#[cfg(target_arch = "x86_64")]
impl<T: Fn()> Testable for T {
    fn run(&self) {
        serial_println!("test {} ... ", core::any::type_name::<T>());
        self();
        serial_println!("[ok]");
    }
}

/// Runner for `#![test_runner(loom_kernel::testutil::test_runner)]`.
#[cfg(target_arch = "x86_64")]
pub fn test_runner(tests: &[&dyn Testable]) {
    serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

/// Panic handler body for test binaries: reports the failure and exits.
#[cfg(target_arch = "x86_64")]
pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    serial_println!("[failed]");
    serial_println!("Error: {}", info);
    exit_qemu(QemuExitCode::Failed);
    crate::arch::x86_64::halt_loop()
}
