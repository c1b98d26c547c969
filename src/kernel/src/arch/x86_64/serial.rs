//! Serial port driver for x86_64.
//!
//! COM1 (0x3F8) carries the kernel log and the QEMU test output.

use core::fmt::{self, Write};
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::interrupts::without_interrupts;

/// COM1 I/O port address.
const COM1_PORT: u16 = 0x3F8;

/// Global serial port instance, lazily initialized.
///
/// Uses a spinlock for safe concurrent access from multiple contexts,
/// including interrupt handlers.
pub static SERIAL: spin::Once<Mutex<SerialPort>> = spin::Once::new();

/// Initializes the global serial port.
///
/// This function is idempotent - calling it multiple times has no effect
/// after the first successful initialization.
pub fn init() {
    get_serial();
}

/// Returns a reference to the serial port, initializing if necessary.
fn get_serial() -> &'static Mutex<SerialPort> {
    SERIAL.call_once(|| {
        // SAFETY: COM1 is the standard first serial port and the kernel runs
        // with full I/O port access.
        let mut serial = unsafe { SerialPort::new(COM1_PORT) };
        serial.init();
        Mutex::new(serial)
    })
}

/// Prints to the serial port without a newline.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::serial::_print(format_args!($($arg)*))
    };
}

/// Prints to the serial port with a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)))
}

/// Internal print function used by macros.
///
/// Log records are written from interrupt handlers too, so the port is only
/// locked with interrupts disabled.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    without_interrupts(|| {
        // A full UART blocks rather than failing.
        let _ = get_serial().lock().write_fmt(args);
    });
}
