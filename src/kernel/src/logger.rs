//! Serial backend for the `log` facade.
//!
//! Records go to COM1 as `[LEVEL target] message`. The VGA console is left
//! to the shells and the boot status lines.

use crate::config::LOG_LEVEL;
use log::{Log, Metadata, Record};

/// Writes every enabled record to the serial port.
struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(target_arch = "x86_64")]
        crate::serial_println!("[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Installs the serial logger as the system-wide logger.
///
/// Later calls are ignored, so tests and the boot path may both call it.
pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LOG_LEVEL);
    }
}
