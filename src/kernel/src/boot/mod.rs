//! Boot progress reporting.
//!
//! Each stage prints a colored `[ OK ]` or `[FAIL]` line on the console
//! and the same message to the kernel log, so a headless QEMU run shows how
//! far boot got.

pub mod banner;

use crate::arch::x86_64::vga::{self, Color};
use core::fmt;
use log::{error, info};

/// Outcome of a boot stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `[ OK ]` in green.
    Ok,
    /// `[FAIL]` in red.
    Fail,
}

/// Reports a finished boot stage.
pub fn stage(message: &str) {
    report(Status::Ok, message);
    info!("boot: {}", message);
}

/// Reports a stage whose outcome is `result`. A failed stage cannot be
/// recovered from, so the error ends boot.
pub fn require<T, E: fmt::Debug>(message: &str, result: Result<T, E>) -> T {
    match result {
        Ok(value) => {
            stage(message);
            value
        }
        Err(e) => {
            report(Status::Fail, message);
            error!("boot: {} failed: {:?}", message, e);
            panic!("boot stage failed: {}", message);
        }
    }
}

/// Prints an indented line under the previous stage.
pub fn detail(args: fmt::Arguments) {
    crate::println!("       {}", args);
}

fn report(status: Status, message: &str) {
    let (text, color) = match status {
        Status::Ok => ("[ OK ]", Color::LightGreen),
        Status::Fail => ("[FAIL]", Color::LightRed),
    };
    vga::set_color(color, Color::Black);
    crate::print!("{}", text);
    vga::set_color(Color::White, Color::Black);
    crate::println!(" {}", message);
}
