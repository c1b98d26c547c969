//! x86_64 architecture support.
//!
//! Binds the HAL traits to the hardware: VGA text output, COM1, the 8259
//! PICs, GDT/TSS, the IDT, the user window page tables and the raw frame
//! exchange. [`loader`] is the in-kernel program loader and teardown path.

pub mod context;
pub mod gdt;
pub mod interrupts;
pub mod loader;
pub mod machine;
pub mod paging;
pub mod pic;
pub mod serial;
pub mod vga;

pub use machine::X86Machine;
pub use serial::SERIAL;
pub use vga::{Color, Writer, WRITER};

/// Halts the CPU until the next interrupt.
///
/// Used in idle loops to reduce power consumption.
#[inline]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Halts the CPU in an infinite loop.
///
/// Used after unrecoverable errors (panics).
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}
