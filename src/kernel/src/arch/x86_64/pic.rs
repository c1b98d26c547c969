//! The chained 8259 Programmable Interrupt Controllers.

use crate::config::{KEYBOARD_IRQ, TIMER_IRQ};
use pic8259::ChainedPics;
use spin::Mutex;

/// Vector of IRQ 0; IRQs 0..7 land on 32..39.
pub const PIC_1_OFFSET: u8 = 32;

/// Vector of IRQ 8; IRQs 8..15 land on 40..47.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// The global instance of the chained PICs.
pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Vectors of the hardware interrupts the kernel handles.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum InterruptIndex {
    /// Preemption tick.
    Timer = PIC_1_OFFSET + TIMER_IRQ,
    /// PS/2 keyboard.
    Keyboard = PIC_1_OFFSET + KEYBOARD_IRQ,
}

impl InterruptIndex {
    /// The vector number.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The vector number as an IDT index.
    pub fn as_usize(self) -> usize {
        usize::from(self as u8)
    }
}
