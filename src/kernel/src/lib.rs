//! Loom OS Kernel
//!
//! The multitasking core of a small teaching kernel: a preemptive scheduler
//! that runs one shell per virtual terminal, and the interrupt-driven
//! keyboard line discipline feeding the foreground terminal.
//!
//! # Architecture
//!
//! The kernel is structured into the following modules:
//! - `sched`: process table, terminal bindings and the context switch
//! - `keyboard`: scan-code decoding and line editing
//! - `terminal`: completed-line delivery to blocked readers
//! - `arch`: the x86_64 binding of the HAL traits (GDT/TSS, IDT, paging,
//!   VGA, serial, the raw frame exchange)
//!
//! The scheduler and the keyboard are written against `loom_hal` only and
//! are unit tested on the host through a recording mock.
//!
//! # Safety
//!
//! This is a `#![no_std]` kernel. All unsafe code is documented with safety
//! invariants explaining why the usage is correct.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "x86_64", feature(abi_x86_interrupt))]
#![warn(missing_docs)]

pub mod arch;
pub mod config;
pub mod keyboard;
pub mod logger;
pub mod process;
pub mod sched;
pub mod terminal;

#[cfg(target_arch = "x86_64")]
pub mod boot;
#[cfg(target_arch = "x86_64")]
pub mod memory;
pub mod testutil;

/// Initializes core kernel subsystems.
///
/// Called early in the boot process, before memory is set up, to bring up
/// the output devices, logging, the descriptor tables and the scheduler.
pub fn init() {
    #[cfg(target_arch = "x86_64")]
    {
        arch::x86_64::serial::init();
        arch::x86_64::vga::init();
        logger::init();
        arch::x86_64::gdt::init();
        arch::x86_64::interrupts::init_idt();
        sched::init(arch::x86_64::gdt::privileged_stack_for);
    }
}
