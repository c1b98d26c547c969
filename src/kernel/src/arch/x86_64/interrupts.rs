//! Interrupt Descriptor Table (IDT) and the interrupt vectors.

use super::gdt;
use super::machine::{self, X86Machine};
use super::pic::{InterruptIndex, PICS};
use crate::keyboard::KEYBOARD;
use lazy_static::lazy_static;
use log::error;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

lazy_static! {
    /// The Interrupt Descriptor Table (IDT).
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        unsafe {
            idt.double_fault.set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
        idt.divide_error.set_handler_fn(divide_error_handler);

        idt[InterruptIndex::Timer.as_usize()]
            .set_handler_fn(timer_interrupt_handler);
        idt[InterruptIndex::Keyboard.as_usize()]
            .set_handler_fn(keyboard_interrupt_handler);

        idt
    };
}

/// Loads the IDT and remaps the PICs. Interrupts stay disabled until
/// [`enable`] is called.
pub fn init_idt() {
    IDT.load();
    // SAFETY: the PICs are remapped once, before any IRQ is unmasked.
    unsafe {
        PICS.lock().initialize();
    }
}

/// Starts taking hardware interrupts, and with them preemption.
pub fn enable() {
    x86_64::instructions::interrupts::enable();
}

/// Timer tick: acknowledge first, since the switch may not come back here
/// for a long time.
extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    // SAFETY: this is the timer vector.
    unsafe {
        PICS.lock()
            .notify_end_of_interrupt(InterruptIndex::Timer.as_u8());
    }
    machine::preempt();
}

/// Keyboard: one scan code per interrupt, acknowledged by the discipline.
extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    let mut machine = X86Machine::new();
    KEYBOARD.lock().handle_scan_code(&mut machine);
    machine.finish();
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    log::info!("EXCEPTION: BREAKPOINT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    panic!("EXCEPTION: DOUBLE FAULT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    error!(
        "EXCEPTION: PAGE FAULT at {:?} ({:?})\n{:#?}",
        Cr2::read(),
        error_code,
        stack_frame
    );
    super::halt_loop();
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    error!(
        "EXCEPTION: GENERAL PROTECTION FAULT ({:#x})\n{:#?}",
        error_code, stack_frame
    );
    super::halt_loop();
}

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    error!("EXCEPTION: DIVIDE ERROR\n{:#?}", stack_frame);
    super::halt_loop();
}
