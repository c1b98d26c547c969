//! The raw frame exchange.
//!
//! A suspended context is a kernel stack whose top holds the callee-saved
//! registers followed by a return address. Its anchor is the stack pointer
//! after those registers were pushed. [`swap_frames`] is the only code in
//! the kernel that touches `rsp` directly.

/// Callee-saved registers pushed by [`swap_frames`].
const SAVED_REGISTERS: usize = 6;

/// Suspends the calling context and resumes the one anchored at `next`.
///
/// Pushes `rbx`, `rbp` and `r12`-`r15`, stores the resulting stack pointer
/// into `*save`, loads `next` as the stack pointer and pops the same
/// registers back before returning into the resumed context.
///
/// # Safety
///
/// Interrupts must be disabled. `save` must stay valid until the suspended
/// context is resumed, and `next` must be an anchor written by this
/// function or built by [`initial_frame`].
#[unsafe(naked)]
pub unsafe extern "C" fn swap_frames(_save: *mut usize, _next: usize) {
    core::arch::naked_asm!(
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",
        "ret",
    );
}

/// Lays out a suspended context on the empty stack ending at `stack_top`
/// that starts executing `entry` when resumed, and returns its anchor.
///
/// # Safety
///
/// `stack_top` must be the 16-byte aligned end of a writable stack that
/// nothing else uses.
pub unsafe fn initial_frame(stack_top: u64, entry: extern "C" fn() -> !) -> usize {
    let top = stack_top as *mut usize;
    // SAFETY: the caller hands over the stack; every write stays within
    // its last `SAVED_REGISTERS + 2` words.
    unsafe {
        // Fake return address for `entry`, which never returns. Leaves rsp
        // at 8 mod 16 on entry as the ABI expects after a call.
        let ret_slot = top.sub(1);
        ret_slot.write(0);
        let entry_slot = ret_slot.sub(1);
        entry_slot.write(entry as usize);
        let anchor = entry_slot.sub(SAVED_REGISTERS);
        for i in 0..SAVED_REGISTERS {
            anchor.add(i).write(0);
        }
        anchor as usize
    }
}
