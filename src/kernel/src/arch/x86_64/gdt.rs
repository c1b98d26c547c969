//! Global Descriptor Table, Task State Segment and the privileged stacks.
//!
//! Slot 0 of the TSS privilege stack table is the CPU's "current privileged
//! stack": the stack loaded on the next trap into ring 0. The scheduler
//! swaps it on every context switch through [`current`] and [`set_current`].

use crate::config::{MAX_PROCESSES, PRIVILEGED_STACK_SIZE};
use core::ptr::{addr_of, addr_of_mut};
use core::sync::atomic::{AtomicU16, Ordering};
use lazy_static::lazy_static;
use loom_common::{Pid, PrivilegedStack};
use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};
use x86_64::instructions::tables::load_tss;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// IST slot used by the double fault handler.
pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

const DOUBLE_FAULT_STACK_SIZE: usize = 4096 * 5;

#[repr(C, align(16))]
struct Stack<const N: usize>([u8; N]);

static mut DOUBLE_FAULT_STACK: Stack<DOUBLE_FAULT_STACK_SIZE> = Stack([0; DOUBLE_FAULT_STACK_SIZE]);

/// One privileged stack per pid; slot `p` belongs to whatever process holds
/// pid `p`.
static mut PRIVILEGED_STACKS: [Stack<PRIVILEGED_STACK_SIZE>; MAX_PROCESSES] =
    [const { Stack([0; PRIVILEGED_STACK_SIZE]) }; MAX_PROCESSES];

/// The single TSS. Only `privilege_stack_table[0]` changes after boot.
static mut TSS: TaskStateSegment = TaskStateSegment::new();

/// Segment half of the current privileged stack. Long mode ignores SS0, so
/// the value lives here instead of in the TSS.
static CURRENT_SEGMENT: AtomicU16 = AtomicU16::new(0);

struct Selectors {
    code_selector: SegmentSelector,
    data_selector: SegmentSelector,
    tss_selector: SegmentSelector,
}

lazy_static! {
    static ref GDT: (GlobalDescriptorTable, Selectors) = {
        // SAFETY: runs once, before `load_tss`, with nothing else touching
        // the TSS yet.
        let tss: &'static TaskStateSegment = unsafe {
            let tss = &mut *addr_of_mut!(TSS);
            let stack_start = VirtAddr::from_ptr(addr_of!(DOUBLE_FAULT_STACK));
            tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] =
                stack_start + DOUBLE_FAULT_STACK_SIZE;
            &*addr_of!(TSS)
        };

        let mut gdt = GlobalDescriptorTable::new();
        let code_selector = gdt.add_entry(Descriptor::kernel_code_segment());
        let data_selector = gdt.add_entry(Descriptor::kernel_data_segment());
        let tss_selector = gdt.add_entry(Descriptor::tss_segment(tss));
        (
            gdt,
            Selectors {
                code_selector,
                data_selector,
                tss_selector,
            },
        )
    };
}

/// Loads the GDT and the TSS and reloads the segment registers.
pub fn init() {
    let (gdt, selectors) = &*GDT;
    gdt.load();

    // SAFETY: the selectors index descriptors of the table just loaded.
    unsafe {
        CS::set_reg(selectors.code_selector);
        DS::set_reg(selectors.data_selector);
        ES::set_reg(selectors.data_selector);
        SS::set_reg(selectors.data_selector);
        load_tss(selectors.tss_selector);
    }
    CURRENT_SEGMENT.store(selectors.data_selector.0, Ordering::Relaxed);
}

/// The privileged stack reserved for `pid`.
pub fn privileged_stack_for(pid: Pid) -> PrivilegedStack {
    // SAFETY: only the address is taken; the stack memory is never
    // referenced from Rust.
    let base = unsafe { addr_of!(PRIVILEGED_STACKS[pid.index() % MAX_PROCESSES]) };
    let top = VirtAddr::from_ptr(base) + PRIVILEGED_STACK_SIZE;
    PrivilegedStack::new(top.as_u64(), GDT.1.data_selector.0)
}

/// The stack the next trap into ring 0 will use.
pub fn current() -> PrivilegedStack {
    // SAFETY: a plain read of a field only written with interrupts disabled
    // on the single CPU.
    let top = unsafe { (*addr_of!(TSS)).privilege_stack_table[0] };
    PrivilegedStack::new(top.as_u64(), CURRENT_SEGMENT.load(Ordering::Relaxed))
}

/// Makes `stack` the one the next trap into ring 0 will use.
pub fn set_current(stack: PrivilegedStack) {
    // SAFETY: callers run with interrupts disabled, so no trap reads the
    // entry mid-update.
    unsafe {
        (*addr_of_mut!(TSS)).privilege_stack_table[0] = VirtAddr::new(stack.top);
    }
    CURRENT_SEGMENT.store(stack.segment, Ordering::Relaxed);
}
