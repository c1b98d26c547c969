//! The user window: one virtual range shared by every process, backed by a
//! different physical region for each.
//!
//! The window is two 2 MiB huge pages. Remapping rewrites their two level-2
//! entries in place and flushes the TLB; no frames are allocated on the
//! switch path.

use crate::config::USER_REGION_BASE;
use core::sync::atomic::{AtomicU64, Ordering};
use log::debug;
use x86_64::instructions::tlb;
use x86_64::registers::control::Cr3;
use x86_64::structures::paging::mapper::MapToError;
use x86_64::structures::paging::{
    FrameAllocator, Mapper, OffsetPageTable, Page, PageTable, PageTableFlags, PhysFrame, Size2MiB,
    Size4KiB,
};
use x86_64::{PhysAddr, VirtAddr};

/// Virtual start of the user window.
pub const USER_WINDOW: u64 = 128 * 1024 * 1024;

/// Size of one physical user region, and of the window.
pub const REGION_SIZE: u64 = 4 * 1024 * 1024;

const HUGE_PAGE: u64 = 2 * 1024 * 1024;
const PAGES_PER_REGION: usize = (REGION_SIZE / HUGE_PAGE) as usize;

/// Virtual address of the level-2 table holding the window's entries.
static WINDOW_TABLE: AtomicU64 = AtomicU64::new(0);

/// Physical start of region `region`.
pub const fn region_start(region: usize) -> u64 {
    region as u64 * REGION_SIZE
}

fn window_flags() -> PageTableFlags {
    PageTableFlags::PRESENT
        | PageTableFlags::WRITABLE
        | PageTableFlags::USER_ACCESSIBLE
        | PageTableFlags::HUGE_PAGE
}

/// Maps the window onto the region of pid 0 and remembers where its
/// level-2 entries live.
pub fn init(
    mapper: &mut OffsetPageTable<'static>,
    frame_allocator: &mut impl FrameAllocator<Size4KiB>,
) -> Result<(), MapToError<Size2MiB>> {
    let base = region_start(USER_REGION_BASE);
    for i in 0..PAGES_PER_REGION as u64 {
        let page = Page::<Size2MiB>::containing_address(VirtAddr::new(USER_WINDOW + i * HUGE_PAGE));
        let frame = PhysFrame::containing_address(PhysAddr::new(base + i * HUGE_PAGE));
        // SAFETY: the user regions are withheld from the frame allocator, so
        // nothing else maps these frames.
        unsafe { mapper.map_to(page, frame, window_flags(), frame_allocator)? }.flush();
    }

    let table = level2_table(mapper.phys_offset());
    WINDOW_TABLE.store(table as u64, Ordering::Relaxed);
    debug!("user window at {:#x}, level-2 table at {:p}", USER_WINDOW, table);
    Ok(())
}

/// Walks the active tables down to the level-2 table covering the window.
fn level2_table(phys_offset: VirtAddr) -> *mut PageTable {
    let window = VirtAddr::new(USER_WINDOW);
    let (l4_frame, _) = Cr3::read();
    let table_at = |phys: PhysAddr| (phys_offset + phys.as_u64()).as_mut_ptr::<PageTable>();

    // SAFETY: `init` has just mapped the window, so both upper entries are
    // present and point to tables reachable through the physical offset.
    unsafe {
        let l4 = &*table_at(l4_frame.start_address());
        let l3 = &*table_at(l4[window.p4_index()].addr());
        table_at(l3[window.p3_index()].addr())
    }
}

/// Points the window at physical region `region` and flushes the TLB.
pub fn map_region(region: usize) {
    let table = WINDOW_TABLE.load(Ordering::Relaxed) as *mut PageTable;
    if table.is_null() {
        return;
    }
    let first = usize::from(VirtAddr::new(USER_WINDOW).p2_index());
    let base = region_start(region);

    // SAFETY: the table pointer came from `init`; only the window's own two
    // entries are rewritten, with interrupts disabled by the caller.
    let table = unsafe { &mut *table };
    for i in 0..PAGES_PER_REGION {
        let phys = PhysAddr::new(base + i as u64 * HUGE_PAGE);
        table[first + i].set_addr(phys, window_flags());
    }
    tlb::flush_all();
}
