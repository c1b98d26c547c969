//! Page table access and the boot-time frame allocator.

use crate::arch::x86_64::paging::region_start;
use crate::config::{MAX_PROCESSES, USER_REGION_BASE};
use bootloader::bootinfo::{MemoryMap, MemoryRegionType};
use core::ops::Range;
use x86_64::structures::paging::{FrameAllocator, OffsetPageTable, PageTable, PhysFrame, Size4KiB};
use x86_64::{PhysAddr, VirtAddr};

/// Physical memory backing the user regions of every pid. Never handed out
/// by the frame allocator.
pub const fn user_memory() -> Range<u64> {
    region_start(USER_REGION_BASE)..region_start(USER_REGION_BASE + MAX_PROCESSES)
}

/// Builds a mapper over the active level-4 table.
///
/// # Safety
///
/// All physical memory must be mapped at `physical_memory_offset`, and this
/// must be called only once to avoid aliasing `&mut` references.
pub unsafe fn init_mapper(physical_memory_offset: VirtAddr) -> OffsetPageTable<'static> {
    // SAFETY: forwarded from the caller.
    unsafe {
        let level_4_table = active_level_4_table(physical_memory_offset);
        OffsetPageTable::new(level_4_table, physical_memory_offset)
    }
}

unsafe fn active_level_4_table(physical_memory_offset: VirtAddr) -> &'static mut PageTable {
    use x86_64::registers::control::Cr3;

    let (level_4_table_frame, _) = Cr3::read();
    let virt = physical_memory_offset + level_4_table_frame.start_address().as_u64();
    // SAFETY: see `init_mapper`.
    unsafe { &mut *virt.as_mut_ptr() }
}

/// Hands out usable frames from the bootloader's memory map, skipping the
/// user regions.
pub struct BootInfoFrameAllocator {
    memory_map: &'static MemoryMap,
    next: usize,
}

impl BootInfoFrameAllocator {
    /// Creates an allocator over `memory_map`.
    ///
    /// # Safety
    ///
    /// Every region marked usable in the map must really be unused.
    pub unsafe fn init(memory_map: &'static MemoryMap) -> Self {
        BootInfoFrameAllocator {
            memory_map,
            next: 0,
        }
    }

    fn usable_frames(&self) -> impl Iterator<Item = PhysFrame> {
        let reserved = user_memory();
        self.memory_map
            .iter()
            .filter(|r| r.region_type == MemoryRegionType::Usable)
            .map(|r| r.range.start_addr()..r.range.end_addr())
            .flat_map(|r| r.step_by(4096))
            .filter(move |addr| !reserved.contains(addr))
            .map(|addr| PhysFrame::containing_address(PhysAddr::new(addr)))
    }
}

// SAFETY: each frame is yielded at most once, from usable memory only.
unsafe impl FrameAllocator<Size4KiB> for BootInfoFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let frame = self.usable_frames().nth(self.next);
        self.next += 1;
        frame
    }
}
