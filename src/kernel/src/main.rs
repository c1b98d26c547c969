//! Loom OS Kernel Entry Point
//!
//! Brings the hardware binding up, installs the in-kernel loader and idles.
//! The first timer tick finds every terminal vacant and starts the shells.

#![no_std]
#![no_main]

use ::x86_64::VirtAddr;
use bootloader::{entry_point, BootInfo};
use core::panic::PanicInfo;
use loom_kernel::arch::x86_64::{self, interrupts, loader, paging, vga::Color};
use loom_kernel::boot;
use loom_kernel::config::{NUM_TERMINALS, USER_REGION_BASE};
use loom_kernel::{println, serial_println};

entry_point!(kernel_main);

/// Kernel entry point.
///
/// Called by the bootloader after setting up the initial environment.
fn kernel_main(boot_info: &'static BootInfo) -> ! {
    // Serial, VGA, logger, GDT/TSS, IDT and the scheduler. Interrupts stay
    // off until everything a context switch touches exists.
    loom_kernel::init();

    x86_64::vga::clear_screen();
    boot::banner::print_banner();
    boot::stage("Serial console and kernel log");
    boot::stage("GDT and TSS loaded");
    boot::stage("IDT configured, PICs remapped");

    let phys_mem_offset = VirtAddr::new(boot_info.physical_memory_offset);
    let mut mapper = unsafe { loom_kernel::memory::init_mapper(phys_mem_offset) };
    let mut frame_allocator =
        unsafe { loom_kernel::memory::BootInfoFrameAllocator::init(&boot_info.memory_map) };
    boot::require(
        "User window mapped",
        paging::init(&mut mapper, &mut frame_allocator),
    );
    boot::detail(format_args!(
        "window at {:#x}, pid 0 backed by region {}",
        paging::USER_WINDOW, USER_REGION_BASE
    ));

    loader::install();
    boot::stage("Shell loader installed");
    boot::detail(format_args!(
        "Ctrl+L clears the screen, Ctrl+C ends the foreground process"
    ));

    loom_kernel::tests::run_all();
    boot::stage("Kernel self tests passed");

    ::x86_64::instructions::interrupts::int3();
    boot::stage("Exception handling verified");

    println!();
    boot::stage("Boot complete");
    x86_64::vga::set_color(Color::Cyan, Color::Black);
    println!(
        "\n Starting {} shells. Type 'help' for available commands.\n",
        NUM_TERMINALS
    );
    x86_64::vga::set_color(Color::White, Color::Black);

    interrupts::enable();
    x86_64::halt_loop()
}

/// Panic handler.
///
/// Called when the kernel encounters an unrecoverable error.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("KERNEL PANIC: {}", info);

    x86_64::vga::set_color(Color::LightRed, Color::Black);
    println!("\n\n!!! KERNEL PANIC !!!");
    x86_64::vga::set_color(Color::White, Color::Black);
    println!("{}", info);

    x86_64::halt_loop()
}
