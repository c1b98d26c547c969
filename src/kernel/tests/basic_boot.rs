#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(loom_kernel::testutil::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use loom_common::{ExitStatus, Pid};
use loom_kernel::keyboard::KEYBOARD;
use loom_kernel::sched::{Scheduler, SwitchTarget};
use loom_kernel::testutil::{exit_qemu, QemuExitCode};

#[no_mangle]
pub extern "C" fn _start() -> ! {
    loom_kernel::init();
    test_main();
    exit_qemu(QemuExitCode::Success);
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    loom_kernel::testutil::test_panic_handler(info)
}

#[test_case]
fn keyboard_starts_empty() {
    let kbd = KEYBOARD.lock();
    assert_eq!(kbd.buffer().echoed(), 0);
    assert!(kbd.modifiers().is_empty());
}

#[test_case]
fn round_robin_starts_at_first_terminal() {
    let mut sched = Scheduler::new(loom_kernel::arch::x86_64::gdt::privileged_stack_for);
    match sched.next_target() {
        SwitchTarget::Vacant(terminal) => assert_eq!(terminal.index(), 0),
        SwitchTarget::Process(pid) => panic!("unexpected {}", pid),
    }
}

#[test_case]
fn privileged_stacks_are_distinct() {
    use loom_kernel::arch::x86_64::gdt::privileged_stack_for;
    assert_ne!(privileged_stack_for(Pid::new(0)), privileged_stack_for(Pid::new(1)));
}

#[test_case]
fn interrupt_status_is_reserved() {
    assert!(ExitStatus::INTERRUPTED.is_interrupted());
    assert!(!ExitStatus::new(0).is_interrupted());
}
