//! Recording stand-in for the HAL traits, used by host unit tests.

extern crate std;

use loom_common::{ExitStatus, PrivilegedStack, TerminalId};
use loom_hal::{
    Console, FrameSwitch, InterruptController, LineSink, ProcessControl, ScancodePort, TrapStack,
    UserAddressSpace,
};
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

/// One observable side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Echo(u8),
    Clear,
    Line(Vec<u8>),
    Eoi(u8),
    Enable,
    Disable,
    Launch(String, TerminalId),
    Terminate(ExitStatus),
    MapRegion(usize),
    SetTrapStack(PrivilegedStack),
    /// A frame exchange resuming the given anchor.
    Switch(usize),
}

/// Fake CPU, keyboard, console and collaborators.
#[derive(Debug, Default)]
pub struct MockHardware {
    /// Scan codes waiting to be read, oldest first.
    pub scancodes: VecDeque<u8>,
    /// Every side effect, in order.
    pub events: Vec<Event>,
    pub interrupts_enabled: bool,
    /// The live frame anchor of whatever context is "on the CPU".
    pub frame: usize,
    pub trap_stack: PrivilegedStack,
    pub region: Option<usize>,
}

impl MockHardware {
    pub fn new() -> Self {
        Self {
            interrupts_enabled: true,
            ..Self::default()
        }
    }

    /// Bytes written to the console.
    pub fn echoed(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Echo(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Lines handed to the sink.
    pub fn lines(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Line(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl ScancodePort for MockHardware {
    fn read_scancode(&mut self) -> u8 {
        self.scancodes.pop_front().expect("no scancode queued")
    }
}

impl Console for MockHardware {
    fn write_byte(&mut self, byte: u8) {
        self.events.push(Event::Echo(byte));
    }

    fn clear(&mut self) {
        self.events.push(Event::Clear);
    }
}

impl InterruptController for MockHardware {
    fn enable(&mut self) {
        self.interrupts_enabled = true;
        self.events.push(Event::Enable);
    }

    fn disable(&mut self) {
        self.interrupts_enabled = false;
        self.events.push(Event::Disable);
    }

    fn end_of_interrupt(&mut self, irq: u8) {
        self.events.push(Event::Eoi(irq));
    }
}

impl LineSink for MockHardware {
    fn line_ready(&mut self, line: &[u8]) {
        self.events.push(Event::Line(line.to_vec()));
    }
}

impl ProcessControl for MockHardware {
    fn launch(&mut self, program: &'static str, terminal: TerminalId) {
        self.events.push(Event::Launch(program.to_string(), terminal));
    }

    fn terminate_foreground(&mut self, status: ExitStatus) {
        self.events.push(Event::Terminate(status));
    }
}

impl UserAddressSpace for MockHardware {
    fn map_user_region(&mut self, region: usize) {
        self.region = Some(region);
        self.events.push(Event::MapRegion(region));
    }
}

impl TrapStack for MockHardware {
    fn current(&self) -> PrivilegedStack {
        self.trap_stack
    }

    fn set_current(&mut self, stack: PrivilegedStack) {
        self.trap_stack = stack;
        self.events.push(Event::SetTrapStack(stack));
    }
}

impl FrameSwitch for MockHardware {
    unsafe fn switch_frames(&mut self, save: *mut usize, next: usize) {
        assert!(!self.interrupts_enabled, "frame switch with interrupts enabled");
        *save = self.frame;
        self.frame = next;
        self.events.push(Event::Switch(next));
    }
}
