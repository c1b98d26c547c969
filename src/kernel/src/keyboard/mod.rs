//! Keyboard line discipline.
//!
//! Every keyboard interrupt delivers one scan code. The discipline tracks
//! modifier state, echoes printable keys, edits the pending line on
//! backspace, hands the line over on enter, and turns two control
//! combinations into signals: Ctrl+L clears the screen, Ctrl+C kills the
//! foreground process with [`ExitStatus::INTERRUPTED`].
//!
//! The hardware and the collaborators are reached only through the HAL
//! traits, so the state machine can be driven without a real keyboard.

pub mod buffer;
pub mod scancode;

pub use buffer::LineBuffer;

use crate::config::KEYBOARD_IRQ;
use log::info;
use loom_common::{ExitStatus, Modifiers};
use loom_hal::{Console, InterruptController, LineSink, ProcessControl, ScancodePort};
use spin::Mutex;

/// Byte echoed to erase the previous character.
const BACKSPACE_ECHO: u8 = 0x08;

/// Everything the keyboard interrupt needs from the outside world.
pub trait KeyboardHardware:
    ScancodePort + Console + InterruptController + LineSink + ProcessControl
{
}

impl<T> KeyboardHardware for T where
    T: ScancodePort + Console + InterruptController + LineSink + ProcessControl
{
}

/// The system-wide keyboard state, constructed at boot.
pub static KEYBOARD: Mutex<LineDiscipline> = Mutex::new(LineDiscipline::new());

/// Modifier state plus the line being typed.
pub struct LineDiscipline {
    modifiers: Modifiers,
    buffer: LineBuffer,
}

impl Default for LineDiscipline {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDiscipline {
    /// No modifiers held, empty line.
    pub const fn new() -> Self {
        Self {
            modifiers: Modifiers::empty(),
            buffer: LineBuffer::new(),
        }
    }

    /// Current modifier state.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The line typed so far.
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Drops the pending line and re-pads the buffer.
    pub fn reset_buffer(&mut self) {
        self.buffer.reset();
    }

    /// Handles one keyboard interrupt.
    ///
    /// Reads the scan code from `hw` and acknowledges the interrupt exactly
    /// once. The Ctrl+C path acknowledges early and re-enables interrupts
    /// before handing the foreground process to the teardown path.
    pub fn handle_scan_code<H: KeyboardHardware>(&mut self, hw: &mut H) {
        use scancode::*;

        let code = hw.read_scancode();
        match code {
            LEFT_SHIFT_DOWN => self.modifiers.insert(Modifiers::SHIFT_LEFT),
            LEFT_SHIFT_UP => self.modifiers.remove(Modifiers::SHIFT_LEFT),
            RIGHT_SHIFT_DOWN => self.modifiers.insert(Modifiers::SHIFT_RIGHT),
            RIGHT_SHIFT_UP => self.modifiers.remove(Modifiers::SHIFT_RIGHT),
            CONTROL_DOWN => self.modifiers.insert(Modifiers::CONTROL),
            CONTROL_UP => self.modifiers.remove(Modifiers::CONTROL),
            CAPS_LOCK_DOWN => {
                // Typematic repeat sends more downs before the up.
                if !self.modifiers.contains(Modifiers::CAPS_HELD) {
                    self.modifiers.toggle(Modifiers::CAPS_LOCK);
                    self.modifiers.insert(Modifiers::CAPS_HELD);
                }
            }
            CAPS_LOCK_UP => self.modifiers.remove(Modifiers::CAPS_HELD),
            BACKSPACE => {
                if self.buffer.erase() {
                    hw.write_byte(BACKSPACE_ECHO);
                }
            }
            ENTER => {
                hw.write_byte(b'\n');
                hw.line_ready(self.buffer.as_bytes());
                self.buffer.reset();
            }
            _ => {
                if let Some(plain) = unshifted(code) {
                    if self.modifiers.contains(Modifiers::CONTROL) {
                        match code {
                            KEY_L => hw.clear(),
                            KEY_C => {
                                self.interrupt_foreground(hw);
                                return;
                            }
                            _ => {}
                        }
                    } else {
                        let c = self.render(code, plain);
                        self.buffer.push(c);
                        hw.write_byte(c);
                    }
                }
            }
        }

        hw.end_of_interrupt(KEYBOARD_IRQ);
    }

    /// Picks the shifted or unshifted rendering of a printable key.
    fn render(&self, code: u8, plain: u8) -> u8 {
        let upper = if plain.is_ascii_lowercase() {
            self.modifiers.uppercase_letters()
        } else {
            self.modifiers.shift()
        };
        if upper {
            scancode::shifted(code).unwrap_or(plain)
        } else {
            plain
        }
    }

    fn interrupt_foreground<H: KeyboardHardware>(&mut self, hw: &mut H) {
        self.buffer.reset();
        hw.end_of_interrupt(KEYBOARD_IRQ);
        hw.enable();
        info!("^C: terminating foreground process");
        hw.terminate_foreground(ExitStatus::INTERRUPTED);
    }
}

/// Resets the system keyboard buffer before a fresh blocking read.
#[cfg(target_arch = "x86_64")]
pub fn reset_buffer() {
    x86_64::instructions::interrupts::without_interrupts(|| KEYBOARD.lock().reset_buffer());
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::scancode::*;
    use super::*;
    use crate::config::{LINE_BUFFER_SIZE, LINE_PAD};
    use crate::testutil::mock::{Event, MockHardware};
    use std::vec::Vec;

    const KEY_H: u8 = 0x23;
    const KEY_E: u8 = 0x12;
    const KEY_O: u8 = 0x18;
    const KEY_A: u8 = 0x1E;
    const KEY_2: u8 = 0x03;
    const KEY_1: u8 = 0x02;
    const KEY_SLASH: u8 = 0x35;

    fn type_keys(kbd: &mut LineDiscipline, hw: &mut MockHardware, codes: &[u8]) {
        for &code in codes {
            hw.scancodes.push_back(code);
            kbd.handle_scan_code(hw);
        }
    }

    fn is_reset(kbd: &LineDiscipline) -> bool {
        kbd.buffer().echoed() == 0 && kbd.buffer().as_bytes().iter().all(|&b| b == LINE_PAD)
    }

    #[test]
    fn test_hello_line_is_delivered() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        type_keys(&mut kbd, &mut hw, &[KEY_H, KEY_E, KEY_L, KEY_L, KEY_O, ENTER]);

        assert_eq!(hw.echoed(), b"hello\n");
        let lines = hw.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), LINE_BUFFER_SIZE);
        assert_eq!(&lines[0][..6], b"hello\n");
        assert!(is_reset(&kbd));
        assert_eq!(hw.count(|e| matches!(e, Event::Eoi(KEYBOARD_IRQ))), 6);
    }

    #[test]
    fn test_shift_two_is_at_sign() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        type_keys(&mut kbd, &mut hw, &[LEFT_SHIFT_DOWN, KEY_2, LEFT_SHIFT_UP, KEY_2]);

        assert_eq!(hw.echoed(), b"@2");
        assert_eq!(kbd.buffer().line(), b"@2");
    }

    #[test]
    fn test_caps_lock_ignores_repeat_until_release() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        type_keys(&mut kbd, &mut hw, &[CAPS_LOCK_DOWN, CAPS_LOCK_DOWN, CAPS_LOCK_DOWN]);
        assert!(kbd.modifiers().contains(Modifiers::CAPS_LOCK));

        type_keys(&mut kbd, &mut hw, &[CAPS_LOCK_UP, KEY_A, KEY_1]);
        assert_eq!(hw.echoed(), b"A1");

        type_keys(&mut kbd, &mut hw, &[CAPS_LOCK_DOWN, CAPS_LOCK_UP, KEY_A]);
        assert!(!kbd.modifiers().contains(Modifiers::CAPS_LOCK));
        assert_eq!(hw.echoed(), b"A1a");
    }

    #[test]
    fn test_letter_case_is_shift_xor_caps() {
        for caps in [false, true] {
            for left in [false, true] {
                for right in [false, true] {
                    let mut kbd = LineDiscipline::new();
                    let mut hw = MockHardware::new();
                    let mut codes = Vec::new();
                    if caps {
                        codes.extend_from_slice(&[CAPS_LOCK_DOWN, CAPS_LOCK_UP]);
                    }
                    if left {
                        codes.push(LEFT_SHIFT_DOWN);
                    }
                    if right {
                        codes.push(RIGHT_SHIFT_DOWN);
                    }
                    codes.extend_from_slice(&[KEY_A, KEY_SLASH]);
                    type_keys(&mut kbd, &mut hw, &codes);

                    let shift = left || right;
                    let letter = if shift != caps { b'A' } else { b'a' };
                    let symbol = if shift { b'?' } else { b'/' };
                    assert_eq!(hw.echoed(), [letter, symbol], "caps={caps} l={left} r={right}");
                }
            }
        }
    }

    #[test]
    fn test_backspace_is_left_inverse_of_append() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();
        type_keys(&mut kbd, &mut hw, &[KEY_H, KEY_E]);
        let before = kbd.buffer().clone();

        type_keys(&mut kbd, &mut hw, &[KEY_O, BACKSPACE]);

        assert_eq!(kbd.buffer().echoed(), before.echoed());
        assert_eq!(kbd.buffer().as_bytes(), before.as_bytes());
        assert_eq!(hw.echoed(), [b'h', b'e', b'o', BACKSPACE_ECHO]);
    }

    #[test]
    fn test_backspace_on_empty_line_is_noop() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        type_keys(&mut kbd, &mut hw, &[BACKSPACE]);

        assert!(hw.echoed().is_empty());
        assert!(is_reset(&kbd));
        assert_eq!(hw.events, [Event::Eoi(KEYBOARD_IRQ)]);
    }

    #[test]
    fn test_overflow_is_echoed_but_not_stored() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        let codes = std::vec![KEY_A; LineBuffer::STORED_MAX];
        type_keys(&mut kbd, &mut hw, &codes);
        assert_eq!(kbd.buffer().line().len(), LineBuffer::STORED_MAX);
        let full = kbd.buffer().clone();

        type_keys(&mut kbd, &mut hw, &[KEY_E]);

        assert_eq!(hw.echoed().len(), LineBuffer::STORED_MAX + 1);
        assert_eq!(hw.echoed().last(), Some(&b'e'));
        assert_eq!(kbd.buffer().as_bytes(), full.as_bytes());
        assert_eq!(kbd.buffer().echoed(), LINE_BUFFER_SIZE);
    }

    #[test]
    fn test_ctrl_l_clears_screen_and_keeps_line() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();
        type_keys(&mut kbd, &mut hw, &[KEY_H]);

        type_keys(&mut kbd, &mut hw, &[CONTROL_DOWN, KEY_L, CONTROL_UP]);

        assert_eq!(hw.count(|e| *e == Event::Clear), 1);
        assert_eq!(kbd.buffer().line(), b"h");
        assert_eq!(hw.echoed(), b"h");
    }

    #[test]
    fn test_ctrl_c_terminates_foreground_with_reserved_status() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();
        type_keys(&mut kbd, &mut hw, &[KEY_H, KEY_E, CONTROL_DOWN]);
        hw.events.clear();

        type_keys(&mut kbd, &mut hw, &[KEY_C]);

        assert!(is_reset(&kbd));
        assert_eq!(
            hw.events,
            [
                Event::Eoi(KEYBOARD_IRQ),
                Event::Enable,
                Event::Terminate(ExitStatus::INTERRUPTED),
            ]
        );
    }

    #[test]
    fn test_ctrl_with_other_key_is_swallowed() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        type_keys(&mut kbd, &mut hw, &[CONTROL_DOWN, KEY_A, CONTROL_UP, KEY_A]);

        assert_eq!(hw.echoed(), b"a");
        assert_eq!(kbd.buffer().line(), b"a");
    }

    #[test]
    fn test_unknown_scancodes_only_acknowledge() {
        let mut kbd = LineDiscipline::new();
        let mut hw = MockHardware::new();

        // F12, a key release, and the extended prefix.
        type_keys(&mut kbd, &mut hw, &[0x58, 0x9E, 0xE0]);

        assert_eq!(hw.count(|e| *e == Event::Eoi(KEYBOARD_IRQ)), 3);
        assert_eq!(hw.events.len(), 3);
        assert!(is_reset(&kbd));
        assert_eq!(kbd.modifiers(), Modifiers::empty());
    }
}
