//! VGA text console.
//!
//! Output always lands on the bottom row and scrolls up on newline. This is
//! the screen every terminal shares: a shell's prompt, the keyboard echo
//! and the boot report all go through [`WRITER`].

use core::fmt::{self, Write};
use core::ptr;
use spin::Mutex;
use x86_64::instructions::interrupts::without_interrupts;

const VGA_BUFFER_ADDR: usize = 0xB8000;
const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;

/// Echoed by the line discipline for a deleted character.
const BACKSPACE: u8 = 0x08;

/// Shown for bytes the console cannot render.
const PLACEHOLDER: u8 = 0xfe;

/// Text colors in use. The values are the VGA palette indices.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Cyan = 3,
    LightGreen = 10,
    LightRed = 12,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct Attribute(u8);

impl Attribute {
    const fn new(foreground: Color, background: Color) -> Self {
        Attribute((background as u8) << 4 | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct Cell {
    byte: u8,
    attribute: Attribute,
}

type Screen = [[Cell; BUFFER_WIDTH]; BUFFER_HEIGHT];

/// The shared console.
pub static WRITER: spin::Once<Mutex<Writer>> = spin::Once::new();

/// Sets up the console. Later calls do nothing.
pub fn init() {
    writer();
}

fn writer() -> &'static Mutex<Writer> {
    WRITER.call_once(|| Mutex::new(Writer::new()))
}

/// Cursor and color state over the memory-mapped text buffer.
pub struct Writer {
    column: usize,
    attribute: Attribute,
    screen: *mut Screen,
}

// SAFETY: the buffer is identity-mapped hardware that outlives the kernel,
// and every access goes through the WRITER lock.
unsafe impl Send for Writer {}

impl Writer {
    fn new() -> Self {
        Writer {
            column: 0,
            attribute: Attribute::new(Color::White, Color::Black),
            screen: VGA_BUFFER_ADDR as *mut Screen,
        }
    }

    /// Changes the color of subsequent output.
    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.attribute = Attribute::new(foreground, background);
    }

    /// Writes one byte. `\n` scrolls and backspace erases the previous cell.
    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            BACKSPACE => self.erase_previous(),
            byte => {
                if self.column >= BUFFER_WIDTH {
                    self.new_line();
                }
                self.put(BUFFER_HEIGHT - 1, self.column, byte);
                self.column += 1;
            }
        }
    }

    /// Stops at the start of the row; earlier rows are not revisited.
    fn erase_previous(&mut self) {
        if self.column > 0 {
            self.column -= 1;
            self.put(BUFFER_HEIGHT - 1, self.column, b' ');
        }
    }

    fn put(&mut self, row: usize, col: usize, byte: u8) {
        let cell = Cell {
            byte,
            attribute: self.attribute,
        };
        // SAFETY: callers keep row and col inside the screen; the buffer is
        // device memory, hence the volatile write.
        unsafe { ptr::write_volatile(&mut (*self.screen)[row][col], cell) }
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                // SAFETY: both rows are inside the screen.
                unsafe {
                    let cell = ptr::read_volatile(&(*self.screen)[row][col]);
                    ptr::write_volatile(&mut (*self.screen)[row - 1][col], cell);
                }
            }
        }
        self.blank_row(BUFFER_HEIGHT - 1);
        self.column = 0;
    }

    fn blank_row(&mut self, row: usize) {
        for col in 0..BUFFER_WIDTH {
            self.put(row, col, b' ');
        }
    }

    /// Blanks every row and homes the cursor.
    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.blank_row(row);
        }
        self.column = 0;
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | BACKSPACE => self.write_byte(byte),
                _ => self.write_byte(PLACEHOLDER),
            }
        }
        Ok(())
    }
}

/// Prints to the console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::vga::_print(format_args!($($arg)*))
    };
}

/// Prints to the console, with a newline.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)))
}

/// The keyboard interrupt echoes through the same writer, so it is only
/// locked with interrupts disabled.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    without_interrupts(|| {
        // Writer::write_str never fails.
        let _ = writer().lock().write_fmt(args);
    });
}

/// Writes one raw byte, including `\n` and backspace.
pub fn write_byte(byte: u8) {
    without_interrupts(|| writer().lock().write_byte(byte));
}

/// Changes the color of subsequent output.
pub fn set_color(foreground: Color, background: Color) {
    without_interrupts(|| writer().lock().set_color(foreground, background));
}

/// Blanks the screen.
pub fn clear_screen() {
    without_interrupts(|| writer().lock().clear_screen());
}
