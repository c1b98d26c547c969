//! The keyboard line buffer.

use crate::config::{LINE_BUFFER_SIZE, LINE_PAD};

/// One line of echoed keyboard input.
///
/// `echoed` counts every character shown on screen since the last reset,
/// including ones that did not fit. Only the first `LINE_BUFFER_SIZE - 1`
/// are stored; the last slot always holds the pad byte, and so does every
/// slot past the stored characters.
#[derive(Clone)]
pub struct LineBuffer {
    bytes: [u8; LINE_BUFFER_SIZE],
    echoed: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Largest number of characters kept in the buffer.
    pub const STORED_MAX: usize = LINE_BUFFER_SIZE - 1;

    /// An empty, fully padded buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [LINE_PAD; LINE_BUFFER_SIZE],
            echoed: 0,
        }
    }

    /// Clears the count and re-pads every slot.
    pub fn reset(&mut self) {
        self.echoed = 0;
        self.bytes.fill(LINE_PAD);
    }

    /// Records one echoed character. Returns whether it was stored.
    pub fn push(&mut self, c: u8) -> bool {
        let stored = self.echoed < Self::STORED_MAX;
        if stored {
            self.bytes[self.echoed] = c;
        }
        self.echoed += 1;
        stored
    }

    /// Undoes the last echoed character. Returns `false` on an empty line.
    pub fn erase(&mut self) -> bool {
        if self.echoed == 0 {
            return false;
        }
        self.echoed -= 1;
        if self.echoed < Self::STORED_MAX {
            self.bytes[self.echoed] = LINE_PAD;
        }
        true
    }

    /// Characters echoed since the last reset.
    pub fn echoed(&self) -> usize {
        self.echoed
    }

    /// Whether nothing has been echoed since the last reset.
    pub fn is_empty(&self) -> bool {
        self.echoed == 0
    }

    /// The stored characters, without padding.
    pub fn line(&self) -> &[u8] {
        &self.bytes[..self.echoed.min(Self::STORED_MAX)]
    }

    /// The whole buffer including the pad tail.
    pub fn as_bytes(&self) -> &[u8; LINE_BUFFER_SIZE] {
        &self.bytes
    }
}
