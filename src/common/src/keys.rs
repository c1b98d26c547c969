//! Keyboard modifier state.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys tracked by the keyboard line discipline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT_LEFT  = 1 << 0;
        const SHIFT_RIGHT = 1 << 1;
        const CONTROL     = 1 << 2;
        /// Caps lock is toggled on.
        const CAPS_LOCK   = 1 << 3;
        /// The caps lock key is physically down (suppresses typematic repeat).
        const CAPS_HELD   = 1 << 4;
    }
}

impl Modifiers {
    /// Either shift key is down.
    pub const fn shift(self) -> bool {
        self.intersects(Self::SHIFT_LEFT.union(Self::SHIFT_RIGHT))
    }

    /// A letter renders uppercase exactly when shift XOR caps lock.
    pub const fn uppercase_letters(self) -> bool {
        self.shift() != self.contains(Self::CAPS_LOCK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_is_shift_xor_caps() {
        assert!(!Modifiers::empty().uppercase_letters());
        assert!(Modifiers::SHIFT_LEFT.uppercase_letters());
        assert!(Modifiers::SHIFT_RIGHT.uppercase_letters());
        assert!(Modifiers::CAPS_LOCK.uppercase_letters());
        assert!(!(Modifiers::CAPS_LOCK | Modifiers::SHIFT_LEFT).uppercase_letters());
        assert!(!(Modifiers::CAPS_LOCK | Modifiers::SHIFT_LEFT | Modifiers::SHIFT_RIGHT)
            .uppercase_letters());
    }
}
