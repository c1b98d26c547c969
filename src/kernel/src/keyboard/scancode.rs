//! PS/2 scan code set 1: the codes the line discipline reacts to and the
//! two printable lookup tables.

pub const LEFT_SHIFT_DOWN: u8 = 0x2A;
pub const LEFT_SHIFT_UP: u8 = 0xAA;
pub const RIGHT_SHIFT_DOWN: u8 = 0x36;
pub const RIGHT_SHIFT_UP: u8 = 0xB6;
pub const CAPS_LOCK_DOWN: u8 = 0x3A;
pub const CAPS_LOCK_UP: u8 = 0xBA;
pub const CONTROL_DOWN: u8 = 0x1D;
pub const CONTROL_UP: u8 = 0x9D;
pub const BACKSPACE: u8 = 0x0E;
pub const ENTER: u8 = 0x1C;

/// `L`: with control held, clears the screen.
pub const KEY_L: u8 = 0x26;
/// `C`: with control held, interrupts the foreground process.
pub const KEY_C: u8 = 0x2E;

/// Number of entries in each lookup table (0x00..=0x39).
pub const TABLE_LEN: usize = 58;

/// US QWERTY map without shift (0 == no character).
#[rustfmt::skip]
pub static UNSHIFTED: [u8; TABLE_LEN] = [
    0,    0,    b'1', b'2', b'3', b'4', b'5', b'6',
    b'7', b'8', b'9', b'0', b'-', b'=', 0,    b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i',
    b'o', b'p', b'[', b']', 0,    0,    b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';',
    b'\'', b'`', 0,   b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0,    0,
    0,    b' ',
];

/// US QWERTY map with shift held (0 == no character).
#[rustfmt::skip]
pub static SHIFTED: [u8; TABLE_LEN] = [
    0,    0,    b'!', b'@', b'#', b'$', b'%', b'^',
    b'&', b'*', b'(', b')', b'_', b'+', 0,    b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I',
    b'O', b'P', b'{', b'}', 0,    0,    b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':',
    b'"', b'~', 0,    b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0,    0,
    0,    b' ',
];

/// Unshifted character for `code`, if the key prints anything.
pub fn unshifted(code: u8) -> Option<u8> {
    lookup(&UNSHIFTED, code)
}

/// Shifted character for `code`, if the key prints anything.
pub fn shifted(code: u8) -> Option<u8> {
    lookup(&SHIFTED, code)
}

fn lookup(table: &[u8; TABLE_LEN], code: u8) -> Option<u8> {
    match table.get(code as usize) {
        Some(&0) | None => None,
        Some(&c) => Some(c),
    }
}
