//! Architecture-specific implementations.
//!
//! Everything that touches registers, ports or page tables lives here, behind
//! the HAL traits. Currently supported: x86_64.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use self::x86_64::*;
