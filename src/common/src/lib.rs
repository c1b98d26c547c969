//! Types shared between the Loom OS kernel and its collaborators.
//!
//! Nothing in here touches hardware: these are the identities, status codes
//! and flag sets that cross the boundary between the scheduler, the keyboard
//! line discipline and the out-of-kernel-core pieces (loader, teardown).

#![no_std]
#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod process;

pub use error::SchedError;
pub use keys::Modifiers;
pub use process::{ExitStatus, Pid, PrivilegedStack, TerminalId};
