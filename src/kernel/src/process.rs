//! Hooks into the program loader and the process teardown path.
//!
//! Both collaborators live outside the core. The boot code installs them
//! once; the scheduler and the keyboard reach them through
//! [`ProcessControl`](loom_hal::ProcessControl), which on real hardware
//! defers the call until the interrupt vector has released its locks.

use log::warn;
use loom_common::{ExitStatus, TerminalId};

/// Loads and starts the named program as the root of a terminal. Does not
/// return while it runs.
pub type LaunchHook = fn(&str, TerminalId);

/// Tears down the process owning the foreground terminal.
pub type TerminateHook = fn(ExitStatus);

static LAUNCH: spin::Once<LaunchHook> = spin::Once::new();
static TERMINATE: spin::Once<TerminateHook> = spin::Once::new();

/// Installs the loader and the teardown path. Only the first call counts.
pub fn install(launch: LaunchHook, terminate: TerminateHook) {
    LAUNCH.call_once(|| launch);
    TERMINATE.call_once(|| terminate);
}

/// A process operation recorded inside a critical section and carried out
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Start the named program on a vacant terminal.
    Launch {
        /// Program name.
        program: &'static str,
        /// Terminal the new process will own.
        terminal: TerminalId,
    },
    /// End the foreground process with the given status.
    Terminate(ExitStatus),
}

impl PendingAction {
    /// Hands the action to the installed hook.
    pub fn run(self) {
        match self {
            PendingAction::Launch { program, terminal } => match LAUNCH.get() {
                Some(launch) => launch(program, terminal),
                None => warn!("no loader installed, cannot start {} on {}", program, terminal),
            },
            PendingAction::Terminate(status) => match TERMINATE.get() {
                Some(terminate) => terminate(status),
                None => warn!("no teardown installed, ignoring exit {}", status.code()),
            },
        }
    }
}
