//! Terminal-to-process bindings.

use super::pcb::ProcessTable;
use crate::config::NUM_TERMINALS;
use loom_common::{Pid, TerminalId};

/// Foreground ownership of one virtual terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalSlot {
    /// A shell has been started on this terminal and is still alive.
    pub present: bool,
    /// The process currently owning the terminal's execution slot.
    pub owner: Option<Pid>,
    /// A shell launch for this terminal has been handed to the loader and
    /// not yet registered.
    pub launching: bool,
}

/// Binding table for the fixed set of virtual terminals.
pub struct TerminalTable {
    slots: [TerminalSlot; NUM_TERMINALS],
    /// Terminal receiving keyboard input and display output.
    foreground: TerminalId,
    /// Round-robin position of the timer path.
    cursor: usize,
    /// Shells still to be launched on vacant terminals.
    pending_launches: usize,
}

impl Default for TerminalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalTable {
    /// All terminals vacant, each waiting for a shell.
    pub const fn new() -> Self {
        Self {
            slots: [TerminalSlot {
                present: false,
                owner: None,
                launching: false,
            }; NUM_TERMINALS],
            foreground: TerminalId::new(0),
            cursor: NUM_TERMINALS - 1,
            pending_launches: NUM_TERMINALS,
        }
    }

    /// Checks a raw index against the number of terminals.
    pub fn id(&self, raw: usize) -> Option<TerminalId> {
        (raw < NUM_TERMINALS).then(|| TerminalId::new(raw as u8))
    }

    /// The slot for `terminal`.
    pub fn slot(&self, terminal: TerminalId) -> TerminalSlot {
        self.slots[terminal.index()]
    }

    /// The process owning `terminal`, if any.
    pub fn owner(&self, terminal: TerminalId) -> Option<Pid> {
        self.slots[terminal.index()].owner
    }

    /// Makes `pid` the owner of `terminal`.
    pub fn bind(&mut self, terminal: TerminalId, pid: Pid) {
        self.slots[terminal.index()] = TerminalSlot {
            present: true,
            owner: Some(pid),
            launching: false,
        };
    }

    /// Marks `terminal` as having no process and queues a shell for it.
    pub fn vacate(&mut self, terminal: TerminalId) {
        self.slots[terminal.index()] = TerminalSlot::default();
        self.pending_launches += 1;
    }

    /// The terminal bound to `pid` or to its nearest ancestor.
    pub fn terminal_of(&self, pid: Pid, processes: &ProcessTable) -> Option<TerminalId> {
        processes.lineage(pid).find_map(|ancestor| {
            self.slots
                .iter()
                .position(|slot| slot.owner == Some(ancestor))
                .map(|i| TerminalId::new(i as u8))
        })
    }

    /// Records that a shell is being launched for `terminal`. Returns
    /// false, changing nothing, if one already is.
    pub fn begin_launch(&mut self, terminal: TerminalId) -> bool {
        let slot = &mut self.slots[terminal.index()];
        if slot.launching {
            return false;
        }
        slot.launching = true;
        self.pending_launches = self.pending_launches.saturating_sub(1);
        true
    }

    /// Undoes [`Self::begin_launch`] for a launch the loader gave up on.
    pub fn cancel_launch(&mut self, terminal: TerminalId) {
        let slot = &mut self.slots[terminal.index()];
        if slot.launching {
            slot.launching = false;
            self.pending_launches += 1;
        }
    }

    /// Shells still to be launched.
    pub fn pending_launches(&self) -> usize {
        self.pending_launches
    }

    /// Moves the round-robin cursor to the next terminal.
    pub fn advance(&mut self) -> TerminalId {
        self.cursor = (self.cursor + 1) % NUM_TERMINALS;
        TerminalId::new(self.cursor as u8)
    }

    /// The terminal keystrokes are delivered to.
    pub fn foreground(&self) -> TerminalId {
        self.foreground
    }

    /// Changes the terminal keystrokes are delivered to.
    pub fn set_foreground(&mut self, terminal: TerminalId) {
        self.foreground = terminal;
    }
}
