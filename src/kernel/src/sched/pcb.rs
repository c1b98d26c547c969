//! The process table.

use crate::config::MAX_PROCESSES;
use loom_common::{Pid, PrivilegedStack, SchedError};

/// Saved state of one process slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcb {
    /// Identity; always equal to the slot index.
    pub pid: Pid,
    /// Whether the slot holds a live process.
    pub present: bool,
    /// The process that spawned this one. Root shells have none.
    pub parent: Option<Pid>,
    /// Frame anchor to resume from. Only meaningful while suspended.
    pub saved_frame: usize,
    /// Stack the CPU must use on a trap while this process runs.
    pub privileged_stack: PrivilegedStack,
    /// Handle owned by the file layer.
    pub file_table: usize,
}

impl Pcb {
    const fn empty(pid: Pid) -> Self {
        Self {
            pid,
            present: false,
            parent: None,
            saved_frame: 0,
            privileged_stack: PrivilegedStack::new(0, 0),
            file_table: 0,
        }
    }
}

/// Fixed-size table of PCBs indexed by pid.
pub struct ProcessTable {
    slots: [Pcb; MAX_PROCESSES],
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    /// A table with every slot free.
    pub const fn new() -> Self {
        let mut slots = [Pcb::empty(Pid::new(0)); MAX_PROCESSES];
        let mut i = 0;
        while i < MAX_PROCESSES {
            slots[i].pid = Pid::new(i as u8);
            i += 1;
        }
        Self { slots }
    }

    /// The live process `pid`.
    pub fn get(&self, pid: Pid) -> Result<&Pcb, SchedError> {
        match self.slots.get(pid.index()) {
            Some(pcb) if pcb.present => Ok(pcb),
            Some(_) => Err(SchedError::ProcessAbsent(pid)),
            None => Err(SchedError::InvalidPid(pid.index())),
        }
    }

    /// The live process `pid`, mutably.
    pub fn get_mut(&mut self, pid: Pid) -> Result<&mut Pcb, SchedError> {
        match self.slots.get_mut(pid.index()) {
            Some(pcb) if pcb.present => Ok(pcb),
            Some(_) => Err(SchedError::ProcessAbsent(pid)),
            None => Err(SchedError::InvalidPid(pid.index())),
        }
    }

    /// Claims the lowest free slot for a new process.
    pub fn allocate(
        &mut self,
        parent: Option<Pid>,
        privileged_stack: PrivilegedStack,
    ) -> Result<Pid, SchedError> {
        let pcb = self
            .slots
            .iter_mut()
            .find(|pcb| !pcb.present)
            .ok_or(SchedError::TableFull)?;
        *pcb = Pcb {
            present: true,
            parent,
            privileged_stack,
            ..Pcb::empty(pcb.pid)
        };
        Ok(pcb.pid)
    }

    /// Frees the slot of `pid`, returning its final state.
    pub fn release(&mut self, pid: Pid) -> Result<Pcb, SchedError> {
        let pcb = self.get_mut(pid)?;
        let last = *pcb;
        *pcb = Pcb::empty(pid);
        Ok(last)
    }

    /// Live processes in pid order.
    pub fn live(&self) -> impl Iterator<Item = &Pcb> {
        self.slots.iter().filter(|pcb| pcb.present)
    }

    /// `pid` followed by each of its ancestors, nearest first.
    pub fn lineage(&self, pid: Pid) -> impl Iterator<Item = Pid> + '_ {
        core::iter::successors(self.get(pid).ok(), move |pcb| {
            pcb.parent.and_then(|parent| self.get(parent).ok())
        })
        .map(|pcb| pcb.pid)
        .take(MAX_PROCESSES)
    }
}
