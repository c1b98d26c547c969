//! Preemptive multiplexing of terminal shells onto the CPU.
//!
//! The scheduler owns the process table and the terminal bindings. Its one
//! real job is [`Scheduler::switch_to`]: suspend whatever runs now and resume
//! the target, swapping the user address window, the privileged stack the
//! next trap will use, and the execution context itself. Everything except
//! the final frame exchange is ordinary safe code; the exchange goes through
//! [`FrameSwitch`], which is the only place raw registers are touched.
//!
//! Mutual exclusion comes from disabling interrupts. The switch runs with
//! interrupts off from the first write to the last, and the resumed side
//! re-enables them on its way out.

pub mod pcb;
pub mod terminal;

pub use pcb::{Pcb, ProcessTable};
pub use terminal::{TerminalSlot, TerminalTable};

use crate::config::{self, SHELL_PROGRAM};
use core::ptr::addr_of_mut;
use log::{debug, trace, warn};
use loom_common::{Pid, PrivilegedStack, SchedError, TerminalId};
use loom_hal::{FrameSwitch, InterruptController, ProcessControl, TrapStack, UserAddressSpace};
use spin::Mutex;

/// What the timer path asks the scheduler to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchTarget {
    /// Resume this process.
    Process(Pid),
    /// The terminal has no process; start a shell on it.
    Vacant(TerminalId),
}

/// Where a process the loader starts belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A shell launched for a vacant terminal.
    Root(TerminalId),
    /// A program started by this process; it takes over the parent's
    /// terminal until it exits.
    Child(Pid),
}

/// A process removed by [`Scheduler::exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exited {
    /// The process that exited.
    pub pid: Pid,
    /// Its parent, which got the terminal back.
    pub parent: Option<Pid>,
    /// Whether it was on the CPU. If so, [`Scheduler::resume_anchor`] is
    /// what runs next; otherwise the running process carries on.
    pub was_running: bool,
}

/// Everything a context switch needs from the CPU and the loader.
pub trait SwitchHardware:
    InterruptController + UserAddressSpace + TrapStack + FrameSwitch + ProcessControl
{
}

impl<T> SwitchHardware for T where
    T: InterruptController + UserAddressSpace + TrapStack + FrameSwitch + ProcessControl
{
}

/// Hands out the privileged stack of each pid.
pub type StackProvider = fn(Pid) -> PrivilegedStack;

/// The system scheduler; installed by the architecture at boot.
pub static SCHEDULER: spin::Once<Mutex<Scheduler>> = spin::Once::new();

/// Installs the system scheduler. Idempotent.
pub fn init(stack_for: StackProvider) {
    SCHEDULER.call_once(|| Mutex::new(Scheduler::new(stack_for)));
}

/// Process table, terminal bindings and the identity of the running process.
pub struct Scheduler {
    processes: ProcessTable,
    terminals: TerminalTable,
    running: Option<Pid>,
    /// Anchor of the boot context once something else has been switched in.
    boot_frame: usize,
    stack_for: StackProvider,
}

impl Scheduler {
    /// An empty scheduler; nothing runs until the first shell is launched.
    pub const fn new(stack_for: StackProvider) -> Self {
        Self {
            processes: ProcessTable::new(),
            terminals: TerminalTable::new(),
            running: None,
            boot_frame: 0,
            stack_for,
        }
    }

    /// The process currently on the CPU.
    pub fn running(&self) -> Option<Pid> {
        self.running
    }

    /// The process table.
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// The terminal bindings.
    pub fn terminals(&self) -> &TerminalTable {
        &self.terminals
    }

    /// The terminal bindings, mutably.
    pub fn terminals_mut(&mut self) -> &mut TerminalTable {
        &mut self.terminals
    }

    /// Round-robin choice over the terminals for the next timer tick.
    pub fn next_target(&mut self) -> SwitchTarget {
        let terminal = self.terminals.advance();
        match self.terminals.owner(terminal) {
            Some(pid) => SwitchTarget::Process(pid),
            None => SwitchTarget::Vacant(terminal),
        }
    }

    /// Suspends the running process and resumes `target`.
    ///
    /// A vacant terminal launches a fresh shell instead, unless one is
    /// already being launched for it. Switching to the running process
    /// changes nothing. An absent target is rejected before
    /// any state is touched.
    pub fn switch_to<H: SwitchHardware>(
        &mut self,
        hw: &mut H,
        target: SwitchTarget,
    ) -> Result<(), SchedError> {
        hw.disable();

        let next = match target {
            SwitchTarget::Process(pid) => pid,
            SwitchTarget::Vacant(terminal) => {
                self.launch_shell(hw, terminal);
                return Ok(());
            }
        };

        if self.running == Some(next) {
            hw.enable();
            return Ok(());
        }

        let (save, resume) = match self.prepare_switch(hw, next) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("refusing switch to {}: {}", next, e);
                hw.enable();
                return Err(e);
            }
        };

        trace!("switch {:?} -> {}", self.running, next);
        self.running = Some(next);

        // SAFETY: interrupts are off, `save` points into a PCB (or the boot
        // slot) that nothing else writes while its owner is suspended, and
        // `resume` was stored by the switch that suspended `next`.
        unsafe { hw.switch_frames(save, resume) };

        hw.enable();
        Ok(())
    }

    /// Steps 3 to 5 of a switch: validates both sides, remaps the user
    /// window and exchanges the privileged stacks. Returns the slot the
    /// current anchor goes to and the anchor to resume.
    fn prepare_switch<H: SwitchHardware>(
        &mut self,
        hw: &mut H,
        next: Pid,
    ) -> Result<(*mut usize, usize), SchedError> {
        let next_pcb = *self.processes.get(next)?;
        if let Some(current) = self.running {
            self.processes.get(current)?;
        }

        hw.map_user_region(config::user_region(next));

        let save = match self.running {
            Some(current) => {
                let pcb = self.processes.get_mut(current)?;
                pcb.privileged_stack = hw.current();
                addr_of_mut!(pcb.saved_frame)
            }
            None => addr_of_mut!(self.boot_frame),
        };
        hw.set_current(next_pcb.privileged_stack);

        Ok((save, next_pcb.saved_frame))
    }

    /// Where the running context's anchor goes when it is suspended
    /// outside [`Self::switch_to`], as when the loader starts a process.
    pub fn suspend_slot(&mut self) -> *mut usize {
        match self.running.and_then(|pid| self.processes.get_mut(pid).ok()) {
            Some(pcb) => addr_of_mut!(pcb.saved_frame),
            None => addr_of_mut!(self.boot_frame),
        }
    }

    /// The anchor of whatever is marked running; the boot context when
    /// nothing is.
    pub fn resume_anchor(&self) -> usize {
        self.running
            .and_then(|pid| self.processes.get(pid).ok())
            .map_or(self.boot_frame, |pcb| pcb.saved_frame)
    }

    fn launch_shell<H: SwitchHardware>(&mut self, hw: &mut H, terminal: TerminalId) {
        if !self.terminals.begin_launch(terminal) {
            trace!("{} already has a shell launch in flight", terminal);
            hw.enable();
            return;
        }
        debug!("{} has no process, launching {}", terminal, SHELL_PROGRAM);
        hw.enable();
        hw.launch(SHELL_PROGRAM, terminal);
    }

    /// Gives up a launch started for `terminal`, so a later round tries
    /// again.
    pub fn cancel_launch(&mut self, terminal: TerminalId) {
        self.terminals.cancel_launch(terminal);
    }

    /// Creates the PCB for a process the loader is starting and makes it
    /// the running one.
    ///
    /// A root process takes the terminal it was launched for; a child
    /// takes over the terminal of its parent's lineage.
    pub fn register<H: UserAddressSpace + TrapStack>(
        &mut self,
        hw: &mut H,
        origin: Origin,
    ) -> Result<Pid, SchedError> {
        let parent = match origin {
            Origin::Root(_) => None,
            Origin::Child(parent) => {
                self.processes.get(parent)?;
                Some(parent)
            }
        };
        let pid = self.processes.allocate(parent, PrivilegedStack::default())?;
        let stack = (self.stack_for)(pid);
        self.processes.get_mut(pid)?.privileged_stack = stack;

        let terminal = match origin {
            Origin::Root(terminal) => Some(terminal),
            Origin::Child(parent) => self.terminals.terminal_of(parent, &self.processes),
        };
        match terminal {
            Some(terminal) => self.terminals.bind(terminal, pid),
            None => warn!("{} started without a terminal", pid),
        }

        if let Some(current) = self.running {
            self.processes.get_mut(current)?.privileged_stack = hw.current();
        }
        hw.set_current(stack);
        hw.map_user_region(config::user_region(pid));
        self.running = Some(pid);

        debug!("registered {} (parent {:?}, terminal {:?})", pid, parent, terminal);
        Ok(pid)
    }

    /// Removes `pid` from the table after the loader tore it down.
    ///
    /// The parent, if any, gets the terminal back and, when `pid` was
    /// running, becomes the running process again. A root process leaves
    /// its terminal vacant so the next round starts a new shell there.
    pub fn exit<H: UserAddressSpace + TrapStack>(
        &mut self,
        hw: &mut H,
        pid: Pid,
    ) -> Result<Exited, SchedError> {
        let terminal = self
            .terminals
            .terminal_of(pid, &self.processes)
            .filter(|&t| self.terminals.owner(t) == Some(pid));
        let pcb = self.processes.release(pid)?;
        let was_running = self.running == Some(pid);

        match pcb.parent {
            Some(parent) => {
                if let Some(terminal) = terminal {
                    self.terminals.bind(terminal, parent);
                }
                if was_running {
                    let stack = self.processes.get(parent)?.privileged_stack;
                    hw.set_current(stack);
                    hw.map_user_region(config::user_region(parent));
                    self.running = Some(parent);
                }
            }
            None => {
                if let Some(terminal) = terminal {
                    self.terminals.vacate(terminal);
                }
                if was_running {
                    self.running = None;
                }
            }
        }

        debug!("{} exited, parent {:?}", pid, pcb.parent);
        Ok(Exited {
            pid,
            parent: pcb.parent,
            was_running,
        })
    }

    /// [`Self::exit`] for the running process.
    pub fn exit_running<H: UserAddressSpace + TrapStack>(
        &mut self,
        hw: &mut H,
    ) -> Result<Exited, SchedError> {
        let pid = self.running.ok_or(SchedError::NotRunning)?;
        self.exit(hw, pid)
    }

    /// [`Self::exit`] for the owner of the foreground terminal, which is
    /// where keyboard signals go. A suspended owner is simply never resumed.
    pub fn exit_foreground<H: UserAddressSpace + TrapStack>(
        &mut self,
        hw: &mut H,
    ) -> Result<Exited, SchedError> {
        let terminal = self.terminals.foreground();
        let pid = self
            .terminals
            .owner(terminal)
            .ok_or(SchedError::NoOwner(terminal))?;
        self.exit(hw, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NUM_TERMINALS, USER_REGION_BASE};
    use crate::testutil::mock::{Event, MockHardware};

    fn stack_for(pid: Pid) -> PrivilegedStack {
        PrivilegedStack::new(0x80_0000 - 0x2000 * pid.index() as u64, 0x10)
    }

    fn tty(i: u8) -> TerminalId {
        TerminalId::new(i)
    }

    /// Launches a root shell on `terminal` the way the timer path does.
    fn start_shell(sched: &mut Scheduler, hw: &mut MockHardware, terminal: TerminalId) -> Pid {
        sched
            .switch_to(hw, SwitchTarget::Vacant(terminal))
            .unwrap();
        sched.register(hw, Origin::Root(terminal)).unwrap()
    }

    #[test]
    fn test_vacant_terminal_launches_shell() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();

        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(0))).unwrap();

        assert_eq!(
            hw.events,
            [
                Event::Disable,
                Event::Enable,
                Event::Launch(SHELL_PROGRAM.into(), tty(0)),
            ]
        );
        assert_eq!(sched.terminals().pending_launches(), NUM_TERMINALS - 1);
        assert_eq!(sched.running(), None);

        let pid = sched.register(&mut hw, Origin::Root(tty(0))).unwrap();
        assert_eq!(sched.running(), Some(pid));
        assert_eq!(sched.terminals().owner(tty(0)), Some(pid));
        assert_eq!(hw.trap_stack, stack_for(pid));
        assert_eq!(hw.region, Some(USER_REGION_BASE + pid.index()));
    }

    #[test]
    fn test_switch_to_running_process_is_noop() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let pid = start_shell(&mut sched, &mut hw, tty(0));
        let before = *sched.processes().get(pid).unwrap();
        hw.events.clear();

        sched.switch_to(&mut hw, SwitchTarget::Process(pid)).unwrap();

        assert_eq!(hw.events, [Event::Disable, Event::Enable]);
        assert_eq!(*sched.processes().get(pid).unwrap(), before);
        assert_eq!(sched.running(), Some(pid));
    }

    #[test]
    fn test_switch_exchanges_region_stack_and_frame() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let a = start_shell(&mut sched, &mut hw, tty(0));
        let b = start_shell(&mut sched, &mut hw, tty(1));
        hw.frame = 0xB000;
        hw.events.clear();

        sched.switch_to(&mut hw, SwitchTarget::Process(a)).unwrap();

        assert_eq!(
            hw.events,
            [
                Event::Disable,
                Event::MapRegion(USER_REGION_BASE + a.index()),
                Event::SetTrapStack(stack_for(a)),
                Event::Switch(0),
                Event::Enable,
            ]
        );
        assert_eq!(sched.running(), Some(a));
        assert_eq!(sched.processes().get(b).unwrap().saved_frame, 0xB000);
        assert_eq!(sched.processes().get(b).unwrap().privileged_stack, stack_for(b));
        assert!(hw.interrupts_enabled);
    }

    #[test]
    fn test_round_trip_restores_suspended_state() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let a = start_shell(&mut sched, &mut hw, tty(0));
        let b = start_shell(&mut sched, &mut hw, tty(1));
        sched.switch_to(&mut hw, SwitchTarget::Process(a)).unwrap();

        // `a` is running with its own live anchor.
        hw.frame = 0xAAAA;
        let snapshot = (hw.frame, hw.trap_stack, hw.region);

        sched.switch_to(&mut hw, SwitchTarget::Process(b)).unwrap();
        assert_ne!(hw.frame, 0xAAAA);
        let suspended = *sched.processes().get(a).unwrap();
        sched.switch_to(&mut hw, SwitchTarget::Process(a)).unwrap();

        assert_eq!((hw.frame, hw.trap_stack, hw.region), snapshot);
        assert_eq!(*sched.processes().get(a).unwrap(), suspended);
        assert_eq!(sched.running(), Some(a));
    }

    #[test]
    fn test_absent_target_is_rejected_untouched() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let a = start_shell(&mut sched, &mut hw, tty(0));
        hw.events.clear();
        let ghost = Pid::new(4);

        let result = sched.switch_to(&mut hw, SwitchTarget::Process(ghost));

        assert_eq!(result, Err(SchedError::ProcessAbsent(ghost)));
        assert_eq!(hw.events, [Event::Disable, Event::Enable]);
        assert_eq!(sched.running(), Some(a));
    }

    #[test]
    fn test_first_switch_from_boot_context() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let a = start_shell(&mut sched, &mut hw, tty(0));
        let b = start_shell(&mut sched, &mut hw, tty(1));
        sched.exit(&mut hw, b).unwrap();
        assert_eq!(sched.running(), None);
        hw.frame = 0xB007;
        hw.events.clear();

        sched.switch_to(&mut hw, SwitchTarget::Process(a)).unwrap();

        assert_eq!(sched.boot_frame, 0xB007);
        assert_eq!(hw.count(|e| matches!(e, Event::Switch(_))), 1);
        assert_eq!(hw.trap_stack, stack_for(a));
        assert_eq!(sched.running(), Some(a));
    }

    #[test]
    fn test_child_takes_terminal_and_returns_it() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let shell = start_shell(&mut sched, &mut hw, tty(2));
        hw.trap_stack = PrivilegedStack::new(0x1234, 0x10);

        let child = sched.register(&mut hw, Origin::Child(shell)).unwrap();
        assert_eq!(sched.terminals().owner(tty(2)), Some(child));
        assert_eq!(sched.running(), Some(child));
        assert_eq!(
            sched.processes().get(shell).unwrap().privileged_stack,
            PrivilegedStack::new(0x1234, 0x10)
        );

        let exited = sched.exit(&mut hw, child).unwrap();
        assert_eq!(exited.parent, Some(shell));
        assert!(exited.was_running);
        assert_eq!(sched.terminals().owner(tty(2)), Some(shell));
        assert_eq!(sched.running(), Some(shell));
        assert_eq!(hw.trap_stack, PrivilegedStack::new(0x1234, 0x10));
        assert_eq!(hw.region, Some(USER_REGION_BASE + shell.index()));
    }

    #[test]
    fn test_root_exit_vacates_terminal() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let shell = start_shell(&mut sched, &mut hw, tty(0));
        let pending = sched.terminals().pending_launches();

        assert_eq!(sched.exit(&mut hw, shell).unwrap().parent, None);

        assert_eq!(sched.terminals().owner(tty(0)), None);
        assert!(!sched.terminals().slot(tty(0)).present);
        assert_eq!(sched.terminals().pending_launches(), pending + 1);
        assert_eq!(sched.running(), None);
        assert_eq!(
            sched.exit(&mut hw, shell),
            Err(SchedError::ProcessAbsent(shell))
        );
    }

    #[test]
    fn test_round_robin_targets() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();

        assert_eq!(sched.next_target(), SwitchTarget::Vacant(tty(0)));
        let a = start_shell(&mut sched, &mut hw, tty(0));
        assert_eq!(sched.next_target(), SwitchTarget::Vacant(tty(1)));
        assert_eq!(sched.next_target(), SwitchTarget::Vacant(tty(2)));
        assert_eq!(sched.next_target(), SwitchTarget::Process(a));
    }

    #[test]
    fn test_full_table_is_reported() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let shell = start_shell(&mut sched, &mut hw, tty(0));
        let mut parent = shell;
        for _ in 1..config::MAX_PROCESSES {
            parent = sched.register(&mut hw, Origin::Child(parent)).unwrap();
        }

        assert_eq!(
            sched.register(&mut hw, Origin::Child(parent)),
            Err(SchedError::TableFull)
        );
        assert_eq!(sched.running(), Some(parent));
    }

    #[test]
    fn test_exit_running_resumes_parent_anchor() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        assert_eq!(sched.exit_running(&mut hw), Err(SchedError::NotRunning));

        let shell = start_shell(&mut sched, &mut hw, tty(0));
        let slot = sched.suspend_slot();
        // SAFETY: the slot points into the scheduler, which outlives this write.
        unsafe { *slot = 0x5E11 };
        let child = sched.register(&mut hw, Origin::Child(shell)).unwrap();
        assert_eq!(sched.running(), Some(child));

        assert_eq!(
            sched.exit_running(&mut hw).map(|e| e.parent),
            Ok(Some(shell))
        );
        assert_eq!(sched.resume_anchor(), 0x5E11);

        assert_eq!(sched.exit_running(&mut hw).map(|e| e.parent), Ok(None));
        assert_eq!(sched.resume_anchor(), sched.boot_frame);
    }

    #[test]
    fn test_nested_vacant_ticks_bind_each_launch_to_its_terminal() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();

        // A tick arrives between the first launch request and its
        // registration, and asks for a second terminal.
        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(0))).unwrap();
        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(1))).unwrap();
        let inner = sched.register(&mut hw, Origin::Root(tty(1))).unwrap();
        let outer = sched.register(&mut hw, Origin::Root(tty(0))).unwrap();

        assert_eq!(sched.terminals().owner(tty(0)), Some(outer));
        assert_eq!(sched.terminals().owner(tty(1)), Some(inner));
        assert_eq!(sched.terminals().pending_launches(), NUM_TERMINALS - 2);
        assert!(!sched.terminals().slot(tty(0)).launching);
    }

    #[test]
    fn test_vacant_tick_during_launch_does_not_launch_twice() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();

        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(2))).unwrap();
        hw.events.clear();
        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(2))).unwrap();

        assert_eq!(hw.events, [Event::Disable, Event::Enable]);
        assert_eq!(sched.terminals().pending_launches(), NUM_TERMINALS - 1);

        sched.cancel_launch(tty(2));
        assert_eq!(sched.terminals().pending_launches(), NUM_TERMINALS);
        sched.switch_to(&mut hw, SwitchTarget::Vacant(tty(2))).unwrap();
        assert_eq!(
            hw.count(|e| matches!(e, Event::Launch(_, t) if *t == tty(2))),
            1
        );
    }

    #[test]
    fn test_interrupt_ends_foreground_owner_not_running_process() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let fg = start_shell(&mut sched, &mut hw, tty(0));
        let bg = start_shell(&mut sched, &mut hw, tty(1));
        sched.terminals_mut().set_foreground(tty(0));
        assert_eq!(sched.running(), Some(bg));
        hw.events.clear();

        let exited = sched.exit_foreground(&mut hw).unwrap();

        assert_eq!(
            exited,
            Exited {
                pid: fg,
                parent: None,
                was_running: false,
            }
        );
        assert!(hw.events.is_empty());
        assert_eq!(sched.running(), Some(bg));
        assert_eq!(sched.terminals().owner(tty(1)), Some(bg));
        assert_eq!(sched.terminals().owner(tty(0)), None);
        assert_eq!(sched.next_target(), SwitchTarget::Vacant(tty(0)));
    }

    #[test]
    fn test_interrupt_of_suspended_child_returns_terminal_to_parent() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let shell = start_shell(&mut sched, &mut hw, tty(0));
        let child = sched.register(&mut hw, Origin::Child(shell)).unwrap();
        let other = start_shell(&mut sched, &mut hw, tty(1));
        assert_eq!(sched.running(), Some(other));

        let exited = sched.exit_foreground(&mut hw).unwrap();

        assert_eq!(exited.pid, child);
        assert_eq!(exited.parent, Some(shell));
        assert!(!exited.was_running);
        assert_eq!(sched.terminals().owner(tty(0)), Some(shell));
        assert_eq!(sched.running(), Some(other));
    }

    #[test]
    fn test_interrupt_of_running_foreground_owner() {
        let mut sched = Scheduler::new(stack_for);
        let mut hw = MockHardware::new();
        let shell = start_shell(&mut sched, &mut hw, tty(0));

        let exited = sched.exit_foreground(&mut hw).unwrap();
        assert_eq!(exited.pid, shell);
        assert!(exited.was_running);
        assert_eq!(sched.running(), None);

        assert_eq!(
            sched.exit_foreground(&mut hw),
            Err(SchedError::NoOwner(tty(0)))
        );
    }
}
