//! In-kernel program loader and teardown path.
//!
//! The only program is the built-in shell. Starting one registers a PCB,
//! lays out an initial frame on the new pid's privileged stack and switches
//! into it; the starting context is suspended like any preempted one and
//! resumes when the scheduler next picks it.
//!
//! Every frame exchange here happens with the scheduler lock held, as in
//! `Scheduler::switch_to`. Whichever context resumes releases it.

use super::{context, gdt, X86Machine};
use crate::config::SHELL_PROGRAM;
use crate::sched::{Exited, Origin, Scheduler, SCHEDULER};
use log::{error, info, warn};
use loom_common::{ExitStatus, SchedError, TerminalId};
use x86_64::instructions::interrupts;

/// Makes this module the kernel's loader and teardown path.
pub fn install() {
    crate::process::install(launch, terminate);
}

fn launch(program: &str, terminal: TerminalId) {
    if program != SHELL_PROGRAM {
        warn!("unknown program {:?} for {}", program, terminal);
    } else if let Err(e) = spawn_shell(Origin::Root(terminal)) {
        error!("cannot start {} on {}: {}", program, terminal, e);
    } else {
        return;
    }
    if let Some(scheduler) = SCHEDULER.get() {
        interrupts::without_interrupts(|| scheduler.lock().cancel_launch(terminal));
    }
}

/// Starts a shell for `origin`: the root shell of a vacant terminal, or a
/// child of a running shell.
///
/// Returns once the calling context is resumed by the scheduler; for a
/// parent, that is when the child has exited.
pub fn spawn_shell(origin: Origin) -> Result<(), SchedError> {
    let scheduler = SCHEDULER.get().ok_or(SchedError::NotRunning)?;
    interrupts::disable();
    let mut sched = scheduler.lock();
    let mut machine = X86Machine::new();

    let save = sched.suspend_slot();
    let pid = match sched.register(&mut machine, origin) {
        Ok(pid) => pid,
        Err(e) => {
            drop(sched);
            interrupts::enable();
            return Err(e);
        }
    };
    // SAFETY: the pid was just allocated, so its privileged stack is unused.
    let anchor = unsafe { context::initial_frame(gdt::privileged_stack_for(pid).top, shell_entry) };
    info!("starting {} as {} ({:?})", SHELL_PROGRAM, pid, origin);

    // SAFETY: interrupts are off and `save` points into the scheduler, which
    // is static.
    unsafe { context::swap_frames(save, anchor) };

    drop(sched);
    interrupts::enable();
    Ok(())
}

extern "C" fn shell_entry() -> ! {
    if let Some(scheduler) = SCHEDULER.get() {
        // SAFETY: the context that switched here holds the lock for us.
        unsafe { scheduler.force_unlock() };
    }
    interrupts::enable();
    crate::terminal::shell::run()
}

/// Ends the process owning the foreground terminal, as the keyboard
/// interrupt combination asks. If that is not the running process, the
/// running one carries on and the victim is never resumed.
fn terminate(status: ExitStatus) {
    retire(status, |sched, machine| sched.exit_foreground(machine));
}

/// Ends the running process with `status`, as its own `exit` asks.
pub fn exit(status: ExitStatus) {
    retire(status, |sched, machine| sched.exit_running(machine));
}

/// Removes a process chosen by `select` and, if it was on the CPU,
/// resumes whatever the scheduler marks running next: the parent, or the
/// idle boot context.
fn retire<F>(status: ExitStatus, select: F)
where
    F: FnOnce(&mut Scheduler, &mut X86Machine) -> Result<Exited, SchedError>,
{
    let Some(scheduler) = SCHEDULER.get() else {
        return;
    };
    interrupts::disable();
    let mut sched = scheduler.lock();
    let mut machine = X86Machine::new();

    let exited = match select(&mut *sched, &mut machine) {
        Ok(exited) => exited,
        Err(e) => {
            warn!("exit with status {} ignored: {}", status.code(), e);
            drop(sched);
            interrupts::enable();
            return;
        }
    };
    if status.is_interrupted() {
        info!("{} interrupted, parent {:?}", exited.pid, exited.parent);
    } else {
        info!("{} exited with status {}, parent {:?}", exited.pid, status.code(), exited.parent);
    }

    if !exited.was_running {
        drop(sched);
        interrupts::enable();
        return;
    }

    let next = sched.resume_anchor();
    if next == 0 {
        error!("nothing to resume after {} exited", exited.pid);
        super::halt_loop();
    }
    let mut discarded = 0usize;
    // SAFETY: interrupts are off; the exited context is never resumed, so
    // its anchor may land on this dying stack.
    unsafe { context::swap_frames(&mut discarded, next) };
    error!("exited context was resumed");
    super::halt_loop();
}
