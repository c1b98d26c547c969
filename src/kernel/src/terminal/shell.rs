//! The built-in shell started on every vacant terminal.
//!
//! A shell only prompts and reads while it owns the foreground terminal;
//! otherwise it idles until the next interrupt.

use super::{read_line, Command};
use crate::arch::x86_64::vga::{self, Color};
use crate::arch::x86_64::{halt_loop, hlt, loader};
use crate::config::{LINE_BUFFER_SIZE, MAX_PROCESSES};
use crate::sched::{Origin, SCHEDULER};
use crate::{print, println};
use loom_common::{ExitStatus, Pid, TerminalId};
use x86_64::instructions::interrupts::without_interrupts;

/// Runs the shell of the process that is running now.
pub fn run() -> ! {
    let Some(pid) = without_interrupts(|| SCHEDULER.get().and_then(|s| s.lock().running())) else {
        halt_loop();
    };
    let mut buf = [0u8; LINE_BUFFER_SIZE];
    loop {
        let Some(terminal) = foreground_of(pid) else {
            hlt();
            continue;
        };
        prompt(terminal);
        let len = read_line(terminal, &mut buf);
        let line = core::str::from_utf8(&buf[..len]).unwrap_or("");
        if let Some(command) = Command::parse(line) {
            execute(command, pid);
        }
    }
}

/// The foreground terminal, if `pid` owns it.
fn foreground_of(pid: Pid) -> Option<TerminalId> {
    without_interrupts(|| {
        let sched = SCHEDULER.get()?.lock();
        let terminal = sched.terminals().foreground();
        (sched.terminals().owner(terminal) == Some(pid)).then_some(terminal)
    })
}

fn prompt(terminal: TerminalId) {
    vga::set_color(Color::LightGreen, Color::Black);
    print!("loom:{}", terminal);
    vga::set_color(Color::White, Color::Black);
    print!("> ");
}

fn execute(command: Command<'_>, pid: Pid) {
    match command {
        Command::Help => cmd_help(),
        Command::Clear => vga::clear_screen(),
        Command::Echo { text } => println!("{}", text),
        Command::Ps => cmd_ps(),
        Command::Fg { terminal } => cmd_fg(terminal),
        Command::Sh => {
            if let Err(e) = loader::spawn_shell(Origin::Child(pid)) {
                println!("sh: {}", e);
            }
        }
        Command::Exit { status } => loader::exit(ExitStatus::new(status)),
        Command::Usage(usage) => println!("usage: {}", usage),
        Command::Unknown(cmd) => {
            vga::set_color(Color::LightRed, Color::Black);
            println!("Unknown command: {}", cmd);
            vga::set_color(Color::White, Color::Black);
            println!("Type 'help' for available commands.");
        }
    }
}

fn cmd_help() {
    println!();
    vga::set_color(Color::Cyan, Color::Black);
    println!("Loom OS Shell Commands");
    println!("======================");
    vga::set_color(Color::White, Color::Black);
    println!();
    println!("  help          Show this help message");
    println!("  clear         Clear the screen (also Ctrl+L)");
    println!("  echo <text>   Echo text to console");
    println!("  ps            List processes");
    println!("  fg <n>        Send keyboard input to terminal n");
    println!("  sh            Start a child shell on this terminal");
    println!("  exit [code]   End this shell (Ctrl+C ends the foreground one)");
    println!();
}

fn cmd_ps() {
    let mut rows = [None; MAX_PROCESSES];
    without_interrupts(|| {
        let Some(scheduler) = SCHEDULER.get() else {
            return;
        };
        let sched = scheduler.lock();
        for (row, pcb) in rows.iter_mut().zip(sched.processes().live()) {
            let terminal = sched.terminals().terminal_of(pcb.pid, sched.processes());
            *row = Some((pcb.pid, pcb.parent, terminal));
        }
    });

    println!("  PID  PARENT  TTY");
    for (pid, parent, terminal) in rows.into_iter().flatten() {
        print!("  {:<4} ", pid.index());
        match parent {
            Some(parent) => print!("{:<7} ", parent.index()),
            None => print!("{:<7} ", "-"),
        }
        match terminal {
            Some(terminal) => println!("{}", terminal),
            None => println!("-"),
        }
    }
}

fn cmd_fg(raw: usize) {
    let switched = without_interrupts(|| {
        let mut sched = SCHEDULER.get()?.lock();
        let terminal = sched.terminals().id(raw)?;
        sched.terminals_mut().set_foreground(terminal);
        Some(terminal)
    });
    match switched {
        Some(terminal) => println!("input now goes to {}", terminal),
        None => println!("fg: no terminal {}", raw),
    }
}
