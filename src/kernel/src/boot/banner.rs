//! Boot banner and branding.

use crate::arch::x86_64::vga::{self, Color};
use crate::config::{MAX_PROCESSES, NUM_TERMINALS};
use crate::println;

/// Print the Loom OS boot banner.
pub fn print_banner() {
    vga::set_color(Color::Cyan, Color::Black);
    println!("  _                          ___  ____  ");
    println!(" | |    ___   ___  _ __ ___ / _ \\/ ___| ");
    println!(" | |   / _ \\ / _ \\| '_ ` _ \\ | | \\___ \\ ");
    println!(" | |__| (_) | (_) | | | | | | |_| |___) |");
    println!(" |_____\\___/ \\___/|_| |_| |_|\\___/|____/ ");
    println!();
    vga::set_color(Color::White, Color::Black);
    println!(
        " Loom OS v0.1.0 ({} terminals, {} processes)",
        NUM_TERMINALS, MAX_PROCESSES
    );
    println!();
}
