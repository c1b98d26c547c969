//! Built-in shell commands.
//!
//! Parsing only; the shell carries them out.

/// Shell command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Display help information.
    Help,
    /// Clear the screen.
    Clear,
    /// Echo text.
    Echo {
        /// The text to echo.
        text: &'a str,
    },
    /// List live processes.
    Ps,
    /// Move keyboard input to another terminal.
    Fg {
        /// Raw terminal index, range-checked by the shell.
        terminal: usize,
    },
    /// Start a child shell that takes over this terminal.
    Sh,
    /// End this shell.
    Exit {
        /// Reported exit status.
        status: u32,
    },
    /// A known command with malformed arguments.
    Usage(&'static str),
    /// Unknown command.
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    /// Parse a command from an input line. Blank lines yield `None`.
    pub fn parse(line: &'a str) -> Option<Command<'a>> {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };
        let command = match cmd {
            "" => return None,
            "help" | "?" => Command::Help,
            "clear" | "cls" => Command::Clear,
            "echo" => Command::Echo { text: rest },
            "ps" => Command::Ps,
            "fg" => match rest.parse() {
                Ok(terminal) => Command::Fg { terminal },
                Err(_) => Command::Usage("fg <terminal>"),
            },
            "sh" | "shell" => Command::Sh,
            "exit" => match rest {
                "" => Command::Exit { status: 0 },
                code => match code.parse() {
                    Ok(status) => Command::Exit { status },
                    Err(_) => Command::Usage("exit [status]"),
                },
            },
            _ => Command::Unknown(cmd),
        };
        Some(command)
    }
}
