//! Command surface
//!
//! Text commands are tokenized with shell rules (so countdown titles can be
//! quoted) and parsed into a closed [`Command`] set. Argument syntax is
//! checked here; value ranges are checked by `Settings::validate`.

use pomo_utils::{PomoError, Result};

/// A parsed member command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        focus: Option<i64>,
        short_break: Option<i64>,
        long_break: Option<i64>,
        intervals: Option<i64>,
    },
    Stop,
    Pause,
    Resume,
    Restart,
    Skip,
    Edit {
        focus: i64,
        short_break: Option<i64>,
        long_break: Option<i64>,
        intervals: Option<i64>,
    },
    Countdown {
        minutes: i64,
        title: Option<String>,
        /// Suppress the audio alert at the end
        mute: bool,
    },
    Time,
    Stats,
    Settings,
    Servers,
    /// Toggle direct notifications for the invoking member
    Dm,
    /// Toggle auto-mute for the invoking member, or everyone
    AutoShush {
        everyone: bool,
    },
    Help {
        command: Option<String>,
    },
}

/// Usage line and summary of one command
#[derive(Debug, Clone, Copy)]
pub struct CommandHelp {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "start",
        usage: "start [focus] [short_break] [long_break] [intervals]",
        summary: "Start a pomodoro session (durations in minutes)",
    },
    CommandHelp {
        name: "stop",
        usage: "stop",
        summary: "End the current session",
    },
    CommandHelp {
        name: "pause",
        usage: "pause",
        summary: "Pause the timer",
    },
    CommandHelp {
        name: "resume",
        usage: "resume",
        summary: "Resume a paused timer",
    },
    CommandHelp {
        name: "restart",
        usage: "restart",
        summary: "Restart the current interval from its full length",
    },
    CommandHelp {
        name: "skip",
        usage: "skip",
        summary: "Skip to the next interval",
    },
    CommandHelp {
        name: "edit",
        usage: "edit <focus> [short_break] [long_break] [intervals]",
        summary: "Change the session's settings",
    },
    CommandHelp {
        name: "countdown",
        usage: "countdown <minutes> [title] [mute]",
        summary: "Start a one-off countdown",
    },
    CommandHelp {
        name: "time",
        usage: "time",
        summary: "Show the time left in the current interval",
    },
    CommandHelp {
        name: "stats",
        usage: "stats",
        summary: "Show completed focus intervals and minutes",
    },
    CommandHelp {
        name: "settings",
        usage: "settings",
        summary: "Show the session's settings",
    },
    CommandHelp {
        name: "servers",
        usage: "servers",
        summary: "Show how many sessions are running",
    },
    CommandHelp {
        name: "dm",
        usage: "dm",
        summary: "Toggle direct messages when an interval starts",
    },
    CommandHelp {
        name: "autoshush",
        usage: "autoshush [all]",
        summary: "Toggle being muted during focus intervals",
    },
    CommandHelp {
        name: "help",
        usage: "help [command]",
        summary: "Show this list or one command's usage",
    },
];

/// Look up the help entry for `name`
pub fn help_for(name: &str) -> Option<&'static CommandHelp> {
    let name = name.to_ascii_lowercase();
    COMMANDS.iter().find(|c| c.name == name)
}

impl Command {
    /// Parse a command line such as `countdown 10 "Tea time" mute`
    pub fn parse(line: &str) -> Result<Command> {
        let words = shell_words::split(line)
            .map_err(|e| PomoError::validation(format!("could not read command: {}", e)))?;
        let (name, args) = words
            .split_first()
            .ok_or_else(|| PomoError::validation("empty command"))?;
        Self::from_args(name, args)
    }

    /// Build a command from its name and already tokenized arguments
    pub fn from_args(name: &str, args: &[String]) -> Result<Command> {
        let command = match name.to_ascii_lowercase().as_str() {
            "start" => {
                expect_at_most(name, args, 4)?;
                Command::Start {
                    focus: optional_minutes("focus", args.first())?,
                    short_break: optional_minutes("short break", args.get(1))?,
                    long_break: optional_minutes("long break", args.get(2))?,
                    intervals: optional_minutes("intervals", args.get(3))?,
                }
            }
            "stop" => no_args(name, args, Command::Stop)?,
            "pause" => no_args(name, args, Command::Pause)?,
            "resume" => no_args(name, args, Command::Resume)?,
            "restart" => no_args(name, args, Command::Restart)?,
            "skip" => no_args(name, args, Command::Skip)?,
            "edit" => {
                expect_at_most(name, args, 4)?;
                let focus = optional_minutes("focus", args.first())?
                    .ok_or_else(|| usage_error("edit"))?;
                Command::Edit {
                    focus,
                    short_break: optional_minutes("short break", args.get(1))?,
                    long_break: optional_minutes("long break", args.get(2))?,
                    intervals: optional_minutes("intervals", args.get(3))?,
                }
            }
            "countdown" => {
                let (first, rest) = args.split_first().ok_or_else(|| usage_error("countdown"))?;
                let minutes = parse_number("minutes", first)?;

                let mut rest = rest.to_vec();
                let mute = rest
                    .last()
                    .map(|word| word.eq_ignore_ascii_case("mute"))
                    .unwrap_or(false);
                if mute {
                    rest.pop();
                }
                let title = (!rest.is_empty()).then(|| rest.join(" "));
                Command::Countdown { minutes, title, mute }
            }
            "time" => no_args(name, args, Command::Time)?,
            "stats" => no_args(name, args, Command::Stats)?,
            "settings" => no_args(name, args, Command::Settings)?,
            "servers" => no_args(name, args, Command::Servers)?,
            "dm" => no_args(name, args, Command::Dm)?,
            "autoshush" => match args {
                [] => Command::AutoShush { everyone: false },
                [scope] if scope.eq_ignore_ascii_case("all") => Command::AutoShush { everyone: true },
                _ => return Err(usage_error("autoshush")),
            },
            "help" => {
                expect_at_most(name, args, 1)?;
                Command::Help {
                    command: args.first().cloned(),
                }
            }
            other => {
                return Err(PomoError::validation(format!(
                    "unknown command '{}', try 'help'",
                    other
                )))
            }
        };
        Ok(command)
    }

    /// Whether the command changes session state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Time | Command::Stats | Command::Settings | Command::Servers | Command::Help { .. }
        )
    }
}

fn no_args(name: &str, args: &[String], command: Command) -> Result<Command> {
    expect_at_most(name, args, 0)?;
    Ok(command)
}

fn expect_at_most(name: &str, args: &[String], max: usize) -> Result<()> {
    if args.len() > max {
        return Err(usage_error(name));
    }
    Ok(())
}

fn usage_error(name: &str) -> PomoError {
    match help_for(name) {
        Some(help) => PomoError::validation(format!("usage: {}", help.usage)),
        None => PomoError::validation(format!("bad arguments for '{}'", name)),
    }
}

fn optional_minutes(field: &str, word: Option<&String>) -> Result<Option<i64>> {
    word.map(|w| parse_number(field, w)).transpose()
}

fn parse_number(field: &str, word: &str) -> Result<i64> {
    word.parse::<i64>().map_err(|_| {
        PomoError::validation(format!("{} must be a whole number, got '{}'", field, word))
    })
}
