//! Line commands for the interactive player.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Prev,
    Shuffle,
    Repeat,
    Volume(f64),
    Mute,
    Seek(f64),
    Track(String),
    Status,
    Footer,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{0}` is not a number between 0 and 1")]
    BadFraction(String),
}

pub const HELP: &str = "play | pause | toggle | next | prev | shuffle | repeat | vol <0..1> | mute | seek <0..1> | track <id> | status | footer | quit";

impl FromStr for ShellCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let arg = words.next();

        let command = match head.to_ascii_lowercase().as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "toggle" | "p" => Self::Toggle,
            "next" | "n" => Self::Next,
            "prev" | "b" => Self::Prev,
            "shuffle" | "s" => Self::Shuffle,
            "repeat" | "r" => Self::Repeat,
            "vol" | "volume" => Self::Volume(fraction("vol", arg)?),
            "mute" | "m" => Self::Mute,
            "seek" => Self::Seek(fraction("seek", arg)?),
            "track" => Self::Track(
                arg.ok_or(ParseCommandError::MissingArgument("track"))?
                    .to_string(),
            ),
            "status" => Self::Status,
            "footer" => Self::Footer,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Accepts `0.4` as well as `40%`.
fn fraction(name: &'static str, arg: Option<&str>) -> Result<f64, ParseCommandError> {
    let raw = arg.ok_or(ParseCommandError::MissingArgument(name))?;
    let value = match raw.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().map(|p| p / 100.0),
        None => raw.parse::<f64>(),
    };
    value
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseCommandError::BadFraction(raw.to_string()))
}
