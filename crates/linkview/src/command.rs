//! Line-oriented control commands read by the binary.

use std::str::FromStr;

use crate::session::ControlEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `set <dimension> <value>`
    Set { dimension: String, value: String },
    /// `select <i,j,...>`
    Select(Vec<usize>),
    /// `clear`
    Clear,
    /// `options <dimension>`
    Options(String),
    /// `wait`
    Wait,
    /// `show`
    Show,
    /// `payload`
    Payload,
    /// `stats`
    Stats,
    /// `quit`
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError(pub String);

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CommandError {}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        match word {
            "set" => {
                let (dimension, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| CommandError("usage: set <dimension> <value>".into()))?;
                Ok(Command::Set {
                    dimension: dimension.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "select" => rest
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse()
                        .map_err(|_| CommandError(format!("not a row index: {s}")))
                })
                .collect::<Result<Vec<usize>, _>>()
                .map(Command::Select),
            "clear" => Ok(Command::Clear),
            "options" if !rest.is_empty() => Ok(Command::Options(rest.to_string())),
            "options" => Err(CommandError("usage: options <dimension>".into())),
            "wait" => Ok(Command::Wait),
            "show" => Ok(Command::Show),
            "payload" => Ok(Command::Payload),
            "stats" => Ok(Command::Stats),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError(format!("unknown command: {other}"))),
        }
    }
}

impl Command {
    /// The control event this command feeds the dashboard, if any.
    pub fn event(&self) -> Option<ControlEvent> {
        match self {
            Command::Set { dimension, value } => Some(ControlEvent::ParameterChanged {
                dimension: dimension.clone(),
                value: value.clone(),
            }),
            Command::Select(indices) => Some(ControlEvent::SelectionChanged {
                indices: indices.clone(),
            }),
            Command::Clear => Some(ControlEvent::ClearSelection),
            _ => None,
        }
    }
}
