//! Station commands and their dispatch onto the controller.
//!
//! These represent actions requested by the outside world (operator
//! console, tag mirror method calls) as one line of text each. Parsing is
//! strict: an unknown verb or a malformed argument is `InvalidArgument`
//! and nothing is executed.
//!
//! ```text
//! select <port> [amount] [instructions…]
//! select-content <name> [amount] [instructions…]
//! deselect <port>
//! finish <port>
//! deselect-all
//! touch <port>
//! content <port>
//! set-field <port> <key> <value…>
//! status
//! ```

use std::fmt;
use std::str::FromStr;

use super::PortNumber;
use super::content::ContentEntry;
use super::controller::PortSelectionController;
use crate::error::{Error, Result};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationCommand {
    /// Select a port for picking.
    Select {
        port: PortNumber,
        amount: i64,
        instructions: String,
    },

    /// Select the first port holding content with this `name`.
    SelectContent {
        name: String,
        amount: i64,
        instructions: String,
    },

    /// Deselect without finishing the work.
    Deselect(PortNumber),

    /// Deselect and mark the work finished.
    Finish(PortNumber),

    DeselectAll,

    /// Simulated sensor activity.
    Touch(PortNumber),

    /// Show a port's content entry.
    Content(PortNumber),

    SetField {
        port: PortNumber,
        key: String,
        value: String,
    },

    Status,
}

impl FromStr for StationCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| Error::invalid("empty command"))?
            .to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        let cmd = match verb.as_str() {
            "select" => {
                let (port, tail) = split_first(&rest, "select needs a port")?;
                let (amount, instructions) = amount_and_text(tail)?;
                Self::Select {
                    port: parse_port(port)?,
                    amount,
                    instructions,
                }
            }
            "select-content" => {
                let (name, tail) = split_first(&rest, "select-content needs a name")?;
                let (amount, instructions) = amount_and_text(tail)?;
                Self::SelectContent {
                    name: name.to_owned(),
                    amount,
                    instructions,
                }
            }
            "deselect" => Self::Deselect(single_port(&rest, "deselect")?),
            "finish" => Self::Finish(single_port(&rest, "finish")?),
            "touch" => Self::Touch(single_port(&rest, "touch")?),
            "content" => Self::Content(single_port(&rest, "content")?),
            "deselect-all" => {
                no_args(&rest, "deselect-all")?;
                Self::DeselectAll
            }
            "status" => {
                no_args(&rest, "status")?;
                Self::Status
            }
            "set-field" => match rest.as_slice() {
                [port, key, value @ ..] if !value.is_empty() => Self::SetField {
                    port: parse_port(port)?,
                    key: (*key).to_owned(),
                    value: value.join(" "),
                },
                _ => return Err(Error::invalid("usage: set-field <port> <key> <value>")),
            },
            other => return Err(Error::invalid(format!("unknown command '{other}'"))),
        };
        Ok(cmd)
    }
}

fn split_first<'a>(words: &'a [&'a str], msg: &str) -> Result<(&'a str, &'a [&'a str])> {
    words
        .split_first()
        .map(|(first, tail)| (*first, tail))
        .ok_or_else(|| Error::invalid(msg))
}

fn parse_port(word: &str) -> Result<PortNumber> {
    word.parse()
        .map_err(|_| Error::invalid(format!("'{word}' is not a port number")))
}

fn single_port(words: &[&str], verb: &str) -> Result<PortNumber> {
    match words {
        [port] => parse_port(port),
        _ => Err(Error::invalid(format!("usage: {verb} <port>"))),
    }
}

fn no_args(words: &[&str], verb: &str) -> Result<()> {
    if words.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid(format!("{verb} takes no arguments")))
    }
}

/// Optional amount (default 1) followed by free-text instructions.
fn amount_and_text(words: &[&str]) -> Result<(i64, String)> {
    match words.split_first() {
        None => Ok((1, String::new())),
        Some((first, tail)) => match first.parse::<i64>() {
            Ok(amount) => Ok((amount, tail.join(" "))),
            Err(_) if first.starts_with(|c: char| c == '-' || c.is_ascii_digit()) => {
                Err(Error::invalid(format!("'{first}' is not an amount")))
            }
            Err(_) => Ok((1, words.join(" "))),
        },
    }
}

// ── Outcomes ──────────────────────────────────────────────────

/// One line of the `status` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub port: PortNumber,
    pub selected: bool,
    pub amount_to_pick: u32,
    pub instructions: String,
    pub work_finished: bool,
    pub active: bool,
    pub light: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Plain success flag of a boolean command.
    Done(bool),
    /// Result of a content-name lookup; `port` is `None` when nothing matched.
    Matched {
        ok: bool,
        port: Option<PortNumber>,
    },
    Content(PortNumber, ContentEntry),
    Status(Vec<StatusRow>),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Done(ok) | Self::Matched { ok, .. } => *ok,
            Self::Content(..) | Self::Status(_) => true,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(true) => write!(f, "ok"),
            Self::Done(false) => write!(f, "failed"),
            Self::Matched { ok, port: Some(p) } => {
                write!(f, "{} (port {p})", if *ok { "ok" } else { "failed" })
            }
            Self::Matched { port: None, .. } => write!(f, "no matching port"),
            Self::Content(port, entry) => {
                write!(f, "port {port}:")?;
                if entry.is_empty() {
                    return write!(f, " (no content)");
                }
                for (key, value) in entry.iter() {
                    write!(f, "\n  {key} = {value}")?;
                }
                Ok(())
            }
            Self::Status(rows) => {
                write!(f, "port  sel  amount  done  active  light  instructions")?;
                for r in rows {
                    write!(
                        f,
                        "\n{:>4}  {:<3}  {:>6}  {:<4}  {:<6}  {:>5}  {}",
                        r.port,
                        yes_no(r.selected),
                        r.amount_to_pick,
                        yes_no(r.work_finished),
                        yes_no(r.active),
                        r.light,
                        r.instructions
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

// ── Dispatch ──────────────────────────────────────────────────

impl PortSelectionController {
    /// Execute one command against the controller.
    pub fn handle_command(&self, cmd: StationCommand) -> CommandOutcome {
        match cmd {
            StationCommand::Select {
                port,
                amount,
                instructions,
            } => CommandOutcome::Done(self.select(port, amount, &instructions)),
            StationCommand::SelectContent {
                name,
                amount,
                instructions,
            } => {
                let (ok, port) = self.select_by_content_name(&name, amount, &instructions);
                CommandOutcome::Matched { ok, port }
            }
            StationCommand::Deselect(port) => CommandOutcome::Done(self.deselect(port, false)),
            StationCommand::Finish(port) => CommandOutcome::Done(self.work_finished(port)),
            StationCommand::DeselectAll => CommandOutcome::Done(self.deselect_all()),
            StationCommand::Touch(port) => CommandOutcome::Done(self.simulate_activity(port)),
            StationCommand::Content(port) => match self.state(port) {
                Some(_) => CommandOutcome::Content(port, self.content(port)),
                None => CommandOutcome::Done(false),
            },
            StationCommand::SetField { port, key, value } => {
                CommandOutcome::Done(self.set_content_field(port, &key, &value))
            }
            StationCommand::Status => {
                let states = self.ports_state();
                let rows = self
                    .ports()
                    .into_iter()
                    .zip(states)
                    .map(|(snap, (_, state))| StatusRow {
                        port: snap.number,
                        selected: state.selected,
                        amount_to_pick: state.amount_to_pick,
                        instructions: state.select_instructions,
                        work_finished: state.work_finished,
                        active: snap.active,
                        light: snap.light,
                    })
                    .collect();
                CommandOutcome::Status(rows)
            }
        }
    }
}
