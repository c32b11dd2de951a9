//! Tag mirror — the station as a flat table of named tags.
//!
//! Mirrors the controller into tags a network tag server can publish.
//! No wire protocol lives here; a server adapter reads and writes through
//! [`TagMirror::read`] / [`TagMirror::write`] / [`TagMirror::call`].
//!
//! | Tag                                   | Access | Type  |
//! |---------------------------------------|--------|-------|
//! | `Status.Port_<n>.Selected`            | rw     | bool  |
//! | `Status.Port_<n>.Activity`            | ro     | bool  |
//! | `Status.Port_<n>.ActivityTimestamp`   | ro     | int (unix ms, 0 = never) |
//! | `Status.Port_<n>.LightState`          | ro     | int   |
//! | `Status.Port_<n>.ContentDisplayName`  | rw     | text  |
//! | `Status.Port_<n>.ContentName`         | rw     | text  |
//! | `Status.Port_<n>.ContentDescription`  | rw     | text  |
//! | `Status.Port_<n>.ContentImagePath`    | rw     | text  |
//!
//! Writes reach the controller only when the value differs from the
//! controller's current one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{RecvTimeoutError, Sender};
use log::{debug, error, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::app::PortNumber;
use crate::app::PortSelectionController;
use crate::app::commands::{CommandOutcome, StationCommand};
use crate::app::content::{FIELD_DESCRIPTION, FIELD_DISPLAY_NAME, FIELD_IMAGE_PATH, FIELD_NAME};
use crate::drivers::task::{SERVICE_STACK_KB, spawn_named};
use crate::error::{Error, Result};

const PREFIX: &str = "Status.Port_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Per-port tag leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Selected,
    Activity,
    ActivityTimestamp,
    LightState,
    Content(&'static str),
}

impl Leaf {
    const ALL: [Leaf; 8] = [
        Leaf::Selected,
        Leaf::Activity,
        Leaf::ActivityTimestamp,
        Leaf::LightState,
        Leaf::Content(FIELD_DISPLAY_NAME),
        Leaf::Content(FIELD_NAME),
        Leaf::Content(FIELD_DESCRIPTION),
        Leaf::Content(FIELD_IMAGE_PATH),
    ];

    fn name(self) -> &'static str {
        match self {
            Leaf::Selected => "Selected",
            Leaf::Activity => "Activity",
            Leaf::ActivityTimestamp => "ActivityTimestamp",
            Leaf::LightState => "LightState",
            Leaf::Content(FIELD_DISPLAY_NAME) => "ContentDisplayName",
            Leaf::Content(FIELD_NAME) => "ContentName",
            Leaf::Content(FIELD_DESCRIPTION) => "ContentDescription",
            Leaf::Content(_) => "ContentImagePath",
        }
    }

    fn writable(self) -> bool {
        matches!(self, Leaf::Selected | Leaf::Content(_))
    }
}

fn tag_name(port: PortNumber, leaf: Leaf) -> String {
    format!("{PREFIX}{port}.{}", leaf.name())
}

/// Split `Status.Port_<n>.<Leaf>`.
fn parse_tag(tag: &str) -> Option<(PortNumber, Leaf)> {
    let (port, leaf) = tag.strip_prefix(PREFIX)?.split_once('.')?;
    let port = port.parse().ok()?;
    let leaf = Leaf::ALL.into_iter().find(|l| l.name() == leaf)?;
    Some((port, leaf))
}

fn unix_millis(t: Option<SystemTime>) -> i64 {
    t.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

pub struct TagMirror {
    controller: Arc<PortSelectionController>,
    tags: RwLock<BTreeMap<String, TagValue>>,
}

impl TagMirror {
    /// Build the table and fill it once.
    pub fn new(controller: Arc<PortSelectionController>) -> Self {
        let mirror = Self {
            controller,
            tags: RwLock::new(BTreeMap::new()),
        };
        mirror.refresh();
        mirror
    }

    /// Re-read every tag from the controller.
    pub fn refresh(&self) {
        let snapshots = self.controller.ports();
        let states = self.controller.ports_state();
        let mut fresh = BTreeMap::new();
        for (snap, (_, state)) in snapshots.iter().zip(states) {
            let port = snap.number;
            let content = self.controller.content(port);
            for leaf in Leaf::ALL {
                let value = match leaf {
                    Leaf::Selected => TagValue::Bool(state.selected),
                    Leaf::Activity => TagValue::Bool(snap.active),
                    Leaf::ActivityTimestamp => TagValue::Int(unix_millis(snap.last_activity)),
                    Leaf::LightState => TagValue::Int(i64::from(snap.light)),
                    Leaf::Content(key) => TagValue::Text(content.get(key).unwrap_or("").to_owned()),
                };
                fresh.insert(tag_name(port, leaf), value);
            }
        }
        *self.tags.write() = fresh;
    }

    pub fn read(&self, tag: &str) -> Option<TagValue> {
        self.tags.read().get(tag).cloned()
    }

    /// Copy of the whole table.
    pub fn snapshot(&self) -> BTreeMap<String, TagValue> {
        self.tags.read().clone()
    }

    /// Client write. Read-only and unknown tags are rejected; a value equal
    /// to the controller's current one is accepted without a command.
    pub fn write(&self, tag: &str, value: TagValue) -> Result<()> {
        let Some((port, leaf)) = parse_tag(tag).filter(|_| self.tags.read().contains_key(tag))
        else {
            warn!("write to unknown tag {}", tag);
            return Err(Error::invalid(format!("unknown tag {tag}")));
        };
        if !leaf.writable() {
            return Err(Error::invalid(format!("tag {tag} is read-only")));
        }

        match (leaf, &value) {
            (Leaf::Selected, TagValue::Bool(selected)) => {
                let current = self
                    .controller
                    .state(port)
                    .ok_or(Error::NotFound(port))?
                    .selected;
                if current != *selected {
                    debug!("tag {} -> {}", tag, selected);
                    if *selected {
                        self.controller.try_select(port, 1, "")?;
                    } else {
                        self.controller.try_deselect(port, false)?;
                    }
                }
            }
            (Leaf::Content(key), TagValue::Text(text)) => {
                if self.controller.content(port).get(key).unwrap_or("") != text.as_str() {
                    debug!("tag {} -> {:?}", tag, text);
                    self.controller.try_set_content_field(port, key, text)?;
                }
            }
            _ => return Err(Error::invalid(format!("wrong value type for tag {tag}"))),
        }

        self.tags.write().insert(tag.to_owned(), value);
        Ok(())
    }

    /// Method call from a tag client: `SelectPort(port[, amount[, instructions]])`,
    /// `DeselectPort(port)` or `DeselectAllPorts()`.
    pub fn call(&self, method: &str, args: &[&str]) -> Result<CommandOutcome> {
        let cmd: StationCommand = match (method, args) {
            ("SelectPort", [port, rest @ ..]) if rest.len() <= 2 => {
                let port = port
                    .parse()
                    .map_err(|_| Error::invalid(format!("'{port}' is not a port number")))?;
                let amount = match rest.first() {
                    Some(a) => a
                        .parse()
                        .map_err(|_| Error::invalid(format!("'{a}' is not an amount")))?,
                    None => 1,
                };
                StationCommand::Select {
                    port,
                    amount,
                    instructions: rest.get(1).map(|s| (*s).to_owned()).unwrap_or_default(),
                }
            }
            ("DeselectPort", [port]) => format!("deselect {port}").parse()?,
            ("DeselectAllPorts", []) => StationCommand::DeselectAll,
            _ => return Err(Error::invalid(format!("unsupported call {method}/{}", args.len()))),
        };
        let outcome = self.controller.handle_command(cmd);
        self.refresh();
        Ok(outcome)
    }

    /// Keep the table fresh from a background thread.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> Result<TagPoller> {
        let (stop, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let mirror = Arc::clone(self);
        let handle = spawn_named("tag-poller".into(), SERVICE_STACK_KB, move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => mirror.refresh(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        })?;
        Ok(TagPoller {
            stop,
            handle: Some(handle),
        })
    }
}

/// Running poller; stops and joins on drop.
pub struct TagPoller {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for TagPoller {
    fn drop(&mut self) {
        let _ = self.stop.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("tag poller panicked");
            }
        }
    }
}
