//! Port selection controller — the hexagonal core.
//!
//! [`PortSelectionController`] owns every port's [`PortState`], the
//! content map, and the two process guard sets. It exposes a
//! hardware-agnostic command surface; all I/O flows through the
//! [`Port`], [`EventSink`] and [`ContentStore`] traits.
//!
//! ```text
//!  adapters ──select/deselect──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                                │  PortSelectionController │
//!  Port ──ActivitySink──▶ dispatcher ──▶ state · guards     │ ──▶ Port::set_light
//!                                └──────────────────────────┘      (signal / warning)
//! ```
//!
//! ## Locking
//!
//! Each port has its own state lock; there is no lock spanning ports.
//! Lock order is always state → guard set. Signal processes release their
//! guard while holding the state lock, which makes "start a process unless
//! one is running" race-free against a process that is just exiting.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::PortNumber;
use super::content::{ContentEntry, ContentMap, field_placeholder};
use super::events::{ActivityEvent, ActivitySink, StationEvent};
use super::guard::{GuardSet, GuardToken};
use super::ports::{ContentStore, EventSink, Port};
use super::signal::{signal_process, warning_process};
use super::state::{PortSnapshot, PortState};
use crate::config::SignalTiming;
use crate::drivers::task::{PROCESS_STACK_KB, SERVICE_STACK_KB, spawn_named};
use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Shared core
// ───────────────────────────────────────────────────────────────

/// One registry entry: the port plus everything the controller keeps
/// about it.
pub(crate) struct PortSlot {
    pub(crate) port: Arc<dyn Port>,
    pub(crate) state: Mutex<PortState>,
    /// Held by whichever signal/warning process drives the light.
    pub(crate) light_owner: Mutex<()>,
}

impl PortSlot {
    pub(crate) fn is_selected(&self) -> bool {
        self.state.lock().selected
    }
}

struct Shared {
    slots: Vec<PortSlot>,
    index: HashMap<PortNumber, usize>,
    content: RwLock<ContentMap>,
    signalling: GuardSet,
    warning: GuardSet,
    timing: SignalTiming,
    events: Arc<dyn EventSink>,
}

impl Shared {
    fn find(&self, port: PortNumber) -> Option<&PortSlot> {
        self.index.get(&port).map(|i| &self.slots[*i])
    }

    fn slot(&self, port: PortNumber) -> Result<&PortSlot> {
        self.find(port).ok_or_else(|| {
            error!("port number {} does not exist", port);
            Error::NotFound(port)
        })
    }

    fn spawn_signal(self: &Arc<Self>, port: PortNumber, token: GuardToken) {
        let shared = Arc::clone(self);
        let res = spawn_named(format!("signal-p{port}"), PROCESS_STACK_KB, move || {
            if let Some(slot) = shared.find(port) {
                signal_process(slot, &shared.timing, token);
            }
        });
        if let Err(e) = res {
            error!("port {} selected but cannot signal: {}", port, e);
        }
    }

    fn spawn_warning(self: &Arc<Self>, port: PortNumber, token: GuardToken) {
        let shared = Arc::clone(self);
        let res = spawn_named(format!("warning-p{port}"), PROCESS_STACK_KB, move || {
            if let Some(slot) = shared.find(port) {
                warning_process(slot, &shared.timing, token);
            }
        });
        if let Err(e) = res {
            error!("port {}: warning blink not started: {}", port, e);
        }
    }

    fn on_port_activity(self: &Arc<Self>, port: PortNumber) {
        let Some(slot) = self.find(port) else {
            warn!("activity reported by unknown port {}", port);
            return;
        };

        let confirmed = {
            let mut state = slot.state.lock();
            if state.selected {
                state.confirm_pick();
                true
            } else {
                false
            }
        };

        if confirmed {
            info!("activity on port {} caused it to be deselected", port);
            self.events.emit(&StationEvent::PickConfirmed { port });
            return;
        }

        info!(
            "activity on port {} triggered a warning light because it was not selected",
            port
        );
        self.events.emit(&StationEvent::UnsolicitedActivity { port });
        if let Some(token) = self.warning.try_acquire(port) {
            self.spawn_warning(port, token);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// PortSelectionController
// ───────────────────────────────────────────────────────────────

pub struct PortSelectionController {
    shared: Arc<Shared>,
    activity: ActivitySink,
    shutdown: Sender<()>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl PortSelectionController {
    /// Build the controller over `ports` (registry order is kept) and wire
    /// every port's activity into the controller's dispatcher.
    pub fn new(
        ports: Vec<Arc<dyn Port>>,
        timing: SignalTiming,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        timing.validate()?;

        let mut index = HashMap::with_capacity(ports.len());
        let mut slots = Vec::with_capacity(ports.len());
        for port in ports {
            let number = port.number();
            if index.insert(number, slots.len()).is_some() {
                return Err(Error::invalid(format!("port number {number} registered twice")));
            }
            slots.push(PortSlot {
                port,
                state: Mutex::new(PortState::default()),
                light_owner: Mutex::new(()),
            });
        }

        let shared = Arc::new(Shared {
            slots,
            index,
            content: RwLock::new(ContentMap::new()),
            signalling: GuardSet::new("signal"),
            warning: GuardSet::new("warning"),
            timing,
            events,
        });

        let (activity, rx) = ActivitySink::channel();
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);
        let dispatcher = {
            let shared = Arc::clone(&shared);
            let sink = activity.clone();
            spawn_named("activity-dispatch".into(), SERVICE_STACK_KB, move || {
                dispatch(&shared, &rx, &shutdown_rx);
                sink.close();
            })?
        };

        for slot in &shared.slots {
            slot.port.register_activity_callback(activity.clone())?;
        }

        shared.events.emit(&StationEvent::Started {
            ports: shared.slots.len(),
        });
        info!("controller started with {} ports", shared.slots.len());

        Ok(Self {
            shared,
            activity,
            shutdown,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Sink feeding the controller's dispatcher. Ports get a clone at
    /// construction; tests and adapters can push synthetic events into it.
    pub fn activity_sink(&self) -> ActivitySink {
        self.activity.clone()
    }

    /// Port numbers in registry order.
    pub fn port_numbers(&self) -> Vec<PortNumber> {
        self.shared.slots.iter().map(|s| s.port.number()).collect()
    }

    // ── Selection commands ────────────────────────────────────

    /// Select a port and start signalling it. Returns `false` (and logs) on
    /// an unknown port or a non-positive amount.
    pub fn select(&self, port: PortNumber, amount: i64, instructions: &str) -> bool {
        self.try_select(port, amount, instructions).is_ok()
    }

    pub fn try_select(&self, port: PortNumber, amount: i64, instructions: &str) -> Result<()> {
        let slot = self.shared.slot(port)?;
        if amount <= 0 {
            error!("cannot pick negative or zero amount ({}) on port {}", amount, port);
            return Err(Error::invalid(format!("amount must be positive, got {amount}")));
        }
        let amount = u32::try_from(amount).map_err(|_| {
            error!("amount {} on port {} is out of range", amount, port);
            Error::invalid(format!("amount {amount} out of range"))
        })?;

        let token = {
            let mut state = slot.state.lock();
            state.select(amount, instructions);
            self.shared.signalling.try_acquire(port)
        };
        if let Some(token) = token {
            self.shared.spawn_signal(port, token);
        }

        self.shared.events.emit(&StationEvent::Selected {
            port,
            amount,
            instructions: instructions.to_owned(),
        });
        Ok(())
    }

    /// Deselect a port. The signal process notices on its own and fades out.
    pub fn deselect(&self, port: PortNumber, work_finished: bool) -> bool {
        self.try_deselect(port, work_finished).is_ok()
    }

    pub fn try_deselect(&self, port: PortNumber, work_finished: bool) -> Result<()> {
        let slot = self.shared.slot(port)?;
        slot.state.lock().deselect(work_finished);
        self.shared
            .events
            .emit(&StationEvent::Deselected { port, work_finished });
        Ok(())
    }

    /// Mark the work on `port` as done and submitted; also deselects it.
    pub fn work_finished(&self, port: PortNumber) -> bool {
        self.deselect(port, true)
    }

    /// Deselect every port and mark all work finished.
    pub fn deselect_all(&self) -> bool {
        self.port_numbers()
            .into_iter()
            .map(|p| self.deselect(p, true))
            .fold(true, |all, ok| all && ok)
    }

    /// Select the first port (registry order) whose content `name` matches.
    pub fn select_by_content_name(
        &self,
        name: &str,
        amount: i64,
        instructions: &str,
    ) -> (bool, Option<PortNumber>) {
        match self.port_by_content_name(name) {
            Some(port) => (self.select(port, amount, instructions), Some(port)),
            None => {
                warn!("no port holds content named '{}'", name);
                (false, None)
            }
        }
    }

    /// Deselect the first port (registry order) whose content `name` matches.
    pub fn deselect_by_content_name(
        &self,
        name: &str,
        work_finished: bool,
    ) -> (bool, Option<PortNumber>) {
        match self.port_by_content_name(name) {
            Some(port) => (self.deselect(port, work_finished), Some(port)),
            None => (false, None),
        }
    }

    fn port_by_content_name(&self, name: &str) -> Option<PortNumber> {
        let content = self.shared.content.read();
        self.shared
            .slots
            .iter()
            .map(|s| s.port.number())
            .find(|p| content.get(p).and_then(ContentEntry::name) == Some(name))
    }

    // ── Activity ──────────────────────────────────────────────

    /// Reconcile sensor activity with the selection state. Normally driven
    /// by the dispatcher; public so synthetic activity can skip the port.
    pub fn on_port_activity(&self, port: PortNumber) {
        self.shared.on_port_activity(port);
    }

    /// Operator-test injection: trigger the port's own sensor path.
    pub fn simulate_activity(&self, port: PortNumber) -> bool {
        match self.shared.slot(port) {
            Ok(slot) => slot.port.inject_activity(),
            Err(_) => false,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self, port: PortNumber) -> Option<PortState> {
        match self.shared.slot(port) {
            Ok(slot) => Some(slot.state.lock().clone()),
            Err(_) => None,
        }
    }

    /// Every port's state in registry order.
    pub fn ports_state(&self) -> Vec<(PortNumber, PortState)> {
        self.shared
            .slots
            .iter()
            .map(|s| (s.port.number(), s.state.lock().clone()))
            .collect()
    }

    /// The `GetPorts` view: activity and light of every port.
    pub fn ports(&self) -> Vec<PortSnapshot> {
        self.shared
            .slots
            .iter()
            .map(|s| PortSnapshot {
                number: s.port.number(),
                active: s.port.is_active(),
                light: s.port.light(),
                last_activity: s.port.last_activity(),
            })
            .collect()
    }

    pub fn light_level(&self, port: PortNumber) -> Option<u8> {
        self.shared.find(port).map(|s| s.port.light())
    }

    pub fn is_signalling(&self, port: PortNumber) -> bool {
        self.shared.signalling.contains(port)
    }

    pub fn is_warning(&self, port: PortNumber) -> bool {
        self.shared.warning.contains(port)
    }

    // ── Content ───────────────────────────────────────────────

    /// Content entry of `port`; empty when none is recorded.
    pub fn content(&self, port: PortNumber) -> ContentEntry {
        self.shared
            .content
            .read()
            .get(&port)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_content(&self, port: PortNumber, entry: ContentEntry) -> bool {
        self.try_set_content(port, entry).is_ok()
    }

    pub fn try_set_content(&self, port: PortNumber, entry: ContentEntry) -> Result<()> {
        self.shared.slot(port)?;
        self.shared.content.write().insert(port, entry);
        self.shared.events.emit(&StationEvent::ContentChanged { port });
        Ok(())
    }

    /// Replace content from an untyped payload; malformed payloads are
    /// rejected with `InvalidArgument`.
    pub fn set_content_json(&self, port: PortNumber, payload: &Value) -> bool {
        match ContentEntry::from_json(payload) {
            Ok(entry) => self.set_content(port, entry),
            Err(e) => {
                error!("content for port {} rejected: {}", port, e);
                false
            }
        }
    }

    pub fn set_content_field(&self, port: PortNumber, key: &str, value: &str) -> bool {
        self.try_set_content_field(port, key, value).is_ok()
    }

    pub fn try_set_content_field(&self, port: PortNumber, key: &str, value: &str) -> Result<()> {
        self.shared.slot(port)?;
        self.shared
            .content
            .write()
            .entry(port)
            .or_default()
            .set(key, value);
        self.shared.events.emit(&StationEvent::ContentChanged { port });
        Ok(())
    }

    /// One field across every port with content. Missing fields read as
    /// `"?"` for display names and `""` otherwise.
    pub fn content_field_all(&self, key: &str) -> BTreeMap<PortNumber, String> {
        self.shared
            .content
            .read()
            .iter()
            .map(|(port, entry)| {
                let value = entry.get(key).unwrap_or(field_placeholder(key));
                (*port, value.to_owned())
            })
            .collect()
    }

    pub fn content_map(&self) -> ContentMap {
        self.shared.content.read().clone()
    }

    pub fn replace_content_map(&self, map: ContentMap) {
        *self.shared.content.write() = map;
    }

    /// Load a content map through `store` and make it current. An
    /// unreadable file is logged and yields an empty map; the current
    /// content is then left untouched.
    pub fn load_content_map(&self, store: &dyn ContentStore, path: &Path) -> ContentMap {
        match store.load(path) {
            Ok(map) => {
                debug!("content map {} ----> {:?}", path.display(), map);
                self.replace_content_map(map.clone());
                map
            }
            Err(e) => {
                error!(
                    "the content map {} could not be loaded ({}). No content loaded.",
                    path.display(),
                    e
                );
                ContentMap::new()
            }
        }
    }

    pub fn save_content_map(&self, store: &dyn ContentStore, path: &Path) -> Result<PathBuf> {
        let map = self.content_map();
        store.save(path, &map).inspect_err(|e| {
            error!("content map could not be saved to {}: {}", path.display(), e);
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop listening for activity and switch every port off. Idempotent.
    pub fn shutdown(&self) {
        let Some(handle) = self.dispatcher.lock().take() else {
            return;
        };
        let _ = self.shutdown.try_send(());
        if handle.join().is_err() {
            error!("activity dispatcher panicked");
        }
        for slot in &self.shared.slots {
            slot.state.lock().deselect(true);
        }
        info!("controller stopped");
    }
}

impl Drop for PortSelectionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Apply activity events in arrival order until shut down.
fn dispatch(shared: &Arc<Shared>, rx: &Receiver<ActivityEvent>, shutdown: &Receiver<()>) {
    loop {
        crossbeam_channel::select! {
            recv(rx) -> msg => match msg {
                Ok(event) => shared.on_port_activity(event.port),
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
}
