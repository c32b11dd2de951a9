//! Inbound activity events and outbound station events.
//!
//! Ports report sensor activity as [`ActivityEvent`]s over an
//! [`ActivitySink`], a channel that ends in the controller's dispatcher.
//! The controller in turn emits [`StationEvent`]s through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on that side
//! decide what to do with them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use crossbeam_channel::{Receiver, Sender};

use super::PortNumber;

/// One accepted (debounced) activation of a port's sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityEvent {
    pub port: PortNumber,
    pub at: SystemTime,
}

impl ActivityEvent {
    pub fn now(port: PortNumber) -> Self {
        Self {
            port,
            at: SystemTime::now(),
        }
    }
}

/// Sending half of the activity channel handed to every port.
///
/// Cloning is cheap; all clones feed the same queue, so the controller
/// sees activity in arrival order across ports.
#[derive(Debug, Clone)]
pub struct ActivitySink {
    tx: Sender<ActivityEvent>,
    open: Arc<AtomicBool>,
}

impl ActivitySink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, Receiver<ActivityEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                tx,
                open: Arc::new(AtomicBool::new(true)),
            },
            rx,
        )
    }

    /// Whether the consumer is still accepting events.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Mark the sink closed for every clone. Called by the consumer when it
    /// stops reading.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Deliver an event. Returns `false` if the consumer has gone away.
    pub fn notify(&self, event: ActivityEvent) -> bool {
        self.is_open() && self.tx.send(event).is_ok()
    }
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    /// The controller is up with this many ports.
    Started { ports: usize },

    /// A port was selected (or re-selected with new parameters).
    Selected {
        port: PortNumber,
        amount: u32,
        instructions: String,
    },

    /// A port was deselected by command.
    Deselected { port: PortNumber, work_finished: bool },

    /// Activity on a selected port: the worker confirmed the pick.
    PickConfirmed { port: PortNumber },

    /// Activity on a port nobody selected.
    UnsolicitedActivity { port: PortNumber },

    /// Content metadata for a port changed.
    ContentChanged { port: PortNumber },
}
