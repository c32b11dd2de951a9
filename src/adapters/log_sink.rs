//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing station events to the `log`
//! facade. A tag server or GUI adapter would implement the same trait.

use log::info;

use crate::app::events::StationEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`StationEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &StationEvent) {
        match event {
            StationEvent::Started { ports } => {
                info!("START | ports={}", ports);
            }
            StationEvent::Selected {
                port,
                amount,
                instructions,
            } => {
                info!(
                    "SELECT | port={} amount={} instructions={:?}",
                    port, amount, instructions
                );
            }
            StationEvent::Deselected {
                port,
                work_finished,
            } => {
                info!("DESELECT | port={} work_finished={}", port, work_finished);
            }
            StationEvent::PickConfirmed { port } => {
                info!("PICK | port={} confirmed by activity", port);
            }
            StationEvent::UnsolicitedActivity { port } => {
                info!("WARN | port={} activity while not selected", port);
            }
            StationEvent::ContentChanged { port } => {
                info!("CONTENT | port={} updated", port);
            }
        }
    }
}
