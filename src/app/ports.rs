//! Port traits — the hexagonal boundary between the controller and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PortSelectionController (domain)
//! ```
//!
//! Driven adapters (pick ports, event sinks, content storage, GPIO banks)
//! implement these traits. The controller consumes them as trait objects,
//! so the domain core never touches hardware directly.
//!
//! Note the naming collision with the station's vocabulary: a *pick port*
//! is a physical connector and is modelled by the [`Port`] trait below;
//! the other traits are ports in the hexagonal sense only.

use std::path::Path;
use std::time::SystemTime;

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use super::PortNumber;
use super::content::ContentMap;
use super::events::{ActivitySink, StationEvent};
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Pick port (driven adapter: connector hardware ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Capability set of one physical connector: an activity sensor with a
/// debounce window and a dimmable indicator light.
///
/// Implementations are shared between the controller, its signal
/// processes, and the port's own sensor task, so every method takes
/// `&self` and implementations use interior mutability.
pub trait Port: Send + Sync {
    /// Stable identity of the connector.
    fn number(&self) -> PortNumber;

    /// Command the light. Input is clamped to 0–100, never rejected.
    fn set_light(&self, level: i32);

    /// Last commanded light level (not read back from hardware).
    fn light(&self) -> u8;

    /// True while inside the cooldown window of the last accepted activation.
    fn is_active(&self) -> bool;

    /// Wall-clock time of the last accepted activation, if any.
    fn last_activity(&self) -> Option<SystemTime>;

    /// Route accepted activations to `sink`, replacing any previous target.
    /// Fails with `InvalidArgument` if the sink is already closed.
    fn register_activity_callback(&self, sink: ActivitySink) -> Result<()>;

    /// Feed a synthetic rising edge through the port's debounce filter,
    /// exactly as the sensor would. Returns whether it was accepted.
    fn inject_activity(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / publishing)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`StationEvent`]s through this port.
/// Called from command callers, the activity dispatcher, and signal
/// processes alike, hence `&self` and `Send + Sync`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &StationEvent);
}

// ───────────────────────────────────────────────────────────────
// Content store port (driven adapter: domain ↔ content map file)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the content map. The document format belongs to the
/// implementation.
pub trait ContentStore {
    /// Read a content map. Missing or unreadable files are `Error::Io`.
    fn load(&self, path: &Path) -> Result<ContentMap>;

    /// Write a content map, returning the path actually written.
    fn save(&self, path: &Path, map: &ContentMap) -> Result<std::path::PathBuf>;
}

// ───────────────────────────────────────────────────────────────
// GPIO bank (driven adapter: board HAL → hardware ports)
// ───────────────────────────────────────────────────────────────

/// Source of pin drivers for hardware ports. A board support crate
/// implements this once; tests implement it with in-memory pins.
pub trait GpioBank {
    type Sensor: InputPin + Send + 'static;
    type Light: SetDutyCycle + Send + 'static;

    /// Configure `pin` as a pulled-down digital input.
    fn sensor(&mut self, pin: u8) -> Result<Self::Sensor>;

    /// Configure `pin` as a PWM output at `freq_hz`, duty 0.
    fn light(&mut self, pin: u8, freq_hz: u32) -> Result<Self::Light>;
}
