//! GPIO / PWM pin assignments for hardware ports.
//!
//! Single source of truth for the wiring of every connector. The table is
//! loaded once, before any hardware port is constructed, from a JSON
//! document keyed by port number:
//!
//! ```json
//! {
//!   "1": { "sensor_pin": 36, "light_pin": 35 },
//!   "2": { "sensor_pin": 37, "light_pin": 33, "pwm_freq_hz": 500 }
//! }
//! ```
//!
//! A port without an entry, or an entry without a light pin, cannot be
//! built and fails with [`Error::Configuration`].

use std::collections::BTreeMap;
use std::path::Path;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::app::PortNumber;
use crate::error::{Error, Result};

/// LEDC-style base frequency for the indicator lights (1 kHz).
pub const LIGHT_PWM_FREQ_HZ: u32 = 1_000;

fn default_pwm_freq() -> u32 {
    LIGHT_PWM_FREQ_HZ
}

/// Wiring of one connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAssignment {
    /// Digital input: activity sensor, HIGH = activity.
    pub sensor_pin: u8,
    /// PWM output driving the indicator light.
    pub light_pin: Option<u8>,
    #[serde(default = "default_pwm_freq")]
    pub pwm_freq_hz: u32,
}

/// Pin table for the whole rack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinMap {
    entries: BTreeMap<PortNumber, PinAssignment>,
}

impl PinMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: PortNumber, pins: PinAssignment) {
        self.entries.insert(port, pins);
    }

    /// Load the table and log every entry.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("pin configuration {} could not be read: {e}", path.display()))
        })?;
        let map: Self = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("pin configuration {}: {e}", path.display())))?;
        for (port, pins) in &map.entries {
            info!(
                "port {} : sensor_pin = {}, light_pin = {:?}",
                port, pins.sensor_pin, pins.light_pin
            );
        }
        Ok(map)
    }

    /// Wiring for `port`, or a configuration error naming what is missing.
    pub fn lookup(&self, port: PortNumber) -> Result<PinAssignment> {
        let Some(pins) = self.entries.get(&port) else {
            error!("port {} has no pin mapping", port);
            return Err(Error::config(format!("port {port} has no pin mapping")));
        };
        if pins.light_pin.is_none() {
            error!("port {} does not have a light_pin specified", port);
            return Err(Error::config(format!("port {port} has no light_pin")));
        }
        Ok(*pins)
    }

    /// Check every port up front so startup fails before any port is built.
    pub fn require_all(&self, ports: &[PortNumber]) -> Result<()> {
        ports.iter().try_for_each(|p| self.lookup(*p).map(|_| ()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
