//! Station configuration parameters
//!
//! All tunable parameters for the pick-by-light station. Loaded from a
//! JSON document at startup; every field has a default so a partial file
//! (or no file at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::PortNumber;
use crate::error::{Error, Result};

/// Core station configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    // --- Registry ---
    /// Port numbers in registry order
    pub ports: Vec<PortNumber>,

    // --- Sensors ---
    /// Debounce window between two accepted activations (milliseconds)
    pub activity_cooldown_ms: u64,
    /// Sample interval of the hardware sensor edge watcher (milliseconds)
    pub sensor_poll_ms: u64,

    // --- Files ---
    /// Content map loaded at startup
    pub content_map_path: PathBuf,
    /// Pin mapping for hardware ports; not needed for simulated ports
    pub pin_map_path: Option<PathBuf>,

    // --- Adapters ---
    /// Refresh interval of the tag mirror (milliseconds)
    pub tag_poll_ms: u64,

    // --- Light signalling ---
    pub timing: SignalTiming,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            ports: (1..=6).collect(),
            activity_cooldown_ms: 5000,
            sensor_poll_ms: 5,
            content_map_path: PathBuf::from("content_map.json"),
            pin_map_path: None,
            tag_poll_ms: 100,
            timing: SignalTiming::default(),
        }
    }
}

impl StationConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would leave the station unusable.
    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            return Err(Error::config("no ports configured"));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.ports.iter().find(|p| !seen.insert(**p)) {
            return Err(Error::config(format!("port {dup} listed twice")));
        }
        if self.activity_cooldown_ms == 0 {
            return Err(Error::config("activity_cooldown_ms must be > 0"));
        }
        if self.sensor_poll_ms == 0 || self.tag_poll_ms == 0 {
            return Err(Error::config("poll intervals must be > 0"));
        }
        self.timing.validate()
    }

    pub fn activity_cooldown(&self) -> Duration {
        Duration::from_millis(self.activity_cooldown_ms)
    }

    pub fn sensor_poll(&self) -> Duration {
        Duration::from_millis(self.sensor_poll_ms)
    }

    pub fn tag_poll(&self) -> Duration {
        Duration::from_millis(self.tag_poll_ms)
    }
}

/// Timing of the attract (signal) and warning light patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    /// Delay between two brightness steps while ramping
    pub ramp_step_ms: u64,
    /// Length of one hold slice at peak brightness
    pub hold_slice_ms: u64,
    /// Number of hold slices per cycle
    pub hold_slices: u32,
    /// Length of one pause slice between cycles
    pub pause_slice_ms: u64,
    /// Number of pause slices per cycle
    pub pause_slices: u32,
    /// Warning blink: light on
    pub blink_on_ms: u64,
    /// Warning blink: light off
    pub blink_off_ms: u64,
    /// Warning blink: maximum repetitions
    pub blink_repetitions: u32,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            ramp_step_ms: 5,    // 101 steps ≈ 0.5 s
            hold_slice_ms: 100, // 30 slices = 3 s
            hold_slices: 30,
            pause_slice_ms: 100,
            pause_slices: 2,
            blink_on_ms: 100,
            blink_off_ms: 250,
            blink_repetitions: 5,
        }
    }
}

impl SignalTiming {
    pub fn validate(&self) -> Result<()> {
        if self.ramp_step_ms == 0 || self.hold_slice_ms == 0 || self.pause_slice_ms == 0 {
            return Err(Error::config("signal slices must be > 0 ms"));
        }
        if self.blink_on_ms == 0 || self.blink_off_ms == 0 {
            return Err(Error::config("blink phases must be > 0 ms"));
        }
        Ok(())
    }

    pub fn ramp_step(&self) -> Duration {
        Duration::from_millis(self.ramp_step_ms)
    }

    pub fn hold_slice(&self) -> Duration {
        Duration::from_millis(self.hold_slice_ms)
    }

    pub fn pause_slice(&self) -> Duration {
        Duration::from_millis(self.pause_slice_ms)
    }

    pub fn blink_on(&self) -> Duration {
        Duration::from_millis(self.blink_on_ms)
    }

    pub fn blink_off(&self) -> Duration {
        Duration::from_millis(self.blink_off_ms)
    }

    /// Longest a deselected signal process keeps the light: one hold or
    /// pause slice to notice, then a full down-ramp. Doubled for sleep
    /// overshoot.
    pub fn release_bound(&self) -> Duration {
        let notice = self.hold_slice().max(self.pause_slice());
        (notice + self.ramp_step() * 102) * 2
    }
}
