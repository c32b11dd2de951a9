//! Simulated pick port.
//!
//! Acts like the real connector but keeps the light level in memory and
//! logs it instead of driving a PWM channel. Activity is produced with
//! [`Port::inject_activity`], which runs through the same debounce filter
//! as a hardware edge.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime};

use log::debug;

use crate::app::PortNumber;
use crate::app::events::ActivitySink;
use crate::app::ports::Port;
use crate::drivers::debounce::ActivityLine;
use crate::error::Result;

/// Minimum change in light level before the simulation logs it again.
const LOG_STEP: u8 = 10;

pub struct SimulatedPort {
    number: PortNumber,
    activity: ActivityLine,
    light: AtomicU8,
    last_logged: AtomicU8,
}

impl SimulatedPort {
    pub fn new(number: PortNumber, cooldown: Duration) -> Self {
        Self {
            number,
            activity: ActivityLine::new(number, cooldown),
            light: AtomicU8::new(0),
            last_logged: AtomicU8::new(0),
        }
    }
}

impl Port for SimulatedPort {
    fn number(&self) -> PortNumber {
        self.number
    }

    fn set_light(&self, level: i32) {
        let level = clamp_level(level);
        self.light.store(level, Ordering::Release);
        let last = self.last_logged.load(Ordering::Relaxed);
        if level.abs_diff(last) >= LOG_STEP || (level == 0 && last != 0) {
            self.last_logged.store(level, Ordering::Relaxed);
            debug!("light on port {} set to {}", self.number, level);
        }
    }

    fn light(&self) -> u8 {
        self.light.load(Ordering::Acquire)
    }

    fn is_active(&self) -> bool {
        self.activity.is_active()
    }

    fn last_activity(&self) -> Option<SystemTime> {
        self.activity.last_activity()
    }

    fn register_activity_callback(&self, sink: ActivitySink) -> Result<()> {
        self.activity.register(sink)
    }

    fn inject_activity(&self) -> bool {
        self.activity.rising_edge()
    }
}

/// Clamp a requested light level into 0–100.
pub fn clamp_level(level: i32) -> u8 {
    level.clamp(0, 100) as u8
}
