//! Activity sensor debounce and notification.
//!
//! ## Hardware
//!
//! The sensors (PIR or light-curtain) bounce and re-trigger for a while
//! after a hand passes. Every rising edge goes through an
//! [`ActivityFilter`]: an edge is accepted only when it arrives strictly
//! after the cooldown window of the previously accepted one; everything
//! inside the window is swallowed.
//!
//! | Edge at                    | Result    |
//! |----------------------------|-----------|
//! | first edge ever            | accepted  |
//! | `t <= last + cooldown`     | swallowed |
//! | `t >  last + cooldown`     | accepted  |
//!
//! [`ActivityLine`] wraps the filter with the port's registered
//! [`ActivitySink`], and is shared by both port variants.

use std::time::{Duration, Instant, SystemTime};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::app::PortNumber;
use crate::app::events::{ActivityEvent, ActivitySink};
use crate::error::{Error, Result};

/// Pure cooldown filter. Time is passed in so it can be tested exactly.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    cooldown: Duration,
    last: Option<Instant>,
    last_wall: Option<SystemTime>,
}

impl ActivityFilter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
            last_wall: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Feed one rising edge. Returns `true` if it counts as activity.
    pub fn accept(&mut self, now: Instant, wall: SystemTime) -> bool {
        if let Some(last) = self.last {
            let inside = last.checked_add(self.cooldown).is_none_or(|end| now <= end);
            if inside {
                return false;
            }
        }
        self.last = Some(now);
        self.last_wall = Some(wall);
        true
    }

    /// `now < last + cooldown`.
    pub fn is_active(&self, now: Instant) -> bool {
        self.last
            .is_some_and(|last| last.checked_add(self.cooldown).is_none_or(|end| now < end))
    }

    pub fn last_wall(&self) -> Option<SystemTime> {
        self.last_wall
    }
}

/// Debounced activity input of one port.
#[derive(Debug)]
pub struct ActivityLine {
    port: PortNumber,
    filter: Mutex<ActivityFilter>,
    sink: Mutex<Option<ActivitySink>>,
}

impl ActivityLine {
    pub fn new(port: PortNumber, cooldown: Duration) -> Self {
        Self {
            port,
            filter: Mutex::new(ActivityFilter::new(cooldown)),
            sink: Mutex::new(None),
        }
    }

    pub fn register(&self, sink: ActivitySink) -> Result<()> {
        if !sink.is_open() {
            return Err(Error::invalid(format!(
                "activity sink for port {} is closed",
                self.port
            )));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    /// Handle a rising edge on the sensor. Returns whether it was accepted.
    pub fn rising_edge(&self) -> bool {
        let wall = SystemTime::now();
        if !self.filter.lock().accept(Instant::now(), wall) {
            debug!("port {}: edge inside cooldown, ignored", self.port);
            return false;
        }
        debug!("port {}: activity", self.port);
        if let Some(sink) = self.sink.lock().as_ref() {
            let event = ActivityEvent {
                port: self.port,
                at: wall,
            };
            if !sink.notify(event) {
                warn!("port {}: activity dropped, controller not listening", self.port);
            }
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.filter.lock().is_active(Instant::now())
    }

    pub fn last_activity(&self) -> Option<SystemTime> {
        self.filter.lock().last_wall()
    }
}
