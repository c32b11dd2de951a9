//! Hardware pick port: GPIO activity sensor + PWM indicator light.
//!
//! ## Hardware
//!
//! Sensor is a digital input with pull-down, HIGH while activity is
//! detected. A dedicated watcher thread samples it every
//! `sensor_poll` and feeds each LOW→HIGH transition into the port's
//! [`ActivityLine`] debounce filter. The light is a PWM channel whose duty
//! cycle in percent equals the commanded light level.
//!
//! ## Construction
//!
//! Pins come from the [`PinMap`] loaded at startup; a port without a
//! mapping fails with [`Error::Configuration`](crate::error::Error) before
//! any pin is touched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};
use parking_lot::Mutex;

use crate::app::PortNumber;
use crate::app::events::ActivitySink;
use crate::app::ports::{GpioBank, Port};
use crate::drivers::debounce::ActivityLine;
use crate::drivers::sim_port::clamp_level;
use crate::drivers::task::{SERVICE_STACK_KB, spawn_named};
use crate::error::{Error, Result};
use crate::pins::{PinAssignment, PinMap};

pub struct HardwarePort<L> {
    number: PortNumber,
    pins: PinAssignment,
    activity: Arc<ActivityLine>,
    light: Mutex<L>,
    level: AtomicU8,
    stop: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl<L> HardwarePort<L>
where
    L: SetDutyCycle + Send + 'static,
{
    /// Claim the pins for `number` from `bank` and start the sensor watcher.
    pub fn open<B>(
        number: PortNumber,
        pin_map: &PinMap,
        bank: &mut B,
        cooldown: Duration,
        sensor_poll: Duration,
    ) -> Result<Self>
    where
        B: GpioBank<Light = L>,
    {
        let pins = pin_map.lookup(number)?;
        let light_pin = pins
            .light_pin
            .ok_or_else(|| Error::config(format!("port {number} has no light_pin")))?;

        let sensor = bank.sensor(pins.sensor_pin)?;
        let mut light = bank.light(light_pin, pins.pwm_freq_hz)?;
        light.set_duty_cycle_fully_off().map_err(|e| {
            Error::config(format!("port {number}: PWM on pin {light_pin} rejected duty 0: {e:?}"))
        })?;

        let activity = Arc::new(ActivityLine::new(number, cooldown));
        let stop = Arc::new(AtomicBool::new(false));
        let watcher = {
            let activity = Arc::clone(&activity);
            let stop = Arc::clone(&stop);
            spawn_named(format!("sensor-p{number}"), SERVICE_STACK_KB, move || {
                watch_sensor(number, sensor, &activity, &stop, sensor_poll);
            })?
        };

        info!(
            "port {} ready: sensor_pin={} light_pin={} pwm={}Hz",
            number, pins.sensor_pin, light_pin, pins.pwm_freq_hz
        );

        Ok(Self {
            number,
            pins,
            activity,
            light: Mutex::new(light),
            level: AtomicU8::new(0),
            stop,
            watcher: Some(watcher),
        })
    }

    pub fn pins(&self) -> PinAssignment {
        self.pins
    }
}

/// Edge detector loop. A sensor that is already HIGH at startup does not
/// count as an edge.
fn watch_sensor<S: InputPin>(
    number: PortNumber,
    mut sensor: S,
    activity: &ActivityLine,
    stop: &AtomicBool,
    poll: Duration,
) {
    let mut was_high = sensor.is_high().unwrap_or(false);
    let mut failing = false;
    while !stop.load(Ordering::Acquire) {
        match sensor.is_high() {
            Ok(high) => {
                if high && !was_high {
                    activity.rising_edge();
                }
                was_high = high;
                failing = false;
            }
            Err(e) => {
                if !failing {
                    warn!("port {}: sensor read failed: {:?}", number, e);
                }
                failing = true;
            }
        }
        std::thread::sleep(poll);
    }
}

impl<L> Port for HardwarePort<L>
where
    L: SetDutyCycle + Send + 'static,
{
    fn number(&self) -> PortNumber {
        self.number
    }

    fn set_light(&self, level: i32) {
        let level = clamp_level(level);
        self.level.store(level, Ordering::Release);
        if let Err(e) = self.light.lock().set_duty_cycle_percent(level) {
            warn!("port {}: PWM write failed: {:?}", self.number, e);
        }
    }

    fn light(&self) -> u8 {
        self.level.load(Ordering::Acquire)
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
        info!("made activity at port {}", self.number);
        self.activity.rising_edge()
    }
}

impl<L> Drop for HardwarePort<L> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.watcher.take() {
            let _ = handle.join();
        }
    }
}
