//! Light signalling processes.
//!
//! Two patterns, each run on its own thread per port and holding that
//! port's guard token for its whole lifetime:
//!
//! | Process  | Trigger               | Pattern                                   |
//! |----------|-----------------------|-------------------------------------------|
//! | Signal   | port selected         | ramp 0→100, hold, ramp →0, pause; repeat  |
//! | Warning  | activity while idle   | 100 / 0 blink, at most N repetitions      |
//!
//! Both are cooperative: every sleep is followed by a look at the port's
//! `selected` flag, and there is no other way to stop them. Whatever the
//! exit path, the light is forced to 0 before the guard is released.
//!
//! A port's light has one writer at a time. Each process holds the port's
//! `light_owner` lock while it runs. A signal process waits for a running
//! warning blink, which stops as soon as it sees the selection. A warning
//! waits out the fade of a signal process that was just deselected, and
//! gives up only if the port stays lit past that bound (it was selected
//! again).

use std::thread::sleep;
use std::time::Duration;

use log::debug;

use super::controller::PortSlot;
use super::guard::GuardToken;
use super::ports::Port;
use crate::config::SignalTiming;

/// Forces the light to 0 when dropped, including during unwinding.
struct LightOff<'a>(&'a dyn Port);

impl Drop for LightOff<'_> {
    fn drop(&mut self) {
        self.0.set_light(0);
    }
}

/// Attract pattern for a selected port. Returns once the port is
/// deselected; the guard is released under the port's state lock so a
/// concurrent `select` either keeps this process alive or starts a new one.
pub(crate) fn signal_process(slot: &PortSlot, timing: &SignalTiming, token: GuardToken) {
    let _owner = slot.light_owner.lock();
    let port = slot.port.as_ref();
    let _off = LightOff(port);
    debug!("signal process started on port {}", port.number());

    loop {
        while slot.is_selected() {
            attract_cycle(slot, timing);
        }
        port.set_light(0);

        let state = slot.state.lock();
        if !state.selected {
            drop(token);
            drop(state);
            debug!("signal process finished on port {}", port.number());
            return;
        }
        // Re-selected between the last check and here: keep going.
    }
}

/// One ramp-up / hold / ramp-down / pause cycle.
fn attract_cycle(slot: &PortSlot, timing: &SignalTiming) {
    let port = slot.port.as_ref();

    let mut peaked = true;
    for level in 0..=100 {
        port.set_light(level);
        sleep(timing.ramp_step());
        if !slot.is_selected() {
            peaked = false;
            break;
        }
    }

    let held = peaked && wait_while_selected(slot, timing.hold_slice(), timing.hold_slices);

    // The down-ramp always runs to the end so the light never sticks on.
    for level in (0..=i32::from(port.light())).rev() {
        port.set_light(level);
        sleep(timing.ramp_step());
    }

    if held {
        wait_while_selected(slot, timing.pause_slice(), timing.pause_slices);
    }
}

/// Sleep `slices` × `slice`, returning early (false) once deselected.
fn wait_while_selected(slot: &PortSlot, slice: Duration, slices: u32) -> bool {
    for _ in 0..slices {
        sleep(slice);
        if !slot.is_selected() {
            return false;
        }
    }
    true
}

/// Sharp blink for activity on a port nobody selected.
pub(crate) fn warning_process(slot: &PortSlot, timing: &SignalTiming, token: GuardToken) {
    let port = slot.port.as_ref();
    {
        // A deselected signal process still owns the light while it fades.
        let Some(_owner) = slot.light_owner.try_lock_for(timing.release_bound()) else {
            debug!("port {} light is signalling, warning skipped", port.number());
            return;
        };
        let _off = LightOff(port);

        for _ in 0..timing.blink_repetitions {
            if slot.is_selected() {
                // The next activity is a legitimate confirmation.
                break;
            }
            port.set_light(100);
            sleep(timing.blink_on());
            port.set_light(0);
            sleep(timing.blink_off());
        }
    }
    drop(token);
}
