//! Hardware port driver and port assembly against the in-memory GPIO bank.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pickbylight::PortSelectionController;
use pickbylight::adapters::hardware::hardware_ports;
use pickbylight::app::events::ActivitySink;
use pickbylight::app::ports::{EventSink, Port};
use pickbylight::config::StationConfig;
use pickbylight::drivers::hw_port::HardwarePort;
use pickbylight::error::Error;
use pickbylight::pins::{LIGHT_PWM_FREQ_HZ, PinAssignment, PinMap};

use crate::mock_hw::{MockBank, RecordingSink, fast_timing, wait_until};

const POLL: Duration = Duration::from_millis(1);

fn pins(sensor: u8, light: u8) -> PinAssignment {
    PinAssignment {
        sensor_pin: sensor,
        light_pin: Some(light),
        pwm_freq_hz: LIGHT_PWM_FREQ_HZ,
    }
}

fn two_port_map() -> PinMap {
    let mut map = PinMap::new();
    map.insert(1, pins(36, 35));
    map.insert(2, pins(37, 33));
    map
}

#[test]
fn open_switches_light_off() {
    let mut bank = MockBank::default();
    let duty = bank.duty(35);
    let port = HardwarePort::open(1, &two_port_map(), &mut bank, Duration::from_secs(5), POLL)
        .unwrap();
    assert_eq!(duty.load(Ordering::SeqCst), 0);
    assert_eq!(port.light(), 0);
    assert_eq!(port.pins(), pins(36, 35));
}

#[test]
fn light_level_maps_to_duty_percent() {
    let mut bank = MockBank::default();
    let duty = bank.duty(35);
    let port = HardwarePort::open(1, &two_port_map(), &mut bank, Duration::from_secs(5), POLL)
        .unwrap();
    port.set_light(40);
    assert_eq!(duty.load(Ordering::SeqCst), 400);
    port.set_light(250);
    assert_eq!(port.light(), 100);
    assert_eq!(duty.load(Ordering::SeqCst), 1000);
    port.set_light(-1);
    assert_eq!(duty.load(Ordering::SeqCst), 0);
}

#[test]
fn rising_edge_is_reported_once_per_cooldown() {
    let mut bank = MockBank::default();
    let line = bank.sensor_line(36);
    let port = HardwarePort::open(1, &two_port_map(), &mut bank, Duration::from_secs(5), POLL)
        .unwrap();
    let (sink, rx) = ActivitySink::channel();
    port.register_activity_callback(sink).unwrap();

    for _ in 0..3 {
        line.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(15));
        line.store(false, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(15));
    }

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].port, 1);
    assert!(port.is_active());
    assert_eq!(port.last_activity(), Some(events[0].at));
}

#[test]
fn sensor_high_at_startup_is_not_an_edge() {
    let mut bank = MockBank::default();
    bank.sensor_line(36).store(true, Ordering::SeqCst);
    let port = HardwarePort::open(1, &two_port_map(), &mut bank, Duration::from_secs(5), POLL)
        .unwrap();
    std::thread::sleep(Duration::from_millis(20));
    assert!(port.last_activity().is_none());
}

#[test]
fn missing_mapping_fails_before_any_pin_is_claimed() {
    let config = StationConfig {
        ports: vec![1, 2, 3],
        ..StationConfig::default()
    };
    let mut bank = MockBank::default();
    let res = hardware_ports(&config, &two_port_map(), &mut bank);
    assert!(matches!(res, Err(Error::Configuration(_))));
    assert!(bank.claimed.is_empty());
}

#[test]
fn missing_light_pin_is_a_configuration_error() {
    let mut map = two_port_map();
    map.insert(
        3,
        PinAssignment {
            sensor_pin: 38,
            light_pin: None,
            pwm_freq_hz: LIGHT_PWM_FREQ_HZ,
        },
    );
    let mut bank = MockBank::default();
    let res = HardwarePort::open(3, &map, &mut bank, Duration::from_secs(5), POLL);
    assert!(matches!(res, Err(Error::Configuration(_))));
}

#[test]
fn sensor_edge_confirms_pick_end_to_end() {
    let config = StationConfig {
        ports: vec![1, 2],
        sensor_poll_ms: 1,
        timing: fast_timing(),
        ..StationConfig::default()
    };
    let mut bank = MockBank::default();
    let line = bank.sensor_line(37);
    let duty = bank.duty(33);
    let ports = hardware_ports(&config, &two_port_map(), &mut bank).unwrap();
    let controller = PortSelectionController::new(
        ports,
        config.timing.clone(),
        Arc::new(RecordingSink::default()) as Arc<dyn EventSink>,
    )
    .unwrap();

    controller.select(2, 1, "");
    assert!(wait_until(Duration::from_secs(2), || duty.load(Ordering::SeqCst) > 0));

    line.store(true, Ordering::SeqCst);
    assert!(wait_until(Duration::from_secs(2), || !controller.state(2).unwrap().selected));
    assert!(wait_until(Duration::from_secs(2), || !controller.is_signalling(2)));
    assert_eq!(duty.load(Ordering::SeqCst), 0);
    assert_eq!(controller.light_level(2), Some(0));
}
