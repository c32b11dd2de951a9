//! Port assembly — builds the registry from configuration.
//!
//! The port variant is chosen here and nowhere else: the controller only
//! ever sees `Arc<dyn Port>`. Hardware assembly checks the whole pin map
//! first, so a missing mapping fails startup before any pin is claimed.

use std::sync::Arc;

use log::info;

use crate::app::ports::{GpioBank, Port};
use crate::config::StationConfig;
use crate::drivers::hw_port::HardwarePort;
use crate::drivers::sim_port::SimulatedPort;
use crate::error::{Error, Result};
use crate::pins::PinMap;

/// One hardware port per configured number, in configuration order.
pub fn hardware_ports<B: GpioBank>(
    config: &StationConfig,
    pin_map: &PinMap,
    bank: &mut B,
) -> Result<Vec<Arc<dyn Port>>> {
    pin_map.require_all(&config.ports)?;

    let mut ports: Vec<Arc<dyn Port>> = Vec::with_capacity(config.ports.len());
    for &number in &config.ports {
        let port = HardwarePort::open(
            number,
            pin_map,
            bank,
            config.activity_cooldown(),
            config.sensor_poll(),
        )?;
        ports.push(Arc::new(port));
    }
    info!("{} hardware ports ready", ports.len());
    Ok(ports)
}

/// Pin map named by the configuration. Hardware stations must name one.
pub fn configured_pin_map(config: &StationConfig) -> Result<PinMap> {
    let path = config
        .pin_map_path
        .as_deref()
        .ok_or_else(|| Error::config("pin_map_path is required for hardware ports"))?;
    PinMap::load(path)
}

/// One simulated port per configured number, in configuration order.
pub fn simulated_ports(config: &StationConfig) -> Vec<Arc<dyn Port>> {
    let ports: Vec<Arc<dyn Port>> = config
        .ports
        .iter()
        .map(|&n| Arc::new(SimulatedPort::new(n, config.activity_cooldown())) as Arc<dyn Port>)
        .collect();
    info!("{} simulated ports ready", ports.len());
    ports
}
