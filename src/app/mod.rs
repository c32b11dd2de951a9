//! Application core — selection state, signalling and activity rules.
//!
//! Everything here is hardware-agnostic. Ports, event output and content
//! storage are reached only through the traits in [`ports`], so the whole
//! core runs against simulated ports in tests.

pub mod commands;
pub mod content;
pub mod controller;
pub mod events;
pub mod guard;
pub mod ports;
mod signal;
pub mod state;

/// Unique, stable port identifier.
pub type PortNumber = u32;

pub use controller::PortSelectionController;
