//! Pick-by-light station library.
//!
//! Exposes the controller, port drivers and adapters for the operator
//! console and for integration testing. Hardware access goes through
//! `embedded-hal` traits, so the whole crate builds and tests on a host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;

pub use app::PortNumber;
pub use app::PortSelectionController;
pub use error::{Error, Result};
