//! Port drivers, sensor debounce, and thread helpers.

pub mod debounce;
pub mod hw_port;
pub mod sim_port;
pub mod task;
