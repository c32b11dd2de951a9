//! Named thread spawning for long-lived and on-demand station tasks.
//!
//! Every station thread (sensor watchers, signal and warning processes,
//! the activity dispatcher, the tag poller) goes through [`spawn_named`],
//! so names show up in panics and debuggers and a failed spawn is logged
//! and reported instead of aborting the caller.

use std::thread::JoinHandle;

use log::{debug, error};

use crate::error::{Error, Result};

/// Stack for signal/warning processes: they only sleep and call `set_light`.
pub const PROCESS_STACK_KB: usize = 64;
/// Stack for long-lived service threads.
pub const SERVICE_STACK_KB: usize = 256;

/// Spawn a named thread with an explicit stack size.
pub fn spawn_named<F>(name: String, stack_kb: usize, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);
    std::thread::Builder::new()
        .name(name.clone())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            error!("thread '{}' could not be spawned: {}", name, e);
            Error::Io(format!("spawn {name}: {e}"))
        })
}
