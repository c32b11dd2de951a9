//! Process guard sets.
//!
//! A [`GuardSet`] records which ports currently run a process of one kind
//! (signal or warning). Acquisition is a single insert-if-absent under the
//! set's lock, and the returned [`GuardToken`] removes the entry when it is
//! dropped, so release happens on every exit path of the owning thread,
//! including unwinding.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::PortNumber;

#[derive(Debug, Clone, Default)]
pub struct GuardSet {
    name: &'static str,
    members: Arc<Mutex<HashSet<PortNumber>>>,
}

impl GuardSet {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Arc::default(),
        }
    }

    /// Claim `port`. `None` if a process already holds it.
    pub fn try_acquire(&self, port: PortNumber) -> Option<GuardToken> {
        if self.members.lock().insert(port) {
            Some(GuardToken {
                set: self.clone(),
                port,
            })
        } else {
            log::debug!("{} process already running on port {}", self.name, port);
            None
        }
    }

    pub fn contains(&self, port: PortNumber) -> bool {
        self.members.lock().contains(&port)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

/// Proof of membership in a [`GuardSet`]. Released on drop.
#[derive(Debug)]
pub struct GuardToken {
    set: GuardSet,
    port: PortNumber,
}

impl GuardToken {
    pub fn port(&self) -> PortNumber {
        self.port
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.set.members.lock().remove(&self.port);
    }
}
