//! Per-port selection state and read-only snapshots.

use std::time::SystemTime;

use super::PortNumber;

/// Selection state of one port. Owned by the controller.
///
/// Invariant: when `selected` is false, `amount_to_pick` is 0 and
/// `select_instructions` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortState {
    pub selected: bool,
    pub amount_to_pick: u32,
    pub select_instructions: String,
    pub work_finished: bool,
}

impl PortState {
    pub(crate) fn select(&mut self, amount: u32, instructions: &str) {
        self.selected = true;
        self.work_finished = false;
        self.amount_to_pick = amount;
        self.select_instructions = instructions.to_owned();
    }

    pub(crate) fn deselect(&mut self, work_finished: bool) {
        self.selected = false;
        self.work_finished = work_finished;
        self.amount_to_pick = 0;
        self.select_instructions.clear();
    }

    /// Activity on a selected port: one item picked, selection over.
    /// A single transition, so observers only ever see the end state.
    pub(crate) fn confirm_pick(&mut self) {
        self.amount_to_pick = self.amount_to_pick.saturating_sub(1);
        self.deselect(false);
    }
}

/// One row of the `GetPorts` view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSnapshot {
    pub number: PortNumber,
    pub active: bool,
    pub light: u8,
    pub last_activity: Option<SystemTime>,
}
