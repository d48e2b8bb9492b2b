//! Armed stop-entry orders awaiting a trigger.
//!
//! Orders never expire. They are tested in arming order and only while the run
//! is flat; the first one triggered is removed and the rest stay armed.

use crate::domain::PendingOrder;

#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    pending: Vec<PendingOrder>,
    armed_total: usize,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, order: PendingOrder) {
        self.pending.push(order);
        self.armed_total += 1;
    }

    /// Remove and return the first order the bar's range triggers.
    pub fn take_fill(&mut self, high: f64, low: f64) -> Option<PendingOrder> {
        let idx = self
            .pending
            .iter()
            .position(|o| o.is_triggered(high, low))?;
        Some(self.pending.remove(idx))
    }

    pub fn pending(&self) -> &[PendingOrder] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Orders armed over the whole run, filled or not.
    pub fn armed_total(&self) -> usize {
        self.armed_total
    }
}
