use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::subscriptions::Slot;

/// Lifecycle counters for one slot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStats {
    pub opened: u64,
    pub cancelled: u64,
    /// Snapshots applied to the counts
    pub delivered: u64,
    /// Snapshots dropped because they belonged to a superseded binding
    pub stale_dropped: u64,
    pub failed: u64,
}

/// Subscription lifecycle stats, used to verify that every opened
/// subscription is matched by exactly one cancellation.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    pub by_slot: HashMap<Slot, SlotStats>,
}

impl SubscriptionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: Slot) -> SlotStats {
        self.by_slot.get(&slot).copied().unwrap_or_default()
    }

    pub fn opened(&self) -> u64 {
        self.by_slot.values().map(|s| s.opened).sum()
    }

    pub fn cancelled(&self) -> u64 {
        self.by_slot.values().map(|s| s.cancelled).sum()
    }

    pub fn stale_dropped(&self) -> u64 {
        self.by_slot.values().map(|s| s.stale_dropped).sum()
    }

    /// Subscriptions opened and not yet cancelled
    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.cancelled())
    }

    fn entry(&mut self, slot: Slot) -> &mut SlotStats {
        self.by_slot.entry(slot).or_default()
    }
}

/// Shared handle to the stats, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct SharedSubscriptionStats {
    inner: Rc<RefCell<SubscriptionStats>>,
}

impl SharedSubscriptionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_opened(&self, slot: Slot) {
        self.inner.borrow_mut().entry(slot).opened += 1;
    }

    pub fn record_cancelled(&self, slot: Slot) {
        self.inner.borrow_mut().entry(slot).cancelled += 1;
    }

    pub fn record_delivered(&self, slot: Slot) {
        self.inner.borrow_mut().entry(slot).delivered += 1;
    }

    pub fn record_stale(&self, slot: Slot) {
        self.inner.borrow_mut().entry(slot).stale_dropped += 1;
    }

    pub fn record_failed(&self, slot: Slot) {
        self.inner.borrow_mut().entry(slot).failed += 1;
    }

    pub fn snapshot(&self) -> SubscriptionStats {
        self.inner.borrow().clone()
    }
}
