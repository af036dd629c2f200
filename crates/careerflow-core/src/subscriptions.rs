//! Owns the three live subscriptions that feed the sidebar badges.
//!
//! ## Binding rules
//! - Every open subscription is bound to exactly one identity id and a
//!   generation token that is never reused.
//! - Switching identity cancels every old binding before the new ones are
//!   opened, and resets the counts so nothing from the old identity leaks
//!   into the new aggregate.
//! - Live-query callbacks only post a `SlotUpdate` into the dashboard
//!   channel. `apply_update` drops any update whose identity id or token no
//!   longer matches the slot's binding.
//! - A failing slot releases its own handle and freezes its count; the
//!   other slots keep running.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{collections, fields};
use crate::events::{DashboardEvent, DashboardSender, ListenerId, Listeners};
use crate::live_query::{FieldFilter, LiveQuery, LiveQueryError, LiveQuerySpec, SubscriptionHandle};
use crate::models::Identity;
use crate::stats::SharedSubscriptionStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Notifications,
    ConnectionRequests,
    UnreadMessages,
}

impl Slot {
    pub const ALL: [Slot; 3] = [
        Slot::Notifications,
        Slot::ConnectionRequests,
        Slot::UnreadMessages,
    ];

    /// The query this slot runs for a given identity id.
    pub fn query_for(&self, identity_id: &str) -> LiveQuerySpec {
        match self {
            Slot::Notifications => LiveQuerySpec::collection(collections::NOTIFICATIONS)
                .filter(FieldFilter::eq_str(fields::USER_ID, identity_id))
                .filter(FieldFilter::eq_bool(fields::IS_READ, false)),
            Slot::ConnectionRequests => {
                LiveQuerySpec::collection(collections::CONNECTION_REQUESTS)
                    .filter(FieldFilter::eq_str(fields::MENTOR_ID, identity_id))
                    .filter(FieldFilter::eq_str(fields::STATUS, fields::STATUS_PENDING))
            }
            Slot::UnreadMessages => LiveQuerySpec::collection_group(collections::MESSAGES)
                .filter(FieldFilter::eq_str(fields::RECEIVER_ID, identity_id))
                .filter(FieldFilter::eq_bool(fields::IS_READ, false)),
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::Notifications => 0,
            Slot::ConnectionRequests => 1,
            Slot::UnreadMessages => 2,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Notifications => "notifications",
            Slot::ConnectionRequests => "connectionRequests",
            Slot::UnreadMessages => "unreadMessages",
        };
        f.write_str(name)
    }
}

/// Latest count per slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCounts {
    pub notifications: u64,
    pub connection_requests: u64,
    pub unread_messages: u64,
}

impl SlotCounts {
    pub fn get(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Notifications => self.notifications,
            Slot::ConnectionRequests => self.connection_requests,
            Slot::UnreadMessages => self.unread_messages,
        }
    }

    fn set(&mut self, slot: Slot, value: u64) {
        match slot {
            Slot::Notifications => self.notifications = value,
            Slot::ConnectionRequests => self.connection_requests = value,
            Slot::UnreadMessages => self.unread_messages = value,
        }
    }
}

/// One delivery from a live query, tagged with the binding it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotUpdate {
    pub slot: Slot,
    pub identity_id: String,
    pub token: u64,
    pub result: Result<usize, LiveQueryError>,
}

/// Non-fatal report that a slot stopped updating.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionFailure {
    pub slot: Slot,
    pub identity_id: String,
    pub error: LiveQueryError,
}

impl fmt::Display for SubscriptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscription for {} failed: {}",
            self.slot, self.identity_id, self.error
        )
    }
}

struct Binding {
    identity_id: String,
    token: u64,
    handle: SubscriptionHandle,
}

#[derive(Default)]
struct SlotState {
    binding: Option<Binding>,
    failure: Option<LiveQueryError>,
}

pub struct SubscriptionManager {
    live_query: Rc<dyn LiveQuery>,
    events: DashboardSender,
    identity_id: Option<String>,
    slots: [SlotState; 3],
    counts: SlotCounts,
    next_token: u64,
    count_listeners: Listeners<SlotCounts>,
    error_listeners: Listeners<SubscriptionFailure>,
    stats: SharedSubscriptionStats,
}

impl SubscriptionManager {
    pub fn new(live_query: Rc<dyn LiveQuery>, events: DashboardSender) -> Self {
        Self {
            live_query,
            events,
            identity_id: None,
            slots: Default::default(),
            counts: SlotCounts::default(),
            next_token: 0,
            count_listeners: Listeners::new(),
            error_listeners: Listeners::new(),
            stats: SharedSubscriptionStats::new(),
        }
    }

    pub fn counts(&self) -> SlotCounts {
        self.counts
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.identity_id.as_deref()
    }

    /// Identity the slot's live subscription is bound to, if it has one.
    pub fn bound_identity(&self, slot: Slot) -> Option<&str> {
        self.slots[slot.index()]
            .binding
            .as_ref()
            .map(|b| b.identity_id.as_str())
    }

    pub fn failure(&self, slot: Slot) -> Option<&LiveQueryError> {
        self.slots[slot.index()].failure.as_ref()
    }

    pub fn stats(&self) -> SharedSubscriptionStats {
        self.stats.clone()
    }

    pub fn on_counts_change(&mut self, callback: impl FnMut(&SlotCounts) + 'static) -> ListenerId {
        self.count_listeners.add(callback)
    }

    pub fn remove_counts_listener(&mut self, id: ListenerId) -> bool {
        self.count_listeners.remove(id)
    }

    pub fn on_error(
        &mut self,
        callback: impl FnMut(&SubscriptionFailure) + 'static,
    ) -> ListenerId {
        self.error_listeners.add(callback)
    }

    pub fn remove_error_listener(&mut self, id: ListenerId) -> bool {
        self.error_listeners.remove(id)
    }

    /// Single entry point for identity changes.
    ///
    /// Repeating the current identity keeps live subscriptions untouched and
    /// only reopens slots that have no live subscription (after a failure).
    pub fn set_identity(&mut self, identity: Option<&Identity>) {
        let before = self.counts;

        match identity {
            None => {
                if self.identity_id.is_some() {
                    info!("identity cleared, releasing subscriptions");
                }
                self.release_all();
                self.identity_id = None;
                self.counts = SlotCounts::default();
            }
            Some(identity) if self.identity_id.as_deref() == Some(identity.id.as_str()) => {
                self.open_unbound();
            }
            Some(identity) => {
                self.release_all();
                self.counts = SlotCounts::default();
                info!(identity = %identity.id, "binding subscriptions");
                self.identity_id = Some(identity.id.clone());
                self.open_unbound();
            }
        }

        self.publish_if_changed(before);
    }

    /// Apply a delivery from a live query. Returns true if the counts changed.
    pub fn apply_update(&mut self, update: SlotUpdate) -> bool {
        let SlotUpdate {
            slot,
            identity_id,
            token,
            result,
        } = update;

        if !self.is_current(slot, &identity_id, token) {
            debug!(%slot, identity = %identity_id, token, "dropping stale slot update");
            self.stats.record_stale(slot);
            return false;
        }

        match result {
            Ok(size) => {
                let before = self.counts;
                self.counts.set(slot, size as u64);
                self.stats.record_delivered(slot);
                self.publish_if_changed(before)
            }
            Err(error) => {
                self.release(slot);
                self.fail(slot, identity_id, error);
                false
            }
        }
    }

    /// Cancel everything; used when the owning dashboard unmounts.
    pub fn shutdown(&mut self) {
        self.set_identity(None);
    }

    fn is_current(&self, slot: Slot, identity_id: &str, token: u64) -> bool {
        if self.identity_id.as_deref() != Some(identity_id) {
            return false;
        }
        self.slots[slot.index()]
            .binding
            .as_ref()
            .is_some_and(|b| b.token == token && b.identity_id == identity_id)
    }

    fn open_unbound(&mut self) {
        for slot in Slot::ALL {
            if self.slots[slot.index()].binding.is_none() {
                self.open(slot);
            }
        }
    }

    fn open(&mut self, slot: Slot) {
        let Some(identity_id) = self.identity_id.clone() else {
            return;
        };
        let token = self.next_token;
        self.next_token += 1;

        let spec = slot.query_for(&identity_id);
        let events = self.events.clone();
        let bound_id = identity_id.clone();
        let on_snapshot = Box::new(move |result: Result<usize, LiveQueryError>| {
            let _ = events.send(DashboardEvent::SlotUpdate(SlotUpdate {
                slot,
                identity_id: bound_id.clone(),
                token,
                result,
            }));
        });

        match self.live_query.subscribe(&spec, on_snapshot) {
            Ok(handle) => {
                debug!(%slot, query = %spec, token, "subscription opened");
                self.stats.record_opened(slot);
                let state = &mut self.slots[slot.index()];
                state.failure = None;
                state.binding = Some(Binding {
                    identity_id,
                    token,
                    handle,
                });
            }
            Err(error) => self.fail(slot, identity_id, error),
        }
    }

    fn release(&mut self, slot: Slot) {
        if let Some(binding) = self.slots[slot.index()].binding.take() {
            debug!(%slot, identity = %binding.identity_id, token = binding.token, "subscription cancelled");
            binding.handle.cancel();
            self.stats.record_cancelled(slot);
        }
    }

    fn release_all(&mut self) {
        for slot in Slot::ALL {
            self.release(slot);
            self.slots[slot.index()].failure = None;
        }
    }

    fn fail(&mut self, slot: Slot, identity_id: String, error: LiveQueryError) {
        warn!(%slot, identity = %identity_id, error = %error, "subscription failed, keeping last count");
        self.stats.record_failed(slot);
        self.slots[slot.index()].failure = Some(error.clone());
        self.error_listeners.emit(&SubscriptionFailure {
            slot,
            identity_id,
            error,
        });
    }

    fn publish_if_changed(&mut self, before: SlotCounts) -> bool {
        if self.counts == before {
            return false;
        }
        let counts = self.counts;
        self.count_listeners.emit(&counts);
        true
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
