//! Normalizes the identity provider's sign-in stream into a single
//! authoritative `Option<Identity>`.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::events::{ListenerId, Listeners};
use crate::live_query::SubscriptionHandle;
use crate::models::{Identity, ProviderProfile};

pub type ProfileCallback = Box<dyn FnMut(Option<ProviderProfile>)>;

/// External authentication provider.
///
/// `on_change` is invoked with the signed-in profile (or `None`) on sign-in,
/// sign-out, and token refresh, until the returned handle is cancelled.
pub trait IdentityProvider {
    fn subscribe(&self, on_change: ProfileCallback) -> SubscriptionHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityStatus {
    /// Provider has not reported yet; treated as signed out.
    Pending,
    /// Provider never reported within the resolution timeout.
    TimedOut,
    SignedOut,
    SignedIn,
}

pub struct IdentityTracker {
    current: Option<Identity>,
    status: IdentityStatus,
    /// Arrival order of provider reports; the highest is authoritative.
    sequence: u64,
    started_at: Instant,
    timeout: Duration,
    listeners: Listeners<Option<Identity>>,
}

impl IdentityTracker {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            current: None,
            status: IdentityStatus::Pending,
            sequence: 0,
            started_at: now,
            timeout,
            listeners: Listeners::new(),
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn status(&self) -> IdentityStatus {
        self.status
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn on_identity_change(
        &mut self,
        mut callback: impl FnMut(Option<&Identity>) + 'static,
    ) -> ListenerId {
        self.listeners
            .add(move |identity: &Option<Identity>| callback(identity.as_ref()))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply a provider report. Returns true when the identity changed.
    ///
    /// Reports are taken strictly in arrival order: whatever arrives last
    /// wins, regardless of its content.
    pub fn report(&mut self, profile: Option<ProviderProfile>) -> bool {
        self.sequence += 1;
        let next = profile.map(Identity::from_profile);

        self.status = if next.is_some() {
            IdentityStatus::SignedIn
        } else {
            IdentityStatus::SignedOut
        };

        if next == self.current {
            debug!(sequence = self.sequence, "identity report unchanged");
            return false;
        }

        info!(
            sequence = self.sequence,
            from = self.current.as_ref().map(|i| i.id.as_str()),
            to = next.as_ref().map(|i| i.id.as_str()),
            "identity changed"
        );
        self.current = next;
        self.listeners.emit(&self.current);
        true
    }

    /// Resolve a still-pending tracker to signed out once the timeout has
    /// elapsed. Returns true if this call resolved it.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.status != IdentityStatus::Pending {
            return false;
        }
        if now.saturating_duration_since(self.started_at) < self.timeout {
            return false;
        }
        info!(
            timeout_ms = self.timeout.as_millis() as u64,
            "identity provider silent, treating user as signed out"
        );
        self.status = IdentityStatus::TimedOut;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tracker() -> (IdentityTracker, Instant) {
        let now = Instant::now();
        (IdentityTracker::new(Duration::from_millis(500), now), now)
    }

    fn ada() -> ProviderProfile {
        ProviderProfile::new("ada").with_display_name("Ada")
    }

    #[test]
    fn test_pending_until_first_report() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.status(), IdentityStatus::Pending);
        assert!(tracker.current().is_none());

        assert!(tracker.report(Some(ada())));
        assert_eq!(tracker.status(), IdentityStatus::SignedIn);
        assert_eq!(tracker.current().map(|i| i.id.as_str()), Some("ada"));
    }

    #[test]
    fn test_latest_report_wins() {
        let (mut tracker, _) = tracker();
        tracker.report(Some(ada()));
        tracker.report(Some(ProviderProfile::new("bob")));
        tracker.report(None);
        assert!(tracker.current().is_none());
        assert_eq!(tracker.sequence(), 3);
        assert_eq!(tracker.status(), IdentityStatus::SignedOut);
    }

    #[test]
    fn test_listeners_fire_only_on_change() {
        let (mut tracker, _) = tracker();
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = tracker.on_identity_change(move |identity| {
            sink.borrow_mut().push(identity.map(|i| i.id.clone()));
        });

        tracker.report(Some(ada()));
        // token refresh with identical profile
        tracker.report(Some(ada()));
        tracker.report(None);

        assert_eq!(
            *seen.borrow(),
            vec![Some("ada".to_string()), None]
        );

        assert!(tracker.remove_listener(id));
        tracker.report(Some(ada()));
        assert_eq!(seen.borrow().len(), 2);
        assert!(!tracker.remove_listener(id));
    }

    #[test]
    fn test_timeout_resolves_pending_to_signed_out() {
        let (mut tracker, start) = tracker();
        assert!(!tracker.check_timeout(start + Duration::from_millis(100)));
        assert!(tracker.check_timeout(start + Duration::from_millis(500)));
        assert_eq!(tracker.status(), IdentityStatus::TimedOut);
        assert!(!tracker.check_timeout(start + Duration::from_secs(10)));

        // a late report still takes over
        assert!(tracker.report(Some(ada())));
        assert_eq!(tracker.status(), IdentityStatus::SignedIn);
    }

    #[test]
    fn test_timeout_ignored_after_report() {
        let (mut tracker, start) = tracker();
        tracker.report(None);
        assert!(!tracker.check_timeout(start + Duration::from_secs(10)));
        assert_eq!(tracker.status(), IdentityStatus::SignedOut);
    }
}
