use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::identity::{IdentityProvider, ProfileCallback};
use crate::live_query::SubscriptionHandle;
use crate::models::ProviderProfile;

struct Subscriber {
    id: u64,
    on_change: Option<ProfileCallback>,
}

#[derive(Default)]
struct ProviderInner {
    subscribers: Vec<Subscriber>,
    /// `None` until the first `emit`; new subscribers are replayed the last state.
    last: Option<Option<ProviderProfile>>,
    next_id: u64,
}

/// Identity provider driven by hand: every `emit` is fanned out to the
/// current subscribers, and late subscribers immediately receive the last
/// emitted state.
#[derive(Clone, Default)]
pub struct ManualIdentityProvider {
    inner: Rc<RefCell<ProviderInner>>,
}

impl ManualIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, profile: ProviderProfile) {
        self.emit(Some(profile));
    }

    pub fn sign_out(&self) {
        self.emit(None);
    }

    pub fn emit(&self, profile: Option<ProviderProfile>) {
        let ids: Vec<u64> = {
            let mut inner = self.inner.borrow_mut();
            inner.last = Some(profile.clone());
            inner.subscribers.iter().map(|s| s.id).collect()
        };
        for id in ids {
            self.deliver(id, profile.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn deliver(&self, id: u64, profile: Option<ProviderProfile>) {
        let callback = self
            .inner
            .borrow_mut()
            .subscribers
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.on_change.take());
        let Some(mut callback) = callback else {
            return;
        };

        callback(profile);

        if let Some(subscriber) = self
            .inner
            .borrow_mut()
            .subscribers
            .iter_mut()
            .find(|s| s.id == id)
        {
            subscriber.on_change = Some(callback);
        }
    }

    fn remove(inner: &Weak<RefCell<ProviderInner>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            inner.borrow_mut().subscribers.retain(|s| s.id != id);
        }
    }
}

impl IdentityProvider for ManualIdentityProvider {
    fn subscribe(&self, on_change: ProfileCallback) -> SubscriptionHandle {
        let (id, replay) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Subscriber {
                id,
                on_change: Some(on_change),
            });
            (id, inner.last.clone())
        };

        if let Some(profile) = replay {
            self.deliver(id, profile);
        }

        let weak = Rc::downgrade(&self.inner);
        SubscriptionHandle::new(move || Self::remove(&weak, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Option<String>>>>, ProfileCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProfileCallback = Box::new(move |profile: Option<ProviderProfile>| {
            sink.borrow_mut().push(profile.map(|p| p.uid));
        });
        (seen, callback)
    }

    #[test]
    fn test_emit_reaches_subscribers_until_cancelled() {
        let provider = ManualIdentityProvider::new();
        let (seen, callback) = recorder();
        let handle = provider.subscribe(callback);

        provider.sign_in(ProviderProfile::new("ada"));
        provider.sign_out();
        handle.cancel();
        provider.sign_in(ProviderProfile::new("bob"));

        assert_eq!(*seen.borrow(), vec![Some("ada".to_string()), None]);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[test]
    fn test_late_subscriber_gets_last_state() {
        let provider = ManualIdentityProvider::new();
        let (silent, callback) = recorder();
        let _first = provider.subscribe(callback);
        assert!(silent.borrow().is_empty());

        provider.sign_in(ProviderProfile::new("ada"));
        let (seen, callback) = recorder();
        let _second = provider.subscribe(callback);
        assert_eq!(*seen.borrow(), vec![Some("ada".to_string())]);
    }
}
