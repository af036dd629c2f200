use std::sync::mpsc::{self, Receiver, Sender};

use crate::models::{Location, ProviderProfile};
use crate::subscriptions::SlotUpdate;

/// Every input the dashboard reacts to.
///
/// All sources (sidebar, router, identity provider, live queries) funnel
/// into one channel so they are applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    SidebarSelect(usize),
    UrlChanged(Location),
    IdentityChanged(Option<ProviderProfile>),
    SlotUpdate(SlotUpdate),
    ToggleSidebar,
    CloseSidebar,
    /// Header logo: back to the landing page
    LogoClick,
    /// Signed-out visitor sent to the login page
    LoginRedirect,
}

#[derive(Debug, Clone)]
pub struct DashboardSender {
    tx: Sender<DashboardEvent>,
}

impl DashboardSender {
    pub fn send(&self, event: DashboardEvent) -> Result<(), mpsc::SendError<DashboardEvent>> {
        self.tx.send(event)
    }
}

pub fn channel() -> (DashboardSender, Receiver<DashboardEvent>) {
    let (tx, rx) = mpsc::channel();
    (DashboardSender { tx }, rx)
}

/// Registration returned by `on_*` methods; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of callbacks for one kind of notification.
pub struct Listeners<T> {
    entries: Vec<(ListenerId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn add(&mut self, callback: impl FnMut(&T) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, value: &T) {
        for (_, callback) in self.entries.iter_mut() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_listeners_emit_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        let first = log.clone();
        let a = listeners.add(move |v| first.borrow_mut().push(("a", *v)));
        let second = log.clone();
        listeners.add(move |v| second.borrow_mut().push(("b", *v)));

        listeners.emit(&1);
        assert!(listeners.remove(a));
        listeners.emit(&2);

        assert_eq!(*log.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_sender_preserves_order() {
        let (tx, rx) = channel();
        tx.send(DashboardEvent::SidebarSelect(3)).unwrap();
        tx.send(DashboardEvent::ToggleSidebar).unwrap();
        assert_eq!(rx.try_recv().unwrap(), DashboardEvent::SidebarSelect(3));
        assert_eq!(rx.try_recv().unwrap(), DashboardEvent::ToggleSidebar);
    }
}
