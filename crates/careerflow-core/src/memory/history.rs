use std::cell::RefCell;

use tracing::debug;

use crate::events::{DashboardEvent, DashboardSender};
use crate::models::{Location, Navigator};

struct HistoryInner {
    entries: Vec<Location>,
    cursor: usize,
    sink: Option<DashboardSender>,
}

/// Browser-style history stack with back/forward.
///
/// Every move is posted to the attached dashboard as `UrlChanged`, including
/// navigation the dashboard itself asked for, the way a router re-renders
/// on any location change.
pub struct MemoryHistory {
    inner: RefCell<HistoryInner>,
}

impl MemoryHistory {
    pub fn new(initial: Location) -> Self {
        Self {
            inner: RefCell::new(HistoryInner {
                entries: vec![initial],
                cursor: 0,
                sink: None,
            }),
        }
    }

    pub fn attach(&self, sink: DashboardSender) {
        self.inner.borrow_mut().sink = Some(sink);
    }

    pub fn detach(&self) {
        self.inner.borrow_mut().sink = None;
    }

    pub fn current(&self) -> Location {
        let inner = self.inner.borrow();
        inner.entries[inner.cursor].clone()
    }

    /// Number of entries on the stack; never zero.
    pub fn depth(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// New entry (typed URL, link or dashboard navigation), dropping
    /// anything ahead of the cursor.
    pub fn push(&self, location: Location) {
        {
            let mut inner = self.inner.borrow_mut();
            let keep = inner.cursor + 1;
            inner.entries.truncate(keep);
            inner.entries.push(location);
            inner.cursor += 1;
        }
        self.announce();
    }

    pub fn back(&self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.cursor == 0 {
                return false;
            }
            inner.cursor -= 1;
        }
        self.announce();
        true
    }

    pub fn forward(&self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.cursor + 1 >= inner.entries.len() {
                return false;
            }
            inner.cursor += 1;
        }
        self.announce();
        true
    }

    fn announce(&self) {
        let inner = self.inner.borrow();
        let location = inner.entries[inner.cursor].clone();
        debug!(%location, "history moved");
        if let Some(sink) = &inner.sink {
            let _ = sink.send(DashboardEvent::UrlChanged(location));
        }
    }
}

impl Navigator for MemoryHistory {
    fn navigate(&self, location: &Location) {
        self.push(location.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    fn loc(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    #[test]
    fn test_back_and_forward() {
        let history = MemoryHistory::new(loc("/dashboard"));
        history.push(loc("/dashboard?tab=settings"));
        history.push(loc("/dashboard"));

        assert!(history.back());
        assert_eq!(history.current(), loc("/dashboard?tab=settings"));
        assert!(history.forward());
        assert_eq!(history.current(), loc("/dashboard"));
        assert!(!history.forward());
    }

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = MemoryHistory::new(loc("/a"));
        history.push(loc("/b"));
        history.back();
        history.push(loc("/c"));
        assert_eq!(history.depth(), 2);
        assert!(!history.forward());
        assert!(history.back());
        assert!(!history.back());
    }

    #[test]
    fn test_user_moves_are_announced() {
        let history = MemoryHistory::new(loc("/dashboard"));
        let (tx, rx) = events::channel();
        history.attach(tx);

        history.push(loc("/dashboard?tab=settings"));
        history.back();

        assert_eq!(
            rx.try_recv().unwrap(),
            DashboardEvent::UrlChanged(loc("/dashboard?tab=settings"))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            DashboardEvent::UrlChanged(loc("/dashboard"))
        );
    }

    #[test]
    fn test_dashboard_navigation_is_announced() {
        let history = MemoryHistory::new(loc("/dashboard"));
        let (tx, rx) = events::channel();
        history.attach(tx);

        history.navigate(&loc("/dashboard?tab=settings"));
        assert_eq!(
            rx.try_recv().unwrap(),
            DashboardEvent::UrlChanged(loc("/dashboard?tab=settings"))
        );
        assert_eq!(history.current(), loc("/dashboard?tab=settings"));
        assert_eq!(history.depth(), 2);
    }
}
