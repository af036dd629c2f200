use serde::Serialize;

use crate::models::View;
use crate::subscriptions::SlotCounts;

/// Badge values for the sidebar entries that carry one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badges {
    pub notifications_badge: u64,
    pub messages_badge: u64,
}

impl Badges {
    /// Badge to render next to a menu entry. Only positive values are shown,
    /// and they are shown exactly (no "9+" capping).
    pub fn for_view(&self, view: View) -> Option<u64> {
        let value = match view {
            View::Notifications => self.notifications_badge,
            View::Messages => self.messages_badge,
            _ => return None,
        };
        (value > 0).then_some(value)
    }
}

/// Unread notifications and pending connection requests share the
/// Notifications entry; unread messages go on Messages.
pub fn compute_badges(counts: &SlotCounts) -> Badges {
    Badges {
        notifications_badge: counts.notifications + counts.connection_requests,
        messages_badge: counts.unread_messages,
    }
}
