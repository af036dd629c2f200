use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use careerflow_core::memory::{ManualIdentityProvider, MemoryHistory, MemoryStore};
use careerflow_core::subscriptions::Slot;
use careerflow_core::{Dashboard, DashboardConfig, DashboardServices, DashboardSnapshot, Location};
use serde::Serialize;
use tracing::{debug, info};

use super::script::{Script, Step};

/// Snapshot taken by a `snapshot` step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    /// Position of the step in the script
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
}

/// Subscription failure reported while the script ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub step: usize,
    pub slot: Slot,
    pub identity_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub snapshots: Vec<SnapshotRecord>,
    pub errors: Vec<ErrorRecord>,
}

/// A dashboard mounted against in-memory backends.
pub struct Simulator {
    provider: ManualIdentityProvider,
    store: MemoryStore,
    history: Rc<MemoryHistory>,
    dashboard: Dashboard,
    mounted_at: Instant,
    current_step: Rc<RefCell<usize>>,
    errors: Rc<RefCell<Vec<ErrorRecord>>>,
}

impl Simulator {
    pub fn new(config: &DashboardConfig, start: Location) -> Result<Self> {
        let provider = ManualIdentityProvider::new();
        let store = MemoryStore::new();
        let history = Rc::new(MemoryHistory::new(start.clone()));

        let services = DashboardServices {
            identity_provider: Rc::new(provider.clone()),
            live_query: Rc::new(store.clone()),
            navigator: history.clone(),
        };
        let mut dashboard =
            Dashboard::mount(config, services, start).context("Failed to mount dashboard")?;
        history.attach(dashboard.sender());

        let current_step = Rc::new(RefCell::new(0));
        let errors = Rc::new(RefCell::new(Vec::new()));
        let (step, sink) = (current_step.clone(), errors.clone());
        dashboard.on_error(move |failure| {
            sink.borrow_mut().push(ErrorRecord {
                step: *step.borrow(),
                slot: failure.slot,
                identity_id: failure.identity_id.clone(),
                message: failure.error.to_string(),
            });
        });

        Ok(Self {
            provider,
            store,
            history,
            dashboard,
            mounted_at: Instant::now(),
            current_step,
            errors,
        })
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Apply one step and drain the resulting events. Returns the snapshot
    /// for `snapshot` steps.
    pub fn apply(&mut self, index: usize, step: &Step) -> Option<SnapshotRecord> {
        *self.current_step.borrow_mut() = index;
        debug!(index, ?step, "applying step");

        match step {
            Step::SignIn { user } => self.provider.sign_in(user.clone()),
            Step::SignOut => self.provider.sign_out(),
            Step::Put { path, id, fields } => self.store.put(path, id, fields.clone()),
            Step::Add { path, fields } => {
                let id = self.store.add(path, fields.clone());
                debug!(path = %path, id = %id, "added record");
            }
            Step::Update { path, id, fields } => {
                if !self.store.update(path, id, fields.clone()) {
                    info!(path = %path, id = %id, "update skipped, record missing");
                }
            }
            Step::Delete { path, id } => {
                self.store.delete(path, id);
            }
            Step::Select { index } => self.dashboard.select(*index),
            Step::Navigate { location } => self.history.push(location.clone()),
            Step::Back => {
                self.history.back();
            }
            Step::Forward => {
                self.history.forward();
            }
            Step::ToggleSidebar => self.dashboard.toggle_sidebar(),
            Step::CloseSidebar => self.dashboard.close_sidebar(),
            Step::LogoClick => self.dashboard.logo_click(),
            Step::LoginRedirect => self.dashboard.login_redirect(),
            Step::FailCollection { collection, reason } => {
                self.store.fail_collection(collection, reason)
            }
            Step::HealCollection { collection } => self.store.heal_collection(collection),
            Step::Tick { after_ms } => {
                self.dashboard
                    .tick(self.mounted_at + Duration::from_millis(*after_ms));
            }
            Step::Snapshot { label } => {
                self.dashboard.pump();
                return Some(SnapshotRecord {
                    step: index,
                    label: label.clone(),
                    snapshot: self.dashboard.snapshot(),
                });
            }
        }

        self.dashboard.pump();
        None
    }

    /// Unmount and hand back everything recorded.
    pub fn finish(mut self, snapshots: Vec<SnapshotRecord>) -> Report {
        self.dashboard.unmount();
        self.history.detach();
        let errors = self.errors.borrow_mut().drain(..).collect();
        Report { snapshots, errors }
    }
}

pub fn run_script(script: &Script, config: &DashboardConfig) -> Result<Report> {
    let start = match &script.start {
        Some(start) => start.clone(),
        None => Location::parse(&config.dashboard_path)
            .with_context(|| format!("Invalid dashboard path: {}", config.dashboard_path))?,
    };

    let mut simulator = Simulator::new(config, start)?;
    let mut snapshots = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        if let Some(record) = simulator.apply(index, step) {
            snapshots.push(record);
        }
    }

    info!(
        steps = script.steps.len(),
        snapshots = snapshots.len(),
        "script finished"
    );
    Ok(simulator.finish(snapshots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerflow_core::dispatcher::RenderedView;
    use careerflow_core::View;

    fn run(json: &str) -> Report {
        let script = Script::from_json(json).unwrap();
        run_script(&script, &DashboardConfig::default()).unwrap()
    }

    #[test]
    fn test_signed_in_session() {
        let report = run(
            r#"{"steps": [
                {"step": "signIn", "user": {"uid": "u1", "displayName": "Uma"}},
                {"step": "put", "path": "notifications", "id": "n1", "fields": {"userId": "u1", "isRead": false}},
                {"step": "add", "path": "chats/c1/messages", "fields": {"receiverId": "u1", "isRead": false}},
                {"step": "select", "index": 10},
                {"step": "snapshot", "label": "settings"}
            ]}"#,
        );

        assert_eq!(report.snapshots.len(), 1);
        let record = &report.snapshots[0];
        assert_eq!(record.step, 4);
        assert_eq!(record.label.as_deref(), Some("settings"));
        assert_eq!(record.snapshot.active_view, Some(View::Settings));
        assert_eq!(record.snapshot.location.to_string(), "/dashboard?tab=settings");
        assert_eq!(record.snapshot.badges.notifications_badge, 1);
        assert_eq!(record.snapshot.badges.messages_badge, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_update_marks_message_read() {
        let report = run(
            r#"{"steps": [
                {"step": "signIn", "user": {"uid": "u1"}},
                {"step": "put", "path": "chats/c1/messages", "id": "m1", "fields": {"receiverId": "u1", "isRead": false}},
                {"step": "snapshot"},
                {"step": "update", "path": "chats/c1/messages", "id": "m1", "fields": {"isRead": true}},
                {"step": "snapshot"}
            ]}"#,
        );

        assert_eq!(report.snapshots[0].snapshot.counts.unread_messages, 1);
        assert_eq!(report.snapshots[1].snapshot.counts.unread_messages, 0);
    }

    #[test]
    fn test_failures_are_recorded_with_step() {
        let report = run(
            r#"{"steps": [
                {"step": "signIn", "user": {"uid": "u1"}},
                {"step": "failCollection", "collection": "connectionRequests", "reason": "missing index"},
                {"step": "snapshot"}
            ]}"#,
        );

        assert_eq!(
            report.errors,
            vec![ErrorRecord {
                step: 1,
                slot: Slot::ConnectionRequests,
                identity_id: "u1".to_string(),
                message: "live query on connectionRequests failed: missing index".to_string(),
            }]
        );
        assert_eq!(
            report.snapshots[0].snapshot.failed_slots,
            vec![Slot::ConnectionRequests]
        );
    }

    #[test]
    fn test_logo_and_login_steps() {
        let report = run(
            r#"{"start": "/dashboard?tab=settings", "steps": [
                {"step": "toggleSidebar"},
                {"step": "logoClick"},
                {"step": "snapshot", "label": "home"},
                {"step": "loginRedirect"},
                {"step": "snapshot", "label": "login"}
            ]}"#,
        );

        let home = &report.snapshots[0].snapshot;
        assert_eq!(home.location.to_string(), "/");
        assert!(!home.sidebar_open);
        assert_eq!(report.snapshots[1].snapshot.location.to_string(), "/login");
    }

    #[test]
    fn test_timeout_step() {
        let report = run(
            r#"{"steps": [
                {"step": "tick", "afterMs": 60000},
                {"step": "snapshot"}
            ]}"#,
        );
        let snapshot = &report.snapshots[0].snapshot;
        assert!(!snapshot.signed_in);
        assert_eq!(snapshot.content, RenderedView::SignInRequired);
    }
}
