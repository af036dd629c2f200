//! The mounted dashboard: owns every component and applies events strictly
//! in the order they arrive on its channel.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::badges::{compute_badges, Badges};
use crate::config::{ConfigError, DashboardConfig};
use crate::constants::{HOME_PATH, LOGIN_PATH};
use crate::dispatcher::{RenderedView, ViewDispatcher};
use crate::events::{self, DashboardEvent, DashboardSender, ListenerId};
use crate::identity::{IdentityProvider, IdentityStatus, IdentityTracker};
use crate::live_query::{LiveQuery, SubscriptionHandle};
use crate::models::{Avatar, Identity, Location, Menu, Navigator, View};
use crate::stats::SharedSubscriptionStats;
use crate::subscriptions::{Slot, SlotCounts, SubscriptionFailure, SubscriptionManager};
use crate::tabs::{SelectOutcome, TabState, TabStateController};

/// External collaborators the dashboard is mounted against.
#[derive(Clone)]
pub struct DashboardServices {
    pub identity_provider: Rc<dyn IdentityProvider>,
    pub live_query: Rc<dyn LiveQuery>,
    pub navigator: Rc<dyn Navigator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub greeting_name: String,
    pub avatar: Avatar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntryView {
    pub index: usize,
    pub view: View,
    pub name: &'static str,
    pub enabled: bool,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u64>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub location: Location,
    pub identity_status: IdentityStatus,
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderView>,
    pub active_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_view: Option<View>,
    pub sidebar_open: bool,
    pub menu: Vec<MenuEntryView>,
    pub counts: SlotCounts,
    pub badges: Badges,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_slots: Vec<Slot>,
    pub content: RenderedView,
}

/// Navigations still waiting for the router's echo. Past this many the
/// oldest is forgotten, so a router that never echoes cannot grow it.
const MAX_PENDING_NAVIGATIONS: usize = 32;

pub struct Dashboard {
    identity: IdentityTracker,
    subscriptions: SubscriptionManager,
    tabs: TabStateController,
    dispatcher: ViewDispatcher,
    navigator: Rc<dyn Navigator>,
    location: Location,
    /// Locations this dashboard navigated to, oldest first
    pending_navigations: VecDeque<Location>,
    sender: DashboardSender,
    receiver: Receiver<DashboardEvent>,
    provider_handle: Option<SubscriptionHandle>,
}

impl Dashboard {
    /// Build every component, subscribe to the identity provider and apply
    /// whatever it reported synchronously.
    pub fn mount(
        config: &DashboardConfig,
        services: DashboardServices,
        initial_location: Location,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let menu = config.build_menu()?;
        let mut tabs = TabStateController::new(menu).with_dashboard_path(&config.dashboard_path);
        tabs.initial_load(&initial_location);

        let (sender, receiver) = events::channel();
        let subscriptions = SubscriptionManager::new(services.live_query, sender.clone());
        let identity = IdentityTracker::new(config.identity_timeout(), Instant::now());

        let tx = sender.clone();
        let provider_handle = services.identity_provider.subscribe(Box::new(move |profile| {
            if tx.send(DashboardEvent::IdentityChanged(profile)).is_err() {
                debug!("dashboard gone, dropping identity report");
            }
        }));

        info!(
            location = %initial_location,
            active_index = tabs.active_index(),
            "dashboard mounted"
        );

        let mut dashboard = Self {
            identity,
            subscriptions,
            tabs,
            dispatcher: ViewDispatcher::new(),
            navigator: services.navigator,
            location: initial_location,
            pending_navigations: VecDeque::new(),
            sender,
            receiver,
            provider_handle: Some(provider_handle),
        };
        dashboard.pump();
        Ok(dashboard)
    }

    /// Sender for external sources (router, UI) to post events on.
    pub fn sender(&self) -> DashboardSender {
        self.sender.clone()
    }

    /// Queue an event behind anything already pending, then drain.
    pub fn submit(&mut self, event: DashboardEvent) {
        if self.sender.send(event).is_ok() {
            self.pump();
        }
    }

    pub fn select(&mut self, idx: usize) {
        self.submit(DashboardEvent::SidebarSelect(idx));
    }

    pub fn url_changed(&mut self, location: Location) {
        self.submit(DashboardEvent::UrlChanged(location));
    }

    pub fn toggle_sidebar(&mut self) {
        self.submit(DashboardEvent::ToggleSidebar);
    }

    pub fn close_sidebar(&mut self) {
        self.submit(DashboardEvent::CloseSidebar);
    }

    pub fn logo_click(&mut self) {
        self.submit(DashboardEvent::LogoClick);
    }

    pub fn login_redirect(&mut self) {
        self.submit(DashboardEvent::LoginRedirect);
    }

    /// Apply every pending event in arrival order, including events posted
    /// while draining. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("dashboard event channel disconnected");
                    break;
                }
            }
        }
        applied
    }

    /// Resolve a silent identity provider once its grace period is over.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.pump();
        self.identity.check_timeout(now)
    }

    pub fn on_identity_change(
        &mut self,
        callback: impl FnMut(Option<&Identity>) + 'static,
    ) -> ListenerId {
        self.identity.on_identity_change(callback)
    }

    pub fn on_counts_change(&mut self, callback: impl FnMut(&SlotCounts) + 'static) -> ListenerId {
        self.subscriptions.on_counts_change(callback)
    }

    pub fn on_error(&mut self, callback: impl FnMut(&SubscriptionFailure) + 'static) -> ListenerId {
        self.subscriptions.on_error(callback)
    }

    pub fn remove_identity_listener(&mut self, id: ListenerId) -> bool {
        self.identity.remove_listener(id)
    }

    pub fn remove_counts_listener(&mut self, id: ListenerId) -> bool {
        self.subscriptions.remove_counts_listener(id)
    }

    pub fn remove_error_listener(&mut self, id: ListenerId) -> bool {
        self.subscriptions.remove_error_listener(id)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.current()
    }

    pub fn identity_status(&self) -> IdentityStatus {
        self.identity.status()
    }

    pub fn counts(&self) -> SlotCounts {
        self.subscriptions.counts()
    }

    pub fn badges(&self) -> Badges {
        compute_badges(&self.subscriptions.counts())
    }

    pub fn tab_state(&self) -> TabState {
        self.tabs.state()
    }

    pub fn active_view(&self) -> Option<View> {
        self.tabs.active_view()
    }

    pub fn menu(&self) -> &Menu {
        self.tabs.menu()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn subscription_stats(&self) -> SharedSubscriptionStats {
        self.subscriptions.stats()
    }

    pub fn is_mounted(&self) -> bool {
        self.provider_handle.is_some()
    }

    pub fn content(&self) -> RenderedView {
        self.dispatcher
            .dispatch(self.tabs.menu(), self.tabs.active_index(), self.identity.current())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let signed_in = self.identity.is_signed_in();
        let badges = self.badges();
        let state = self.tabs.state();

        let menu = self
            .tabs
            .menu()
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| MenuEntryView {
                index,
                view: item.view,
                name: item.name,
                enabled: self.tabs.is_enabled(index, signed_in),
                active: index == state.active_index,
                badge: badges.for_view(item.view),
            })
            .collect();

        let failed_slots = Slot::ALL
            .into_iter()
            .filter(|slot| self.subscriptions.failure(*slot).is_some())
            .collect();

        DashboardSnapshot {
            location: self.location.clone(),
            identity_status: self.identity.status(),
            signed_in,
            header: self.identity.current().map(|identity| HeaderView {
                greeting_name: identity.greeting_name().to_string(),
                avatar: identity.avatar(),
            }),
            active_index: state.active_index,
            active_view: self.tabs.active_view(),
            sidebar_open: state.sidebar_open,
            menu,
            counts: self.subscriptions.counts(),
            badges,
            failed_slots,
            content: self.content(),
        }
    }

    /// Stop listening to the identity provider and cancel every live query.
    /// Safe to call more than once.
    pub fn unmount(&mut self) {
        let Some(handle) = self.provider_handle.take() else {
            return;
        };
        handle.cancel();
        self.subscriptions.shutdown();
        // late deliveries are stale by now
        while self.receiver.try_recv().is_ok() {}
        info!("dashboard unmounted");
    }

    fn apply(&mut self, event: DashboardEvent) {
        if !self.is_mounted() {
            debug!(?event, "dashboard unmounted, ignoring event");
            return;
        }

        match event {
            DashboardEvent::SidebarSelect(idx) => {
                let signed_in = self.identity.is_signed_in();
                if let SelectOutcome::Selected {
                    navigate: Some(target),
                } = self.tabs.select(idx, signed_in, &self.location)
                {
                    self.navigate(target);
                }
            }
            DashboardEvent::UrlChanged(location) => {
                if self.pending_navigations.front() == Some(&location) {
                    self.pending_navigations.pop_front();
                    debug!(%location, "router echoed our navigation");
                    return;
                }
                self.tabs.url_changed(&location);
                self.location = location;
            }
            DashboardEvent::IdentityChanged(profile) => {
                self.identity.report(profile);
                // a repeated report (token refresh) reopens failed slots
                self.subscriptions.set_identity(self.identity.current());
            }
            DashboardEvent::SlotUpdate(update) => {
                self.subscriptions.apply_update(update);
            }
            DashboardEvent::ToggleSidebar => self.tabs.toggle_sidebar(),
            DashboardEvent::CloseSidebar => self.tabs.close_sidebar(),
            DashboardEvent::LogoClick => {
                self.tabs.close_sidebar();
                let target = self.location.at_path(HOME_PATH);
                self.navigate(target);
            }
            DashboardEvent::LoginRedirect => {
                let target = self.location.at_path(LOGIN_PATH);
                self.navigate(target);
            }
        }
    }

    fn navigate(&mut self, target: Location) {
        if self.pending_navigations.len() == MAX_PENDING_NAVIGATIONS {
            if let Some(forgotten) = self.pending_navigations.pop_front() {
                debug!(location = %forgotten, "no echo from router, forgetting navigation");
            }
        }
        self.pending_navigations.push_back(target.clone());
        self.location = target;
        self.navigator.navigate(&self.location);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}
