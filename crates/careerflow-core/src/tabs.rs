//! Active-view selection.
//!
//! Three inputs move the active index: sidebar clicks, URL changes
//! (navigation, back/forward, typed URLs) and the initial load. The URL
//! only ever forces the Settings entry; any other URL leaves the index
//! alone. Sidebar clicks win for every other target and write the URL back
//! so that back/forward keeps working.

use serde::Serialize;
use tracing::debug;

use crate::constants::{DASHBOARD_PATH, SETTINGS_TAB_VALUE};
use crate::models::{Location, Menu, TabOverride, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    pub active_index: usize,
    pub sidebar_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Out of range, or disabled while signed out.
    Ignored,
    /// Index updated; navigate when the URL must follow.
    Selected { navigate: Option<Location> },
}

pub struct TabStateController {
    menu: Menu,
    state: TabState,
    /// Path sidebar navigation writes to
    dashboard_path: String,
}

impl TabStateController {
    pub fn new(menu: Menu) -> Self {
        Self {
            menu,
            state: TabState::default(),
            dashboard_path: DASHBOARD_PATH.to_string(),
        }
    }

    pub fn with_dashboard_path(mut self, path: &str) -> Self {
        self.dashboard_path = path.to_string();
        self
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index
    }

    pub fn active_view(&self) -> Option<View> {
        self.menu.get(self.state.active_index).map(|item| item.view)
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn is_enabled(&self, idx: usize, signed_in: bool) -> bool {
        self.menu
            .get(idx)
            .is_some_and(|item| signed_in || !item.requires_auth)
    }

    /// Start on the first entry, then let the URL override it.
    pub fn initial_load(&mut self, location: &Location) {
        self.state.active_index = 0;
        self.url_changed(location);
    }

    /// Returns true if the URL moved the active index.
    pub fn url_changed(&mut self, location: &Location) -> bool {
        match location.tab_override() {
            Some(TabOverride::Settings) => match self.menu.settings_index() {
                Some(idx) => {
                    let changed = self.state.active_index != idx;
                    self.state.active_index = idx;
                    changed
                }
                None => {
                    debug!("settings tab requested but menu has no settings entry");
                    false
                }
            },
            None => false,
        }
    }

    pub fn select(&mut self, idx: usize, signed_in: bool, current: &Location) -> SelectOutcome {
        let Some(item) = self.menu.get(idx) else {
            debug!(idx, len = self.menu.len(), "ignoring out-of-range selection");
            return SelectOutcome::Ignored;
        };
        if item.requires_auth && !signed_in {
            debug!(idx, view = ?item.view, "ignoring selection of disabled entry");
            return SelectOutcome::Ignored;
        }

        let is_settings = item.view == View::Settings;
        self.state.active_index = idx;
        self.state.sidebar_open = false;

        let base = current.with_path(&self.dashboard_path);
        let navigate = if is_settings {
            let target = base.with_tab(SETTINGS_TAB_VALUE);
            (target != *current).then_some(target)
        } else if current.tab().is_some() {
            Some(base.without_tab())
        } else {
            None
        };

        SelectOutcome::Selected { navigate }
    }

    pub fn toggle_sidebar(&mut self) {
        self.state.sidebar_open = !self.state.sidebar_open;
    }

    pub fn close_sidebar(&mut self) {
        self.state.sidebar_open = false;
    }
}
