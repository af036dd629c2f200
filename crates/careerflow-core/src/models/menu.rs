use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Dashboard pages reachable from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    People,
    Jobs,
    Community,
    Scholarships,
    DreamFlowAi,
    Notifications,
    Messages,
    Events,
    ResumeBuilder,
    ResumeAnalyser,
    Settings,
    CollegeFinder,
    TaskReminder,
    Courses,
}

impl View {
    pub const ALL: [View; 14] = [
        View::People,
        View::Jobs,
        View::Community,
        View::Scholarships,
        View::DreamFlowAi,
        View::Notifications,
        View::Messages,
        View::Events,
        View::ResumeBuilder,
        View::ResumeAnalyser,
        View::Settings,
        View::CollegeFinder,
        View::TaskReminder,
        View::Courses,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            View::People => "People",
            View::Jobs => "Jobs",
            View::Community => "Community",
            View::Scholarships => "Scholarships",
            View::DreamFlowAi => "DreamFlow AI",
            View::Notifications => "Notifications",
            View::Messages => "Messages",
            View::Events => "Events",
            View::ResumeBuilder => "Resume Builder",
            View::ResumeAnalyser => "Resume Analyser",
            View::Settings => "Settings",
            View::CollegeFinder => "College Finder",
            View::TaskReminder => "Task Reminder",
            View::Courses => "Courses",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub view: View,
    pub name: &'static str,
    pub requires_auth: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("menu must contain at least one entry")]
    Empty,
    #[error("menu lists {0:?} more than once")]
    Duplicate(View),
}

/// Ordered, immutable sidebar menu.
///
/// The first entry is the always-available home view; every other entry
/// requires a signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(views: &[View]) -> Result<Self, MenuError> {
        if views.is_empty() {
            return Err(MenuError::Empty);
        }

        let mut seen = HashSet::new();
        for view in views {
            if !seen.insert(*view) {
                return Err(MenuError::Duplicate(*view));
            }
        }

        Ok(Self {
            items: build_items(views),
        })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&MenuItem> {
        self.items.get(idx)
    }

    pub fn index_of(&self, view: View) -> Option<usize> {
        self.items.iter().position(|item| item.view == view)
    }

    pub fn settings_index(&self) -> Option<usize> {
        self.index_of(View::Settings)
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self {
            items: build_items(&View::ALL),
        }
    }
}

fn build_items(views: &[View]) -> Vec<MenuItem> {
    views
        .iter()
        .enumerate()
        .map(|(idx, view)| MenuItem {
            view: *view,
            name: view.label(),
            requires_auth: idx != 0,
        })
        .collect()
}
