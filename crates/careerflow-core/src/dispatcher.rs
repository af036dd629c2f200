use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Identity, Menu, View};

/// What a bound page receives from the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageBinding {
    wants_current_user: bool,
    wants_user_name: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RenderedView {
    /// Welcome card asking the visitor to log in.
    SignInRequired,
    Page { view: View, props: PageProps },
    /// No page is bound at this position.
    NotBuilt,
}

/// Static table from menu entry to page component.
pub struct ViewDispatcher {
    bindings: BTreeMap<View, PageBinding>,
}

impl ViewDispatcher {
    pub fn new() -> Self {
        let bindings = View::ALL
            .iter()
            .map(|view| {
                let binding = PageBinding {
                    wants_current_user: matches!(
                        view,
                        View::People
                            | View::Scholarships
                            | View::DreamFlowAi
                            | View::Notifications
                            | View::Messages
                            | View::ResumeAnalyser
                            | View::Settings
                            | View::Courses
                    ),
                    wants_user_name: *view == View::People,
                };
                (*view, binding)
            })
            .collect();
        Self { bindings }
    }

    /// Drop the page for a view; it will dispatch to `NotBuilt`.
    pub fn unbind(&mut self, view: View) -> bool {
        self.bindings.remove(&view).is_some()
    }

    pub fn is_bound(&self, view: View) -> bool {
        self.bindings.contains_key(&view)
    }

    pub fn dispatch(&self, menu: &Menu, active_index: usize, identity: Option<&Identity>) -> RenderedView {
        let Some(identity) = identity else {
            return RenderedView::SignInRequired;
        };
        let Some(view) = menu.get(active_index).map(|item| item.view) else {
            return RenderedView::NotBuilt;
        };
        let Some(binding) = self.bindings.get(&view) else {
            return RenderedView::NotBuilt;
        };

        RenderedView::Page {
            view,
            props: PageProps {
                current_user: binding.wants_current_user.then(|| identity.clone()),
                user_name: binding
                    .wants_user_name
                    .then(|| identity.greeting_name().to_string()),
            },
        }
    }
}

impl Default for ViewDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
