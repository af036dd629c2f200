use std::path::Path;

use anyhow::{Context, Result};
use careerflow_core::{Location, ProviderProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scripted session: where the browser starts and what happens next.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Initial URL; the configured dashboard path when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Location>,
    pub steps: Vec<Step>,
}

/// One simulated input. Tagged by `step` in the JSON form:
/// `{"step": "select", "index": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "step")]
pub enum Step {
    /// Identity provider reports a signed-in user (also used for token refresh)
    SignIn { user: ProviderProfile },
    SignOut,
    Put {
        path: String,
        id: String,
        fields: Value,
    },
    /// Insert under a generated id
    Add { path: String, fields: Value },
    Update {
        path: String,
        id: String,
        fields: Value,
    },
    Delete { path: String, id: String },
    /// Sidebar click
    Select { index: usize },
    /// Typed URL or followed link
    Navigate { location: Location },
    Back,
    Forward,
    ToggleSidebar,
    CloseSidebar,
    /// Header logo click
    LogoClick,
    LoginRedirect,
    FailCollection {
        collection: String,
        #[serde(default = "default_reason")]
        reason: String,
    },
    HealCollection { collection: String },
    /// Let time pass since mount, for the identity timeout
    Tick {
        #[serde(rename = "afterMs")]
        after_ms: u64,
    },
    Snapshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

fn default_reason() -> String {
    "backend unavailable".to_string()
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse script file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize script")
    }
}
