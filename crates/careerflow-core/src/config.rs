use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DASHBOARD_PATH, IDENTITY_TIMEOUT_MS};
use crate::models::{Menu, MenuError, View};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid menu: {0}")]
    Menu(#[from] MenuError),
    #[error("invalid dashboard path {0:?}: must start with '/' and carry no query or fragment")]
    DashboardPath(String),
}

/// Dashboard configuration. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// Sidebar entries in display order
    pub menu: Vec<View>,
    /// Route the dashboard lives on; sidebar navigation targets it
    pub dashboard_path: String,
    /// Grace period for the identity provider's first report
    pub identity_timeout_ms: u64,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = &self.dashboard_path;
        if !path.starts_with('/') || path.contains(['?', '#']) {
            return Err(ConfigError::DashboardPath(path.clone()));
        }
        self.build_menu().map(|_| ())
    }

    pub fn build_menu(&self) -> Result<Menu, ConfigError> {
        Ok(Menu::new(&self.menu)?)
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            menu: View::ALL.to_vec(),
            dashboard_path: DASHBOARD_PATH.to_string(),
            identity_timeout_ms: IDENTITY_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = DashboardConfig::from_json("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.build_menu().unwrap().settings_index(), Some(10));
        assert_eq!(config.identity_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_custom_menu_order() {
        let json = r#"{"menu": ["people", "settings", "messages"], "identityTimeoutMs": 250}"#;
        let config = DashboardConfig::from_json(json).unwrap();
        let menu = config.build_menu().unwrap();
        assert_eq!(menu.settings_index(), Some(1));
        assert_eq!(config.identity_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_menu_is_rejected() {
        let err = DashboardConfig::from_json(r#"{"menu": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Menu(MenuError::Empty)));

        let err = DashboardConfig::from_json(r#"{"menu": ["jobs", "jobs"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Menu(MenuError::Duplicate(View::Jobs))));
    }

    #[test]
    fn test_invalid_dashboard_path_is_rejected() {
        for path in ["dashboard", "", "/dashboard?tab=settings", "/dashboard#top"] {
            let json = format!(r#"{{"dashboardPath": "{}"}}"#, path);
            let err = DashboardConfig::from_json(&json).unwrap_err();
            assert!(matches!(err, ConfigError::DashboardPath(ref p) if p == path));
        }
        assert!(DashboardConfig::from_json(r#"{"dashboardPath": "/app/dashboard"}"#).is_ok());
    }

    #[test]
    fn test_unknown_view_is_a_parse_error() {
        let err = DashboardConfig::from_json(r#"{"menu": ["people", "arcade"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dashboardPath": "/home"}}"#).unwrap();
        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.dashboard_path, "/home");

        let missing = DashboardConfig::load(Path::new("/nonexistent/careerflow.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
