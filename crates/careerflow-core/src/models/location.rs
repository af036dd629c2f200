use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::constants::{SETTINGS_TAB_VALUE, TAB_QUERY_PARAM};

/// Base used to resolve the app-relative paths the router hands us.
const LOCATION_BASE: &str = "http://careerflow.local/";

#[derive(Debug, thiserror::Error)]
#[error("invalid location {input:?}: {source}")]
pub struct LocationError {
    input: String,
    #[source]
    source: url::ParseError,
}

/// Tab the URL asks for, if it asks for a recognized one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOverride {
    Settings,
}

/// Browser location as seen by the dashboard (path plus query string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        let parsed = match Url::parse(input) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(LOCATION_BASE).and_then(|base| base.join(input))
            }
            Err(e) => Err(e),
        };

        parsed.map(|url| Self { url }).map_err(|source| LocationError {
            input: input.to_string(),
            source,
        })
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Raw value of the `tab` query parameter.
    pub fn tab(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == TAB_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
    }

    /// Recognized tab override. Unknown or malformed values are treated as no override.
    pub fn tab_override(&self) -> Option<TabOverride> {
        match self.tab().as_deref() {
            Some(SETTINGS_TAB_VALUE) => Some(TabOverride::Settings),
            Some(other) => {
                debug!(tab = other, "ignoring unrecognized tab parameter");
                None
            }
            None => None,
        }
    }

    pub fn with_tab(&self, value: &str) -> Self {
        let mut pairs = self.pairs_without_tab();
        pairs.push((TAB_QUERY_PARAM.to_string(), value.to_string()));
        self.with_pairs(pairs)
    }

    pub fn without_tab(&self) -> Self {
        self.with_pairs(self.pairs_without_tab())
    }

    /// Same query, different path.
    pub fn with_path(&self, path: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(path);
        Self { url }
    }

    /// Different path with no query at all.
    pub fn at_path(&self, path: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(path);
        url.set_query(None);
        Self { url }
    }

    fn pairs_without_tab(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .filter(|(key, _)| key != TAB_QUERY_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    fn with_pairs(&self, pairs: Vec<(String, String)>) -> Self {
        let mut url = self.url.clone();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        Self { url }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.path())?;
        if let Some(query) = self.url.query().filter(|q| !q.is_empty()) {
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Location {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.to_string()
    }
}

/// Outbound half of the URL boundary: asks the router to move to a location.
///
/// Implementations report every location change back as `UrlChanged`,
/// including the ones the dashboard asked for. The dashboard matches those
/// echoes against its own navigations in order and does not re-apply them.
pub trait Navigator {
    fn navigate(&self, location: &Location);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relative_location() {
        let location = Location::parse("/dashboard?tab=settings").unwrap();
        assert_eq!(location.path(), "/dashboard");
        assert_eq!(location.tab().as_deref(), Some("settings"));
        assert_eq!(location.tab_override(), Some(TabOverride::Settings));
        assert_eq!(location.to_string(), "/dashboard?tab=settings");
    }

    #[test]
    fn test_unknown_tab_is_not_an_override() {
        let location = Location::parse("/dashboard?tab=SETTINGS").unwrap();
        assert_eq!(location.tab_override(), None);

        let empty = Location::parse("/dashboard?tab=").unwrap();
        assert_eq!(empty.tab_override(), None);

        let absent = Location::parse("/dashboard").unwrap();
        assert_eq!(absent.tab(), None);
    }

    #[test]
    fn test_without_tab_keeps_other_params() {
        let location = Location::parse("/dashboard?ref=mail&tab=settings").unwrap();
        let cleared = location.without_tab();
        assert_eq!(cleared.to_string(), "/dashboard?ref=mail");

        let only_tab = Location::parse("/dashboard?tab=settings").unwrap();
        assert_eq!(only_tab.without_tab().to_string(), "/dashboard");
    }

    #[test]
    fn test_at_path_drops_query() {
        let location = Location::parse("/dashboard?ref=mail&tab=settings").unwrap();
        assert_eq!(location.at_path("/").to_string(), "/");
        assert_eq!(location.at_path("/login").to_string(), "/login");
    }

    #[test]
    fn test_with_tab_replaces_existing_value() {
        let location = Location::parse("/dashboard?tab=jobs").unwrap();
        assert_eq!(location.with_tab("settings").to_string(), "/dashboard?tab=settings");
    }

    #[test]
    fn test_absolute_urls_are_accepted() {
        let location = Location::parse("https://careerflow.app/dashboard?tab=settings").unwrap();
        assert_eq!(location.to_string(), "/dashboard?tab=settings");
    }

    #[test]
    fn test_location_serde_uses_relative_form() {
        let location: Location = serde_json::from_str("\"/dashboard?tab=settings\"").unwrap();
        assert_eq!(
            serde_json::to_string(&location).unwrap(),
            "\"/dashboard?tab=settings\""
        );
    }
}
