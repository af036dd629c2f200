use serde::{Deserialize, Serialize};

/// Raw profile as reported by the identity provider.
///
/// Every field except `uid` is optional because providers omit them freely
/// (anonymous sign-ins have no email, most accounts have no photo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ProviderProfile {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// Normalized signed-in identity. Replaced wholesale on every sign-in change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn from_profile(profile: ProviderProfile) -> Self {
        let avatar_url = profile
            .photo_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Self {
            id: profile.uid,
            display_name: profile.display_name.unwrap_or_default(),
            email: profile.email.unwrap_or_default(),
            avatar_url,
        }
    }

    /// Name shown in the header greeting: display name, falling back to email.
    pub fn greeting_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }

    pub fn avatar(&self) -> Avatar {
        match &self.avatar_url {
            Some(url) => Avatar::Image(url.clone()),
            None => Avatar::Initial(avatar_initial(&self.display_name, &self.email)),
        }
    }
}

/// What the header renders in the avatar bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Avatar {
    Image(String),
    Initial(char),
}

/// First character of `name`, else of `email`, uppercased; `'?'` when both are empty.
pub fn avatar_initial(name: &str, email: &str) -> char {
    name.chars()
        .next()
        .or_else(|| email.chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('?')
}
