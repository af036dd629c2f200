//! Application-wide constants
//!
//! Collection and field names used by the live subscriptions, plus the URL
//! vocabulary the dashboard understands.

/// Route the dashboard is mounted on
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Landing page behind the logo
pub const HOME_PATH: &str = "/";

/// Where a signed-out visitor is sent
pub const LOGIN_PATH: &str = "/login";

/// Query parameter carrying the forced tab
pub const TAB_QUERY_PARAM: &str = "tab";

/// The only recognized value of the `tab` parameter
pub const SETTINGS_TAB_VALUE: &str = "settings";

/// How long to wait for the identity provider's first report before
/// treating the user as signed out.
pub const IDENTITY_TIMEOUT_MS: u64 = 5_000;

// Live query vocabulary
pub mod collections {
    pub const NOTIFICATIONS: &str = "notifications";
    pub const CONNECTION_REQUESTS: &str = "connectionRequests";
    /// Collection-group name: matches every `.../messages` sub-collection
    pub const MESSAGES: &str = "messages";
}

pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const MENTOR_ID: &str = "mentorId";
    pub const RECEIVER_ID: &str = "receiverId";
    pub const IS_READ: &str = "isRead";
    pub const STATUS: &str = "status";

    pub const STATUS_PENDING: &str = "pending";
}
