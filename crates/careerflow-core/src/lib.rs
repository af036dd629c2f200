pub mod badges;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod dispatcher;
pub mod events;
pub mod identity;
pub mod live_query;
pub mod memory;
pub mod models;
pub mod stats;
pub mod subscriptions;
pub mod tabs;

// Re-export the mounting surface at crate root for convenience
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{Dashboard, DashboardServices, DashboardSnapshot};
pub use events::DashboardEvent;
pub use models::{Identity, Location, ProviderProfile, View};
