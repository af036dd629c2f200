pub mod identity;
pub mod location;
pub mod menu;

pub use identity::{avatar_initial, Avatar, Identity, ProviderProfile};
pub use location::{Location, LocationError, Navigator, TabOverride};
pub use menu::{Menu, MenuError, MenuItem, View};
