//! In-process backends for the external boundaries.
//!
//! These drive the test suites and the simulator binary; production
//! embedders supply their own `LiveQuery`, `IdentityProvider` and
//! `Navigator`.

pub mod history;
pub mod identity;
pub mod store;

pub use history::MemoryHistory;
pub use identity::ManualIdentityProvider;
pub use store::MemoryStore;
