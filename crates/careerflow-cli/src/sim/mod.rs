//! Scripted dashboard sessions against the in-memory backends.

pub mod runner;
pub mod script;

pub use runner::{run_script, ErrorRecord, Report, Simulator, SnapshotRecord};
pub use script::{Script, Step};
