pub mod sim;
pub mod tracing_setup;
