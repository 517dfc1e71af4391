//! Process wiring for depot: configuration, backend construction, and
//! telemetry setup shared by the `depot-server` binary.

pub mod config;
pub mod error;
pub mod factory;
pub mod telemetry;
