pub mod config;
pub mod identity;
pub mod object_store;
pub mod telemetry;
