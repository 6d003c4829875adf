pub mod api;
pub mod config;
pub mod errors;
pub mod telemetry;

pub use libcordon::prelude as core;
