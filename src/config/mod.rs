//! Run configuration and environment parsing

pub mod env;
pub mod types;

pub use env::{ConfigError, parse_bulk_payload, parse_status_filters};
pub use types::{AppConfig, BulkUrl};
