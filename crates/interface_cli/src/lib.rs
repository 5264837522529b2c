//! Prior Authorization CLI
//!
//! Process wiring for the `prior-auth` binary: configuration loading and
//! the offline convert, revert and status commands.

pub mod config;
pub mod commands;

pub use config::AppConfig;
pub use commands::{convert, revert, describe_status, StatusReport};
