//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! prior authorization test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built claims, partner payloads, and status bodies
//! - `builders`: Builder for canonical claims
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use generators::*;
