//! Core Kernel - Foundational types and utilities for the prior authorization bridge
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Strongly-typed identifiers
//! - Wire date handling (`yyyy-MM-dd`) and service periods
//! - Port abstractions for external collaborators

pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use temporal::{DatePeriod, TemporalError, WIRE_DATE_FORMAT, parse_wire_date, format_wire_date};
pub use identifiers::{ClaimId, ResourceId};
pub use ports::{PortError, DomainPort};
pub use error::CoreError;
