//! Wire date handling
//!
//! Every date exchanged with the partner API uses the `yyyy-MM-dd` format.
//! Parsing is strict (no trimming of time components, no alternative
//! layouts) so callers can decide how to degrade on malformed input.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `chrono` format string for wire dates (`yyyy-MM-dd`)
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid date '{value}': expected yyyy-MM-dd")]
    InvalidDate {
        value: String,
    },

    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Date overflow adding {days} days to {start}")]
    Overflow {
        start: NaiveDate,
        days: u32,
    },
}

/// Parses a `yyyy-MM-dd` wire date
pub fn parse_wire_date(value: &str) -> Result<NaiveDate, TemporalError> {
    NaiveDate::parse_from_str(value, WIRE_DATE_FORMAT).map_err(|_| TemporalError::InvalidDate {
        value: value.to_string(),
    })
}

/// Formats a date as a `yyyy-MM-dd` wire date
pub fn format_wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// A service period with optional bounds
///
/// Either side may be missing: a partner payload can carry a parseable start
/// and a malformed end, and each side degrades independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatePeriod {
    /// Start of the period (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// End of the period (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DatePeriod {
    /// Creates a period with both bounds, rejecting inverted ranges
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Creates a window of `days` days starting at `start`
    pub fn window(start: NaiveDate, days: u32) -> Result<Self, TemporalError> {
        let end = start
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(TemporalError::Overflow { start, days })?;
        Self::new(start, end)
    }

    /// Builds a period from optional wire strings, dropping unparseable sides
    ///
    /// Returns `None` when neither side parses.
    pub fn from_wire(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        let period = Self {
            start: start.and_then(|s| parse_wire_date(s).ok()),
            end: end.and_then(|s| parse_wire_date(s).ok()),
        };
        if period.is_empty() {
            None
        } else {
            Some(period)
        }
    }

    /// Returns true if neither bound is set
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}
