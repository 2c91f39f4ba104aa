//! Date Ranges

use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator used when a range is shown to a customer, e.g. `2025-09-01 — 2025-09-07`.
pub const RANGE_SEPARATOR: &str = " — ";

/// Errors raised while building or parsing a [`DateRange`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateRangeError {
    /// The start of the range falls after its end.
    #[error("range start {from} is after range end {to}")]
    Inverted {
        /// Requested first day
        from: Date,
        /// Requested last day
        to: Date,
    },

    /// One side of the range is not a `YYYY-MM-DD` date.
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    /// The input is not two dates joined by a separator.
    #[error("expected `FROM — TO`, got: {0:?}")]
    Malformed(String),
}

/// An inclusive range of calendar days.
///
/// Both ends are plain dates without a time of day, and `from <= to` always
/// holds, so a range covers at least one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    from: Date,
    to: Date,
}

#[derive(Debug, Deserialize)]
struct RawDateRange {
    from: Date,
    to: Date,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DateRangeError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.from, raw.to)
    }
}

impl DateRange {
    /// Creates a new range covering `from` through `to`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::Inverted`] if `from` is after `to`.
    pub fn new(from: Date, to: Date) -> Result<Self, DateRangeError> {
        if from > to {
            return Err(DateRangeError::Inverted { from, to });
        }

        Ok(Self { from, to })
    }

    /// Creates a range covering a single day.
    pub fn single(day: Date) -> Self {
        Self { from: day, to: day }
    }

    /// First day of the range.
    pub fn from(&self) -> Date {
        self.from
    }

    /// Last day of the range.
    pub fn to(&self) -> Date {
        self.to
    }

    /// Number of calendar days covered, counting both ends.
    pub fn day_count(&self) -> u32 {
        let days = self.from.duration_until(self.to).as_hours() / 24;

        u32::try_from(days).map_or(1, |days| days.saturating_add(1))
    }

    /// Whether both ranges share at least one day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: Date) -> bool {
        self.from <= day && day <= self.to
    }

    /// Whether the two ranges overlap or sit on consecutive days.
    pub(crate) fn touches(&self, other: &DateRange) -> bool {
        let after_self = self.to.tomorrow().unwrap_or(self.to);
        let after_other = other.to.tomorrow().unwrap_or(other.to);

        self.from <= after_other && other.from <= after_self
    }

    /// Smallest range covering both ranges.
    pub(crate) fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }

    /// Formats the range as `MM-DD-YYYY — MM-DD-YYYY` for receipts.
    pub fn display_us(&self) -> String {
        format!(
            "{}{RANGE_SEPARATOR}{}",
            self.from.strftime("%m-%d-%Y"),
            self.to.strftime("%m-%d-%Y")
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{RANGE_SEPARATOR}{}", self.from, self.to)
    }
}

impl FromStr for DateRange {
    type Err = DateRangeError;

    /// Parses `YYYY-MM-DD — YYYY-MM-DD`; the ` to ` separator used by
    /// calendar widgets is accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        let (from, to) = trimmed
            .split_once('—')
            .or_else(|| trimmed.split_once(" to "))
            .ok_or_else(|| DateRangeError::Malformed(s.to_string()))?;

        let from = parse_date(from)?;
        let to = parse_date(to)?;

        Self::new(from, to)
    }
}

fn parse_date(s: &str) -> Result<Date, DateRangeError> {
    let trimmed = s.trim();

    trimmed
        .parse::<Date>()
        .map_err(|_err| DateRangeError::InvalidDate(trimmed.to_string()))
}
