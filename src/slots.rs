//! Slots

use std::{borrow::Borrow, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::round_money;

/// Errors raised while defining a slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlotError {
    /// A slot must cover at least one day.
    #[error("slot {0} must have a minimum booking of at least one day")]
    ZeroMinDays(SlotId),

    /// The base price must be strictly positive.
    #[error("slot {0} has non-positive base price {1}")]
    NonPositivePrice(SlotId, Decimal),

    /// An explicit per-day rate cannot be negative.
    #[error("slot {0} has negative per-day rate {1}")]
    NegativeRate(SlotId, Decimal),
}

/// Identifier of a bookable slot, e.g. `ad_home` or `link_pinned_3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a slot identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SlotId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Static pricing parameters for one bookable slot.
///
/// `base_price` pays for exactly `min_days` days. Days beyond the minimum are
/// billed at `per_day_rate`, which is fixed once when the slot is defined so
/// every booking uses the same rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDefinition {
    id: SlotId,
    label: String,
    base_price: Decimal,
    min_days: u32,
    per_day_rate: Decimal,
}

impl SlotDefinition {
    /// Defines a slot, deriving the per-day rate as `base_price / min_days`
    /// rounded half-up to cents.
    ///
    /// # Errors
    ///
    /// - [`SlotError::ZeroMinDays`]: `min_days` is zero.
    /// - [`SlotError::NonPositivePrice`]: `base_price` is zero or negative.
    pub fn new(
        id: impl Into<SlotId>,
        label: impl Into<String>,
        base_price: Decimal,
        min_days: u32,
    ) -> Result<Self, SlotError> {
        let id = id.into();

        if min_days == 0 {
            return Err(SlotError::ZeroMinDays(id));
        }

        if base_price <= Decimal::ZERO {
            return Err(SlotError::NonPositivePrice(id, base_price));
        }

        let per_day_rate = round_money(base_price / Decimal::from(min_days));

        Ok(Self {
            id,
            label: label.into(),
            base_price,
            min_days,
            per_day_rate,
        })
    }

    /// Replaces the derived per-day rate with a fixed, published rate.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::NegativeRate`] if `rate` is negative.
    pub fn with_per_day_rate(mut self, rate: Decimal) -> Result<Self, SlotError> {
        if rate < Decimal::ZERO {
            return Err(SlotError::NegativeRate(self.id, rate));
        }

        self.per_day_rate = round_money(rate);

        Ok(self)
    }

    /// Slot identifier
    pub fn id(&self) -> &SlotId {
        &self.id
    }

    /// Human readable name shown on receipts
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Price of a booking of exactly `min_days` days
    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    /// Shortest booking accepted, in inclusive days
    pub fn min_days(&self) -> u32 {
        self.min_days
    }

    /// Rate charged for each day past `min_days`
    pub fn per_day_rate(&self) -> Decimal {
        self.per_day_rate
    }
}
