//! Pricing
//!
//! Pure price calculations for date-ranged slots and quantity items. Nothing
//! here performs I/O; the same inputs always give the same amount.

use std::num::NonZeroU32;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{
    dates::DateRange,
    slots::{SlotDefinition, SlotId},
};

/// Smallest total that can be checked out.
pub const MINIMUM_CHECKOUT_TOTAL: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Errors that can occur while pricing.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// The range is shorter than the slot's minimum booking.
    #[error("slot {slot} needs at least {min_days} days, got {days}")]
    TooShort {
        /// Slot being priced
        slot: SlotId,
        /// Inclusive day count of the range
        days: u32,
        /// Minimum day count of the slot
        min_days: u32,
    },

    /// Decimal arithmetic or minor unit conversion overflowed.
    #[error("price calculation overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Rounds an amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices a booking of `range` on `slot`.
///
/// The base price covers the slot's minimum; each further day costs the
/// slot's per-day rate. The sum is rounded to cents once, at the end.
///
/// # Errors
///
/// - [`PricingError::TooShort`]: the range covers fewer days than the slot minimum.
/// - [`PricingError::Overflow`]: the amount cannot be represented.
pub fn price_date_range(slot: &SlotDefinition, range: &DateRange) -> Result<Decimal, PricingError> {
    let days = range.day_count();

    if days < slot.min_days() {
        return Err(PricingError::TooShort {
            slot: slot.id().clone(),
            days,
            min_days: slot.min_days(),
        });
    }

    let extra_days = Decimal::from(days.saturating_sub(slot.min_days()));

    let price = extra_days
        .checked_mul(slot.per_day_rate())
        .and_then(|extra| slot.base_price().checked_add(extra))
        .ok_or(PricingError::Overflow)?;

    Ok(round_money(price))
}

/// Number of units ordered of a quantity-driven option. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Quantity = Quantity(NonZeroU32::MIN);

    /// Builds a quantity, falling back to one for zero or negative input.
    pub fn new(value: i64) -> Self {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map_or(Self::ONE, Self)
    }

    /// Reads a quantity from raw form input, falling back to one when the
    /// input is absent, non-numeric, zero or negative.
    ///
    /// The whole trimmed input must be an integer: `"2.5"` and `"3abc"` are
    /// rejected and fall back to one rather than being truncated.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map_or(Self::ONE, Self::new)
    }

    /// The quantity as an integer.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

/// A fixed-price option bought in some quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityItem {
    /// Price of a single unit
    pub unit_price: Decimal,

    /// Units ordered
    pub quantity: Quantity,
}

impl QuantityItem {
    /// Creates a quantity item.
    pub fn new(unit_price: Decimal, quantity: Quantity) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }
}

/// Prices a quantity item as `unit_price * quantity`, rounded to cents.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the product cannot be represented.
pub fn price_quantity_item(item: &QuantityItem) -> Result<Decimal, PricingError> {
    item.unit_price
        .checked_mul(Decimal::from(item.quantity.get()))
        .map(round_money)
        .ok_or(PricingError::Overflow)
}

/// Converts a decimal amount into money in the given currency.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the amount does not fit in minor units.
pub fn to_money(
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let minor_units = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| round_money(value).round_dp(0).to_i64())
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Sums a list of prices in the given currency.
///
/// # Errors
///
/// Returns [`PricingError::Money`] on a currency mismatch.
pub fn total_price<'a>(
    prices: &[Money<'a, Currency>],
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, PricingError> {
    let total = prices
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, price| acc.add(*price))?;

    Ok(total)
}
