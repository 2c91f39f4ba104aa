//! Cart
//!
//! Cart totals are recomputed from the full set of selections on every
//! change; there is no incremental update path.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{Catalog, OptionKind, SponsorOption},
    dates::{DateRange, DateRangeError},
    pricing::{
        MINIMUM_CHECKOUT_TOTAL, PricingError, Quantity, QuantityItem, price_date_range,
        price_quantity_item, to_money, total_price,
    },
    slots::SlotId,
};

/// Errors raised while building or pricing a cart.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// A submitted range could not be parsed.
    #[error("invalid range for slot {slot}: {source}")]
    InvalidRange {
        /// Slot the range was submitted for
        slot: SlotId,
        /// Parse failure
        #[source]
        source: DateRangeError,
    },

    /// Errors bubbled up from pricing.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Raw form submission, before any parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormInput {
    /// Ticked option keys
    #[serde(default)]
    pub options: Vec<String>,

    /// Slot id -> range in `YYYY-MM-DD — YYYY-MM-DD` form
    #[serde(default)]
    pub ranges: FxHashMap<String, String>,

    /// Option key -> quantity as typed
    #[serde(default)]
    pub quantities: FxHashMap<String, String>,

    /// Terms of service accepted
    #[serde(default)]
    pub consent: bool,
}

/// Parsed cart selections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selections {
    options: Vec<String>,
    ranges: FxHashMap<SlotId, DateRange>,
    quantities: FxHashMap<String, Quantity>,
    consent: bool,
}

impl Selections {
    /// Creates empty selections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a form submission.
    ///
    /// Blank ranges are treated as not yet picked; quantities fall back to one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRange`] for a range that cannot be parsed.
    pub fn from_form(form: &FormInput) -> Result<Self, CartError> {
        let mut selections = Self::new();

        for key in &form.options {
            selections.toggle_on(key.trim());
        }

        for (slot, raw) in &form.ranges {
            if raw.trim().is_empty() {
                continue;
            }

            let slot = SlotId::new(slot.trim());
            let range = raw
                .parse::<DateRange>()
                .map_err(|source| CartError::InvalidRange {
                    slot: slot.clone(),
                    source,
                })?;

            selections.ranges.insert(slot, range);
        }

        for (key, raw) in &form.quantities {
            selections
                .quantities
                .insert(key.trim().to_string(), Quantity::parse(Some(raw.as_str())));
        }

        selections.consent = form.consent;

        Ok(selections)
    }

    /// Ticks an option.
    pub fn toggle_on(&mut self, key: &str) {
        if !self.is_selected(key) {
            self.options.push(key.to_string());
        }
    }

    /// Unticks an option, dropping its quantity and any ranges picked for its slots.
    pub fn toggle_off(&mut self, catalog: &Catalog, key: &str) {
        self.options.retain(|selected| selected != key);
        self.quantities.remove(key);

        if let Some(option) = catalog.option(key) {
            for slot in option.slots() {
                self.ranges.remove(slot);
            }
        }
    }

    /// Sets the range picked for a slot.
    pub fn set_range(&mut self, slot: impl Into<SlotId>, range: DateRange) {
        self.ranges.insert(slot.into(), range);
    }

    /// Removes the range picked for a slot.
    pub fn clear_range(&mut self, slot: &str) {
        self.ranges.remove(slot);
    }

    /// Sets the quantity of an option.
    pub fn set_quantity(&mut self, key: &str, quantity: Quantity) {
        self.quantities.insert(key.to_string(), quantity);
    }

    /// Records whether the terms were accepted.
    pub fn set_consent(&mut self, consent: bool) {
        self.consent = consent;
    }

    /// Whether an option is ticked
    pub fn is_selected(&self, key: &str) -> bool {
        self.options.iter().any(|selected| selected == key)
    }

    /// Ticked option keys, in the order they were ticked
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(String::as_str)
    }

    /// Range picked for a slot
    pub fn range(&self, slot: &str) -> Option<&DateRange> {
        self.ranges.get(slot)
    }

    /// Quantity of an option, one when never set
    pub fn quantity(&self, key: &str) -> Quantity {
        self.quantities.get(key).copied().unwrap_or_default()
    }

    /// Whether the terms were accepted
    pub fn consent(&self) -> bool {
        self.consent
    }
}

/// What a cart line charges for.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// A flat-fee option.
    Flat,

    /// A quantity option.
    Quantity(Quantity),

    /// A slot booked over a range.
    Reservation {
        /// Booked slot
        slot: SlotId,
        /// Booked days
        range: DateRange,
    },
}

/// A priced cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    /// Option key
    pub key: String,

    /// Option label, or slot label for reservations
    pub label: String,

    /// What is charged
    pub kind: LineKind,

    /// Line amount
    pub amount: Money<'static, Currency>,
}

/// Priced cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartTotal {
    lines: Vec<CartLine>,
    total: Money<'static, Currency>,
}

impl CartTotal {
    /// Priced lines, in selection order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of all lines
    pub fn total(&self) -> &Money<'static, Currency> {
        &self.total
    }

    /// Reservation lines only
    pub fn reservations(&self) -> impl Iterator<Item = &CartLine> {
        self.lines
            .iter()
            .filter(|line| matches!(line.kind, LineKind::Reservation { .. }))
    }

    /// Whether the cart may proceed to checkout given the consent flag.
    pub fn can_checkout(&self, consent_given: bool) -> bool {
        can_checkout(&self.total, consent_given)
    }
}

/// Checkout gate: the total reaches one cent and the terms were accepted.
pub fn can_checkout(total: &Money<'_, Currency>, consent_given: bool) -> bool {
    consent_given && Decimal::new(total.to_minor_units(), 2) >= MINIMUM_CHECKOUT_TOTAL
}

/// Prices every selection against the catalog.
///
/// Flat options contribute their price, quantity options `price * quantity`,
/// and dated options the prorated price of each of their slots that has a
/// range picked. A dated option without a valid range contributes nothing;
/// unknown option keys are ignored.
///
/// # Errors
///
/// Returns [`CartError::Pricing`] if an amount overflows.
pub fn compute_cart_total(
    catalog: &Catalog,
    selections: &Selections,
) -> Result<CartTotal, CartError> {
    let currency = catalog.currency();
    let mut lines = Vec::new();

    for option in selections.options().filter_map(|key| catalog.option(key)) {
        match option.kind() {
            OptionKind::Flat => lines.push(CartLine {
                key: option.key().to_string(),
                label: option.label().to_string(),
                kind: LineKind::Flat,
                amount: to_money(option.price(), currency)?,
            }),
            OptionKind::Quantity => {
                let quantity = selections.quantity(option.key());
                let amount = price_quantity_item(&QuantityItem::new(option.price(), quantity))?;

                lines.push(CartLine {
                    key: option.key().to_string(),
                    label: option.label().to_string(),
                    kind: LineKind::Quantity(quantity),
                    amount: to_money(amount, currency)?,
                });
            }
            OptionKind::Dated(_) => reservation_lines(catalog, selections, option, &mut lines)?,
        }
    }

    let amounts: Vec<Money<'static, Currency>> = lines.iter().map(|line| line.amount.clone()).collect();
    let total = total_price(&amounts, currency)?;

    Ok(CartTotal { lines, total })
}

fn reservation_lines(
    catalog: &Catalog,
    selections: &Selections,
    option: &SponsorOption,
    lines: &mut Vec<CartLine>,
) -> Result<(), CartError> {
    for slot_id in option.slots() {
        let slot = catalog.slot(slot_id.as_str());
        let range = selections.range(slot_id.as_str());

        let (Some(slot), Some(range)) = (slot, range) else {
            continue;
        };

        let amount = match price_date_range(slot, range) {
            Ok(amount) => amount,
            Err(PricingError::TooShort { .. }) => continue,
            Err(err) => return Err(err.into()),
        };

        lines.push(CartLine {
            key: option.key().to_string(),
            label: slot.label().to_string(),
            kind: LineKind::Reservation {
                slot: slot.id().clone(),
                range: *range,
            },
            amount: to_money(amount, catalog.currency())?,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    fn usd(minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, USD)
    }

    #[test]
    fn empty_cart_is_zero_and_blocked() -> TestResult {
        let catalog = Catalog::standard()?;
        let cart = compute_cart_total(&catalog, &Selections::new())?;

        assert_eq!(cart.total(), &usd(0));
        assert!(cart.lines().is_empty());
        assert!(!cart.can_checkout(true));

        Ok(())
    }

    #[test]
    fn sums_flat_quantity_and_dated() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("pod_full");
        selections.toggle_on("link_guest");
        selections.set_quantity("link_guest", Quantity::new(2));
        selections.toggle_on("ad_home");
        selections.set_range("ad_home", DateRange::new(date(2025, 9, 1), date(2025, 9, 10))?);

        let cart = compute_cart_total(&catalog, &selections)?;

        // 1500 + 2 * 150 + 428.55
        assert_eq!(cart.total(), &usd(222_855));
        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.reservations().count(), 1);

        Ok(())
    }

    #[test]
    fn dated_option_without_range_adds_nothing() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("ad_side");

        let cart = compute_cart_total(&catalog, &selections)?;

        assert_eq!(cart.total(), &usd(0));

        Ok(())
    }

    #[test]
    fn short_range_adds_nothing() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("link_pinned");
        selections.set_range("link_pinned_1", DateRange::new(date(2025, 9, 1), date(2025, 9, 20))?);
        selections.set_range("link_pinned_2", DateRange::new(date(2025, 9, 1), date(2025, 9, 30))?);

        let cart = compute_cart_total(&catalog, &selections)?;

        assert_eq!(cart.total(), &usd(50_000));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(
            cart.lines().first().map(|line| line.label.as_str()),
            Some("30-Day Pinned Slot 2")
        );

        Ok(())
    }

    #[test]
    fn every_pinned_slot_is_priced() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("link_pinned");

        for slot in ["link_pinned_1", "link_pinned_2", "link_pinned_3", "link_pinned_4"] {
            selections.set_range(slot, DateRange::new(date(2025, 9, 1), date(2025, 9, 30))?);
        }

        let cart = compute_cart_total(&catalog, &selections)?;

        assert_eq!(cart.total(), &usd(200_000));

        Ok(())
    }

    #[test]
    fn ranges_for_unticked_options_are_ignored() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.set_range("ad_home", DateRange::new(date(2025, 9, 1), date(2025, 9, 7))?);

        assert_eq!(compute_cart_total(&catalog, &selections)?.total(), &usd(0));

        Ok(())
    }

    #[test]
    fn unknown_options_are_ignored() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("vid_comm");
        selections.toggle_on("mystery_box");

        assert_eq!(compute_cart_total(&catalog, &selections)?.total(), &usd(15_000));

        Ok(())
    }

    #[test]
    fn recompute_is_idempotent() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("vid_full");
        selections.toggle_on("link_backlink");
        selections.toggle_on("ad_side");
        selections.set_range("ad_side", DateRange::new(date(2025, 9, 1), date(2025, 9, 14))?);

        let first = compute_cart_total(&catalog, &selections)?;
        let second = compute_cart_total(&catalog, &selections)?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn toggle_off_clears_ranges_and_quantity() -> TestResult {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("ad_home");
        selections.set_range("ad_home", DateRange::new(date(2025, 9, 1), date(2025, 9, 7))?);
        selections.toggle_on("link_backlink");
        selections.set_quantity("link_backlink", Quantity::new(5));

        selections.toggle_off(&catalog, "ad_home");
        selections.toggle_off(&catalog, "link_backlink");

        assert!(!selections.is_selected("ad_home"));
        assert!(selections.range("ad_home").is_none());
        assert_eq!(selections.quantity("link_backlink"), Quantity::ONE);
        assert_eq!(compute_cart_total(&catalog, &selections)?.total(), &usd(0));

        Ok(())
    }

    #[test]
    fn toggle_on_is_idempotent() {
        let mut selections = Selections::new();

        selections.toggle_on("vid_comm");
        selections.toggle_on("vid_comm");

        assert_eq!(selections.options().count(), 1);
    }

    #[test]
    fn from_form_parses_boundary_input() -> TestResult {
        let form: FormInput = serde_norway::from_str(
            r#"
options: [ad_home, link_backlink, ad_side]
ranges:
  ad_home: "2025-09-01 — 2025-09-07"
  ad_side: ""
quantities:
  link_backlink: "abc"
consent: true
"#,
        )?;

        let selections = Selections::from_form(&form)?;

        assert_eq!(
            selections.range("ad_home"),
            Some(&DateRange::new(date(2025, 9, 1), date(2025, 9, 7))?)
        );
        assert!(selections.range("ad_side").is_none());
        assert_eq!(selections.quantity("link_backlink"), Quantity::ONE);
        assert!(selections.consent());

        Ok(())
    }

    #[test]
    fn from_form_rejects_bad_range() {
        let mut form = FormInput::default();
        form.ranges
            .insert("ad_home".to_string(), "2025-09-07 — 2025-09-01".to_string());

        assert!(matches!(
            Selections::from_form(&form),
            Err(CartError::InvalidRange { slot, .. }) if slot.as_str() == "ad_home"
        ));
    }

    #[test]
    fn checkout_gate() {
        assert!(can_checkout(&usd(1), true));
        assert!(!can_checkout(&usd(1), false));
        assert!(!can_checkout(&usd(0), true));
    }
}
