//! Catalog
//!
//! The static table of sponsorship options and bookable slots. A catalog is
//! loaded once at startup and only read afterwards.

use std::{fs, path::Path};

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::iso::{Currency, EUR, GBP, USD};
use serde::Deserialize;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::slots::{SlotDefinition, SlotError, SlotId};

const STANDARD_CATALOG: &str = include_str!("../catalog/standard.yml");

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// An option is priced at zero or less
    #[error("Option {option} has non-positive price {price}")]
    NonPositivePrice {
        /// Option key
        option: String,
        /// Parsed price
        price: Decimal,
    },

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between entries
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// The catalog defines no options
    #[error("Catalog defines no options")]
    Empty,

    /// Two slots share an identifier
    #[error("Duplicate slot: {0}")]
    DuplicateSlot(SlotId),

    /// Two options share a key
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),

    /// An option refers to a slot the catalog does not define
    #[error("Option {option} refers to unknown slot {slot}")]
    UnknownSlotReference {
        /// Option key
        option: String,
        /// Missing slot
        slot: SlotId,
    },

    /// A slot is booked through more than one option
    #[error("Slot {0} is referenced by more than one option")]
    SlotClaimedTwice(SlotId),

    /// A dated option lists no slots
    #[error("Dated option {0} lists no slots")]
    MissingSlots(String),

    /// A flat or quantity option lists slots
    #[error("Option {0} lists slots but is not dated")]
    UnexpectedSlots(String),

    /// Invalid slot definition
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// How an option is priced.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Charged once at the option price.
    Flat,

    /// Charged per unit at the option price.
    Quantity,

    /// Charged per booked slot using the slot's prorated pricing.
    Dated(SmallVec<[SlotId; 4]>),
}

/// A sponsorship option a customer can tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SponsorOption {
    key: String,
    label: String,
    group: String,
    price: Decimal,
    kind: OptionKind,
}

impl SponsorOption {
    /// Option key, e.g. `link_backlink`
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Option label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Heading the option is listed under
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Listed price; the unit price for quantity options
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Pricing kind
    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    /// Slots booked through this option; empty unless the option is dated.
    pub fn slots(&self) -> &[SlotId] {
        match &self.kind {
            OptionKind::Dated(slots) => slots,
            OptionKind::Flat | OptionKind::Quantity => &[],
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    slots: Vec<SlotEntry>,
    options: Vec<OptionEntry>,
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    id: SlotId,
    label: String,
    base_price: String,
    min_days: u32,
    #[serde(default)]
    per_day_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OptionEntry {
    key: String,
    label: String,
    group: String,
    price: String,
    #[serde(default)]
    kind: OptionKindEntry,
    #[serde(default)]
    slots: Vec<SlotId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OptionKindEntry {
    #[default]
    Flat,
    Quantity,
    Dated,
}

/// Sponsorship catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    currency: &'static Currency,
    slots: Vec<SlotDefinition>,
    slot_index: FxHashMap<SlotId, usize>,
    options: Vec<SponsorOption>,
    option_index: FxHashMap<String, usize>,
    slot_owner: FxHashMap<SlotId, usize>,
}

impl Catalog {
    /// Catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog fails validation.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_yaml(STANDARD_CATALOG)
    }

    /// Load a catalog from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[tracing::instrument(name = "catalog.load", skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path.as_ref())?;

        Self::from_yaml(&contents)
    }

    /// Parse a catalog from a YAML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed, mixes currencies,
    /// repeats keys or refers to slots it does not define.
    pub fn from_yaml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_norway::from_str(contents)?;
        let mut currency = CurrencyGuard::default();

        let mut slots = Vec::with_capacity(file.slots.len());
        let mut slot_index = FxHashMap::default();

        for entry in file.slots {
            if slot_index.contains_key(&entry.id) {
                return Err(CatalogError::DuplicateSlot(entry.id));
            }

            let base_price = currency.parse(&entry.base_price)?;
            let mut slot = SlotDefinition::new(entry.id, entry.label, base_price, entry.min_days)?;

            if let Some(rate) = entry.per_day_rate.as_deref() {
                slot = slot.with_per_day_rate(currency.parse(rate)?)?;
            }

            slot_index.insert(slot.id().clone(), slots.len());
            slots.push(slot);
        }

        let mut options = Vec::with_capacity(file.options.len());
        let mut option_index = FxHashMap::default();
        let mut slot_owner = FxHashMap::default();

        for entry in file.options {
            if option_index.contains_key(&entry.key) {
                return Err(CatalogError::DuplicateOption(entry.key));
            }

            let price = currency.parse(&entry.price)?;

            if price <= Decimal::ZERO {
                return Err(CatalogError::NonPositivePrice {
                    option: entry.key,
                    price,
                });
            }

            let kind = match entry.kind {
                OptionKindEntry::Dated if entry.slots.is_empty() => {
                    return Err(CatalogError::MissingSlots(entry.key));
                }
                OptionKindEntry::Dated => {
                    let mut seen = FxHashSet::default();

                    for slot in &entry.slots {
                        if !slot_index.contains_key(slot) {
                            return Err(CatalogError::UnknownSlotReference {
                                option: entry.key,
                                slot: slot.clone(),
                            });
                        }

                        if !seen.insert(slot) || slot_owner.contains_key(slot) {
                            return Err(CatalogError::SlotClaimedTwice(slot.clone()));
                        }
                    }

                    for slot in &entry.slots {
                        slot_owner.insert(slot.clone(), options.len());
                    }

                    OptionKind::Dated(entry.slots.into_iter().collect())
                }
                OptionKindEntry::Flat | OptionKindEntry::Quantity if !entry.slots.is_empty() => {
                    return Err(CatalogError::UnexpectedSlots(entry.key));
                }
                OptionKindEntry::Flat => OptionKind::Flat,
                OptionKindEntry::Quantity => OptionKind::Quantity,
            };

            option_index.insert(entry.key.clone(), options.len());
            options.push(SponsorOption {
                key: entry.key,
                label: entry.label,
                group: entry.group,
                price,
                kind,
            });
        }

        let currency = currency.currency.ok_or(CatalogError::Empty)?;

        if options.is_empty() {
            return Err(CatalogError::Empty);
        }

        debug!(
            slot_count = slots.len(),
            option_count = options.len(),
            currency = currency.iso_alpha_code,
            "loaded catalog"
        );

        Ok(Self {
            currency,
            slots,
            slot_index,
            options,
            option_index,
            slot_owner,
        })
    }

    /// Currency every price in the catalog is expressed in
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Look up a slot by identifier
    pub fn slot(&self, id: &str) -> Option<&SlotDefinition> {
        self.slot_index
            .get(id)
            .and_then(|&index| self.slots.get(index))
    }

    /// Whether `id` names a slot in this catalog
    pub fn is_known_slot(&self, id: &str) -> bool {
        self.slot_index.contains_key(id)
    }

    /// All slots, in declaration order
    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    /// Look up an option by key
    pub fn option(&self, key: &str) -> Option<&SponsorOption> {
        self.option_index
            .get(key)
            .and_then(|&index| self.options.get(index))
    }

    /// The dated option a slot is booked through
    pub fn option_for_slot(&self, id: &str) -> Option<&SponsorOption> {
        self.slot_owner
            .get(id)
            .and_then(|&index| self.options.get(index))
    }

    /// All options, in declaration order
    pub fn options(&self) -> &[SponsorOption] {
        &self.options
    }

    /// Options grouped by heading, groups in order of first appearance
    pub fn options_by_group(&self) -> Vec<(&str, Vec<&SponsorOption>)> {
        let mut groups: Vec<(&str, Vec<&SponsorOption>)> = Vec::new();

        for option in &self.options {
            match groups.iter_mut().find(|(group, _)| *group == option.group()) {
                Some((_, members)) => members.push(option),
                None => groups.push((option.group(), vec![option])),
            }
        }

        groups
    }
}

/// Tracks the single currency shared by all catalog prices.
#[derive(Debug, Default)]
struct CurrencyGuard {
    currency: Option<&'static Currency>,
}

impl CurrencyGuard {
    fn parse(&mut self, s: &str) -> Result<Decimal, CatalogError> {
        let (amount, currency) = parse_price(s)?;

        match self.currency {
            Some(existing) if existing != currency => Err(CatalogError::CurrencyMismatch(
                existing.iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            )),
            Some(_) => Ok(amount),
            None => {
                self.currency = Some(currency);
                Ok(amount)
            }
        }
    }
}

/// Parse price string (e.g., "42.85 USD") into an amount and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount is not a decimal number, or if the currency code is not
/// recognized.
pub fn parse_price(s: &str) -> Result<(Decimal, &'static Currency), CatalogError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(currency_code), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CatalogError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(s.to_string()))?;

    let currency = match currency_code {
        "GBP" => GBP,
        "USD" => USD,
        "EUR" => EUR,
        other => return Err(CatalogError::UnknownCurrency(other.to_string())),
    };

    Ok((amount, currency))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use testresult::TestResult;

    use super::*;

    const SMALL: &str = r"
slots:
  - id: ad_home
    label: Homepage Banner Ad
    base_price: 300 USD
    min_days: 7
options:
  - key: ad_home
    label: Homepage Banner Ad
    group: Display
    price: 300 USD
    kind: dated
    slots: [ad_home]
  - key: vid_comm
    label: Community Post
    group: Video
    price: 150 USD
";

    #[test]
    fn standard_catalog_loads() -> TestResult {
        let catalog = Catalog::standard()?;

        assert_eq!(catalog.currency(), USD);
        assert_eq!(catalog.slots().len(), 6);
        assert_eq!(catalog.options().len(), 12);

        Ok(())
    }

    #[test]
    fn standard_catalog_rates() -> TestResult {
        let catalog = Catalog::standard()?;

        let home = catalog.slot("ad_home").ok_or("missing ad_home")?;
        let side = catalog.slot("ad_side").ok_or("missing ad_side")?;
        let pinned = catalog.slot("link_pinned_4").ok_or("missing pinned slot")?;

        assert_eq!(home.per_day_rate(), Decimal::new(4285, 2));
        assert_eq!(side.per_day_rate(), Decimal::new(2142, 2));
        assert_eq!(pinned.per_day_rate(), Decimal::new(1667, 2));
        assert_eq!(pinned.min_days(), 30);

        Ok(())
    }

    #[test]
    fn standard_catalog_option_kinds() -> TestResult {
        let catalog = Catalog::standard()?;

        let backlink = catalog.option("link_backlink").ok_or("missing backlink")?;
        let pinned = catalog.option("link_pinned").ok_or("missing pinned")?;
        let podcast = catalog.option("pod_full").ok_or("missing podcast")?;

        assert_eq!(backlink.kind(), &OptionKind::Quantity);
        assert_eq!(pinned.slots().len(), 4);
        assert_eq!(podcast.kind(), &OptionKind::Flat);
        assert!(podcast.slots().is_empty());

        assert_eq!(
            catalog.option_for_slot("link_pinned_3").map(SponsorOption::key),
            Some("link_pinned")
        );

        Ok(())
    }

    #[test]
    fn groups_keep_declaration_order() -> TestResult {
        let catalog = Catalog::standard()?;
        let groups = catalog.options_by_group();

        let names: Vec<&str> = groups.iter().map(|(name, _)| *name).collect();

        assert_eq!(
            names,
            [
                "Link & Article Sponsorships",
                "Display Ad Options",
                "Podcast Sponsorships",
                "Video Sponsorships"
            ]
        );
        assert_eq!(groups.first().map(|(_, members)| members.len()), Some(4));

        Ok(())
    }

    #[test]
    fn unknown_slot_lookup_is_none() -> TestResult {
        let catalog = Catalog::from_yaml(SMALL)?;

        assert!(catalog.slot("ad_side").is_none());
        assert!(!catalog.is_known_slot("link_pinned_"));
        assert!(catalog.is_known_slot("ad_home"));

        Ok(())
    }

    #[test]
    fn load_reads_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(SMALL.as_bytes())?;

        let catalog = Catalog::load(file.path())?;

        assert_eq!(catalog.options().len(), 2);

        Ok(())
    }

    #[test]
    fn rejects_mixed_currencies() {
        let yaml = SMALL.replace("price: 150 USD", "price: 150 GBP");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::CurrencyMismatch(expected, found)) if expected == "USD" && found == "GBP"
        ));
    }

    #[test]
    fn rejects_dangling_slot_reference() {
        let yaml = SMALL.replace("slots: [ad_home]", "slots: [ad_side]");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::UnknownSlotReference { option, .. }) if option == "ad_home"
        ));
    }

    #[test]
    fn rejects_zero_min_days() {
        let yaml = SMALL.replace("min_days: 7", "min_days: 0");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::Slot(SlotError::ZeroMinDays(_)))
        ));
    }

    #[test]
    fn rejects_duplicate_option() {
        let yaml = SMALL.replace("key: vid_comm", "key: ad_home");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::DuplicateOption(key)) if key == "ad_home"
        ));
    }

    #[test]
    fn rejects_duplicate_slot() {
        let yaml = SMALL.replace(
            "    min_days: 7\noptions:",
            "    min_days: 7\n  - id: ad_home\n    label: Second Banner\n    base_price: 200 USD\n    min_days: 7\noptions:",
        );

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::DuplicateSlot(slot)) if slot.as_str() == "ad_home"
        ));
    }

    #[test]
    fn rejects_non_positive_option_price() {
        let yaml = SMALL.replace("price: 150 USD", "price: 0 USD");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::NonPositivePrice { option, price })
                if option == "vid_comm" && price == Decimal::ZERO
        ));
    }

    #[test]
    fn rejects_slot_claimed_by_two_options() {
        let yaml = SMALL.replace(
            "  - key: vid_comm",
            "  - key: ad_home_extended\n    label: Extended Banner\n    group: Display\n    price: 300 USD\n    kind: dated\n    slots: [ad_home]\n  - key: vid_comm",
        );

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::SlotClaimedTwice(slot)) if slot.as_str() == "ad_home"
        ));
    }

    #[test]
    fn rejects_slot_listed_twice_by_one_option() {
        let yaml = SMALL.replace("slots: [ad_home]", "slots: [ad_home, ad_home]");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::SlotClaimedTwice(slot)) if slot.as_str() == "ad_home"
        ));
    }

    #[test]
    fn rejects_slots_on_flat_option() {
        let yaml = SMALL.replace(
            "    price: 150 USD\n",
            "    price: 150 USD\n    slots: [ad_home]\n",
        );

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::UnexpectedSlots(key)) if key == "vid_comm"
        ));
    }

    #[test]
    fn rejects_dated_option_without_slots() {
        let yaml = SMALL.replace("    slots: [ad_home]\n", "");

        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::MissingSlots(key)) if key == "ad_home"
        ));
    }

    #[test]
    fn parse_price_rejects_invalid_format() {
        assert!(matches!(
            parse_price("2.99USD"),
            Err(CatalogError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("2.99 USD extra"),
            Err(CatalogError::InvalidPrice(_))
        ));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        assert!(matches!(
            parse_price("2.99 ABC"),
            Err(CatalogError::UnknownCurrency(code)) if code == "ABC"
        ));
    }

    #[test]
    fn parse_price_keeps_cents() -> TestResult {
        let (amount, currency) = parse_price("42.85 USD")?;

        assert_eq!(amount, Decimal::new(4285, 2));
        assert_eq!(currency, USD);

        Ok(())
    }
}
