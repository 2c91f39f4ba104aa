//! Order Summary
//!
//! Human readable lines for a priced cart, as shown on the cart page and
//! stored with the order.

use std::io;

use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::cart::{CartLine, CartTotal, LineKind};

/// Errors that can occur when writing a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Writing to the output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One labelled summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Left column
    pub label: String,

    /// Right column
    pub value: String,
}

impl From<&CartLine> for SummaryRow {
    fn from(line: &CartLine) -> Self {
        match &line.kind {
            LineKind::Flat => SummaryRow {
                label: line.label.clone(),
                value: line.amount.to_string(),
            },
            LineKind::Quantity(quantity) => SummaryRow {
                label: line.label.clone(),
                value: format!("Qty {}: {}", quantity.get(), line.amount),
            },
            LineKind::Reservation { range, .. } => {
                let days = range.day_count();
                let unit = if days == 1 { "Day" } else { "Days" };

                SummaryRow {
                    label: format!("{} Reservation", line.label),
                    value: format!("{} ({days} {unit}): {}", range.display_us(), line.amount),
                }
            }
        }
    }
}

/// Summary rows for every cart line, in cart order.
pub fn summary_rows(cart: &CartTotal) -> Vec<SummaryRow> {
    cart.lines().iter().map(SummaryRow::from).collect()
}

/// Writes the summary as a table followed by the total.
///
/// # Errors
///
/// Returns [`SummaryError::Io`] if writing fails.
pub fn write_summary(out: &mut impl io::Write, cart: &CartTotal) -> Result<(), SummaryError> {
    let mut builder = Builder::default();

    builder.push_record(["Sponsorship", "Details"]);

    for row in summary_rows(cart) {
        builder.push_record([row.label, row.value]);
    }

    builder.push_record(["Total".to_string(), cart.total().to_string()]);

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(1..2), Alignment::right());

    writeln!(out, "{table}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use crate::{
        cart::{Selections, compute_cart_total},
        catalog::Catalog,
        dates::DateRange,
        pricing::Quantity,
    };

    use super::*;

    fn cart() -> TestResult<CartTotal> {
        let catalog = Catalog::standard()?;
        let mut selections = Selections::new();

        selections.toggle_on("vid_comm");
        selections.toggle_on("link_backlink");
        selections.set_quantity("link_backlink", Quantity::new(3));
        selections.toggle_on("ad_home");
        selections.set_range("ad_home", DateRange::new(date(2025, 9, 1), date(2025, 9, 10))?);

        Ok(compute_cart_total(&catalog, &selections)?)
    }

    #[test]
    fn reservation_row_shows_range_and_days() -> TestResult {
        let rows = summary_rows(&cart()?);
        let reservation = rows.get(2).ok_or("expected reservation row")?;

        assert_eq!(reservation.label, "Homepage Banner Ad Reservation");
        assert!(
            reservation.value.starts_with("09-01-2025 — 09-10-2025 (10 Days): "),
            "unexpected value {}",
            reservation.value
        );

        Ok(())
    }

    #[test]
    fn flat_and_quantity_rows() -> TestResult {
        let rows = summary_rows(&cart()?);

        assert_eq!(
            rows.first().map(|row| row.label.as_str()),
            Some("YouTube Community Post")
        );
        assert!(
            rows.get(1)
                .is_some_and(|row| row.value.starts_with("Qty 3: ")),
            "quantity row should show the quantity"
        );

        Ok(())
    }

    #[test]
    fn single_day_is_singular() -> TestResult {
        let line = CartLine {
            key: "ad_home".to_string(),
            label: "Homepage Banner Ad".to_string(),
            kind: LineKind::Reservation {
                slot: "ad_home".into(),
                range: DateRange::single(date(2025, 9, 1)),
            },
            amount: rusty_money::Money::from_minor(100, rusty_money::iso::USD),
        };

        assert!(SummaryRow::from(&line).value.contains("(1 Day)"));

        Ok(())
    }

    #[test]
    fn writes_table_with_total() -> TestResult {
        let mut out = Vec::new();

        write_summary(&mut out, &cart()?)?;

        let rendered = String::from_utf8(out)?;

        assert!(rendered.contains("Sponsorship"));
        assert!(rendered.contains("Homepage Banner Ad Reservation"));
        assert!(rendered.contains("Total"));

        Ok(())
    }
}
