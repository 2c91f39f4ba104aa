//! Quote Example
//!
//! Prices a set of sponsorship options and prints the order summary.
//!
//! Use `-c` to load a catalog file instead of the bundled one
//! Use `-o` to tick an option, repeatable
//! Use `-r` to pick a range for a slot, as `SLOT=FROM to TO`
//! Use `-q` to set a quantity, as `OPTION=N`

use std::io;

use anyhow::{Context, Result, bail};
use clap::Parser;
use jiff::Zoned;
use tracing_subscriber::EnvFilter;

use billboard::prelude::*;

/// Arguments for the quote example
#[derive(Debug, Parser)]
struct QuoteArgs {
    /// Catalog file to load
    #[clap(short, long)]
    catalog: Option<String>,

    /// Option keys to select
    #[clap(short, long = "option")]
    options: Vec<String>,

    /// Slot ranges, `SLOT=FROM to TO`
    #[clap(short, long = "range")]
    ranges: Vec<String>,

    /// Option quantities, `OPTION=N`
    #[clap(short, long = "quantity")]
    quantities: Vec<String>,
}

fn split_pair(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got {raw:?}");
    };

    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// Quote Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = QuoteArgs::parse();

    let catalog = match args.catalog.as_deref() {
        Some(path) => Catalog::load(path).with_context(|| format!("loading {path}"))?,
        None => Catalog::standard()?,
    };

    let form = FormInput {
        options: args.options,
        ranges: args
            .ranges
            .iter()
            .map(|raw| split_pair(raw))
            .collect::<Result<_>>()?,
        quantities: args
            .quantities
            .iter()
            .map(|raw| split_pair(raw))
            .collect::<Result<_>>()?,
        consent: true,
    };

    let selections = Selections::from_form(&form)?;
    let today = Zoned::now().date();

    for key in selections.options() {
        let Some(option) = catalog.option(key) else {
            println!("Skipping unknown option {key}");
            continue;
        };

        for slot_id in option.slots() {
            let (Some(slot), Some(range)) =
                (catalog.slot(slot_id.as_str()), selections.range(slot_id.as_str()))
            else {
                continue;
            };

            if let Err(err) = price_date_range(slot, range) {
                println!("{}: {err}", slot.label());
            }

            if range.from() < today {
                println!("{}: {range} starts before {today}", slot.label());
            }
        }
    }

    let cart = compute_cart_total(&catalog, &selections)?;

    write_summary(&mut io::stdout(), &cart)?;

    if !cart.can_checkout(selections.consent()) {
        println!("Nothing billable selected");
    }

    Ok(())
}
