//! Dataset ingestion
//!
//! Parses the delimited quote dataset into `Quote` records. Each line is
//! `timestamp,symbol,side,price,amount` with an optional trailing account
//! column; lines without one belong to the dataset sentinel account.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::info;

use crate::types::{Quote, Side, Symbol};

/// Read quotes from any delimited-text source.
pub fn read_quotes<R: Read>(reader: R) -> Result<Vec<Quote>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut quotes = Vec::new();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let row = row_idx + 1;
        let record = result.context(format!("Failed to read row {}", row))?;

        let timestamp = record
            .get(0)
            .context(format!("Row {}: missing timestamp column", row))?;
        let symbol = record
            .get(1)
            .context(format!("Row {}: missing symbol column", row))?;
        let side = Side::from_token(
            record
                .get(2)
                .context(format!("Row {}: missing side column", row))?,
        );
        let price: Decimal = record
            .get(3)
            .context(format!("Row {}: missing price column", row))?
            .parse()
            .context(format!("Row {}: failed to parse price", row))?;
        let amount: Decimal = record
            .get(4)
            .context(format!("Row {}: missing amount column", row))?
            .parse()
            .context(format!("Row {}: failed to parse amount", row))?;

        let mut quote = Quote::new(price, amount, timestamp, Symbol::new(symbol), side)
            .context(format!("Row {}: invalid quote", row))?;
        if let Some(account) = record.get(5) {
            quote = quote.with_account(account);
        }

        quotes.push(quote);
    }

    Ok(quotes)
}

/// Load the quote dataset from a file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Quote>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .context(format!("Failed to open dataset {}", path.display()))?;

    let quotes = read_quotes(file)
        .context(format!("Failed to parse dataset {}", path.display()))?;

    let symbols = quotes.iter().map(|q| &q.symbol).unique().count();
    info!(
        "Loaded {} quotes across {} symbols from {}",
        quotes.len(),
        symbols,
        path.display()
    );

    Ok(quotes)
}
