//! OHLC aggregation of quote activity
//!
//! Turns a batch of quotes for one timestamp into per-symbol candlesticks
//! and formats timestamps for compact chart labels. The close value is the
//! mean price of the symbol's quotes at the timestamp, not the last trade
//! price; changing that would alter observable chart output.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::book::{BookError, OrderBook};
use crate::types::{Quote, Side, Symbol};

/// Dataset timestamp shape, with an optional fractional-second tail.
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Errors surfaced by candle aggregation
#[derive(Debug, Error)]
pub enum CandleError {
    #[error("malformed timestamp '{input}'")]
    TimeLabel {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Book(#[from] BookError),
}

/// One open/high/low/close summary for a symbol at a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Candlestick {
    /// Formatted `HH:MM:SS` chart label.
    pub label: String,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
}

/// Reduce a `YYYY/MM/DD HH:MM:SS` timestamp to its `HH:MM:SS` part.
pub fn format_time_label(timestamp: &str) -> Result<String, CandleError> {
    let parsed = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|source| {
        CandleError::TimeLabel {
            input: timestamp.to_string(),
            source,
        }
    })?;
    Ok(parsed.format("%H:%M:%S").to_string())
}

/// Aggregate one timestamp's quotes into per-symbol candlesticks.
///
/// One candle per symbol newly encountered in the batch: high/low are taken
/// over the whole input list, close is the mean price for the symbol, and
/// open chains to the previous candle's close for that symbol within the
/// call (0 when no prior close exists). An empty batch yields an empty map.
pub fn aggregate(
    timestamp: &str,
    quotes: &[Quote],
) -> Result<BTreeMap<Symbol, Vec<Candlestick>>, CandleError> {
    let mut by_symbol: BTreeMap<Symbol, Vec<Candlestick>> = BTreeMap::new();

    if quotes.is_empty() {
        return Ok(by_symbol);
    }

    let label = format_time_label(timestamp)?;

    for quote in quotes {
        if by_symbol.contains_key(&quote.symbol) {
            continue;
        }

        let high = OrderBook::high_price(quotes)?;
        let low = OrderBook::low_price(quotes)?;
        let close = OrderBook::average_price(quotes, &quote.symbol)?;
        let series = by_symbol.entry(quote.symbol.clone()).or_default();
        let open = series.last().map(|c| c.close).unwrap_or(Decimal::ZERO);

        series.push(Candlestick {
            label: label.clone(),
            open,
            close,
            high,
            low,
        });
    }

    Ok(by_symbol)
}

/// Build a candle series for one symbol/side across every timestamp the
/// book knows, chaining each open to the previous close.
pub fn candle_series(
    book: &OrderBook,
    symbol: &Symbol,
    side: Side,
) -> Result<Vec<Candlestick>, CandleError> {
    let mut series: Vec<Candlestick> = Vec::new();

    for timestamp in book.known_timestamps(symbol) {
        let quotes = book.query(side, symbol, &timestamp);
        if quotes.is_empty() {
            continue;
        }

        let open = series.last().map(|c| c.close).unwrap_or(Decimal::ZERO);
        series.push(Candlestick {
            label: format_time_label(&timestamp)?,
            open,
            close: OrderBook::average_price(&quotes, symbol)?,
            high: OrderBook::high_price(&quotes)?,
            low: OrderBook::low_price(&quotes)?,
        });
    }

    Ok(series)
}
