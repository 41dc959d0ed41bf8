//! Candles command implementation

use anyhow::Result;
use exchange_sim::candle::candle_series;
use exchange_sim::{data, OrderBook, Side, Symbol};
use tracing::info;

pub fn run(dataset: String, symbol: String, side: String) -> Result<()> {
    let side = match Side::from_token(&side) {
        Side::Ask => Side::Ask,
        Side::Bid => Side::Bid,
        _ => anyhow::bail!("side must be 'ask' or 'bid', got '{}'", side),
    };

    let quotes = data::load_csv(&dataset)?;
    let book = OrderBook::new(quotes);
    let symbol = Symbol::new(symbol);

    let series = candle_series(&book, &symbol, side)?;
    info!("{} candles for {} ({})", series.len(), symbol, side);

    println!("\n{}", "=".repeat(60));
    println!("CANDLES ({}) - {}", symbol, side);
    println!("{}", "=".repeat(60));
    for candle in &series {
        println!(
            "[{}] open: {:<14} high: {:<14} low: {:<14} close: {}",
            candle.label, candle.open, candle.high, candle.low, candle.close
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
