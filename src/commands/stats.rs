//! Stats command implementation

use anyhow::Result;
use exchange_sim::{data, Config, Simulation};
use tracing::info;

fn fmt_stat(value: Option<rust_decimal::Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn run(dataset: String) -> Result<()> {
    let quotes = data::load_csv(&dataset)?;

    let config = Config::default();
    let sim = Simulation::new(quotes, &config)?;
    info!("Market stats at {}", sim.current_time());

    println!("\n{}", "=".repeat(60));
    println!("MARKET STATS @ {}", sim.current_time());
    println!("{}", "=".repeat(60));

    for stats in sim.market_stats() {
        println!("Product: {}", stats.symbol);
        println!(
            "  Asks seen: {:<6} high: {:<14} low: {:<14} roi: {}",
            stats.asks.count,
            fmt_stat(stats.asks.high),
            fmt_stat(stats.asks.low),
            fmt_stat(stats.asks.roi),
        );
        println!(
            "  Bids seen: {:<6} high: {:<14} low: {:<14} roi: {}",
            stats.bids.count,
            fmt_stat(stats.bids.high),
            fmt_stat(stats.bids.low),
            fmt_stat(stats.bids.roi),
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
