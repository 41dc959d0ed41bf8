//! Replay command implementation

use anyhow::Result;
use exchange_sim::{data, Config, Simulation, Symbol};
use tracing::info;

pub fn run(config_path: String, steps_override: Option<usize>) -> Result<()> {
    info!("Starting replay");

    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let quotes = data::load_csv(&config.dataset)?;
    let mut sim = Simulation::new(quotes, &config)?;

    for spec in &config.orders {
        sim.place_order(
            spec.side,
            Symbol::new(spec.symbol.clone()),
            spec.price,
            spec.amount,
        )?;
    }

    let steps = steps_override.unwrap_or(config.steps);
    info!("Replaying {} time steps", steps);
    let reports = sim.run(steps)?;

    let total_trades: usize = reports.iter().map(|r| r.trades.len()).sum();
    let settled = reports
        .iter()
        .flat_map(|r| &r.trades)
        .filter(|t| t.account == config.account)
        .count();

    println!("\n{}", "=".repeat(60));
    println!("REPLAY RESULTS");
    println!("{}", "=".repeat(60));
    println!("Steps simulated:    {}", reports.len());
    println!("Trades matched:     {}", total_trades);
    println!("Trades settled:     {}", settled);
    println!("Final time:         {}", sim.current_time());
    println!("{}", "=".repeat(60));
    println!("Wallet ({}):\n{}", config.account, sim.wallet());

    Ok(())
}
