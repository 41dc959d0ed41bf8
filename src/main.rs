//! Exchange simulator - main entry point
//!
//! This binary provides three subcommands:
//! - replay: Drive the matching engine over a replayed quote dataset
//! - stats: Print per-symbol market stats at the earliest dataset time
//! - candles: Print a candle series for one symbol and side

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "exchange-sim")]
#[command(about = "Continuous double-auction market simulator replaying historical quote datasets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay the dataset through the matching engine
    Replay {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/replay.json")]
        config: String,

        /// Number of time steps to simulate (overrides config)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Print per-symbol market stats at the earliest dataset time
    Stats {
        /// Path to the quote dataset
        #[arg(short, long, default_value = "data/20200601.csv")]
        dataset: String,
    },

    /// Print a candle series for one symbol and side
    Candles {
        /// Path to the quote dataset
        #[arg(short, long, default_value = "data/20200601.csv")]
        dataset: String,

        /// Trading pair, e.g. ETH/BTC
        #[arg(short, long)]
        symbol: String,

        /// Order side to aggregate (ask or bid)
        #[arg(long, default_value = "ask")]
        side: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Replay { .. } => "replay",
        Commands::Stats { .. } => "stats",
        Commands::Candles { .. } => "candles",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Replay { config, steps } => commands::replay::run(config, steps),
        Commands::Stats { dataset } => commands::stats::run(dataset),
        Commands::Candles {
            dataset,
            symbol,
            side,
        } => commands::candles::run(dataset, symbol, side),
    }
}
