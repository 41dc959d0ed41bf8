//! Simulation configuration
//!
//! JSON configuration file describing the dataset to replay, the live
//! account, its starting balances, and any orders to place before the
//! replay starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the quote dataset file.
    pub dataset: String,
    /// Account name used to tag live quotes and select the wallet.
    pub account: String,
    /// Currency balances granted at account creation.
    pub starting_balances: BTreeMap<String, Decimal>,
    /// Number of time steps one `replay` run advances.
    pub steps: usize,
    /// Orders placed at the start time, each through the admission gate.
    pub orders: Vec<OrderSpec>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut starting_balances = BTreeMap::new();
        starting_balances.insert("BTC".to_string(), dec!(10));
        starting_balances.insert("ETH".to_string(), dec!(10));
        starting_balances.insert("USDT".to_string(), dec!(10));
        starting_balances.insert("DOGE".to_string(), dec!(10));

        Config {
            dataset: "data/20200601.csv".to_string(),
            account: "simuser".to_string(),
            starting_balances,
            steps: 10,
            orders: Vec::new(),
        }
    }
}

/// One order to place when the replay starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    pub side: Side,
    pub symbol: String,
    pub price: Decimal,
    pub amount: Decimal,
}
