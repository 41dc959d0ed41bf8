//! Core data types used across the simulator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account tag for quotes seeded from the dataset itself.
///
/// Quotes carrying this tag belong to no real participant and are never
/// settled against a wallet.
pub const DATASET_ACCOUNT: &str = "dataset";

/// Validation errors for quote data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteValidationError {
    #[error("price ({0}) must be positive")]
    NonPositivePrice(Decimal),

    #[error("amount ({0}) must be >= 0")]
    NegativeAmount(Decimal),
}

/// Which side of the book a quote sits on.
///
/// `Ask` and `Bid` are resting order intents; `AskTrade` and `BidTrade` tag
/// matched quotes so settlement knows which leg produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ask,
    Bid,
    AskTrade,
    BidTrade,
    Unknown,
}

impl Side {
    /// Map a dataset side token to a `Side`. Anything that is not `ask` or
    /// `bid` comes back as `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "ask" => Side::Ask,
            "bid" => Side::Bid,
            _ => Side::Unknown,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Side::Ask => "ask",
            Side::Bid => "bid",
            Side::AskTrade => "ask_trade",
            Side::BidTrade => "bid_trade",
            Side::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Trading pair in `BASE/QUOTE` form (e.g. `ETH/BTC`).
///
/// Amounts are denominated in BASE, prices in QUOTE per BASE unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the pair into its base and quote currencies.
    ///
    /// Returns `None` when the symbol is not of the `BASE/QUOTE` shape.
    pub fn currencies(&self) -> Option<(&str, &str)> {
        let (base, quote) = self.0.split_once('/')?;
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some((base, quote))
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One order-book entry: a resting buy/sell intent or a matched trade.
///
/// Immutable once stored; the matcher decrements `amount` only on its own
/// working copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub amount: Decimal,
    /// Opaque totally-ordered key; lexicographic order is chronological
    /// order in the dataset.
    pub timestamp: String,
    pub symbol: Symbol,
    pub side: Side,
    pub account: String,
}

impl Quote {
    /// Create a validated quote owned by the dataset sentinel account.
    pub fn new(
        price: Decimal,
        amount: Decimal,
        timestamp: impl Into<String>,
        symbol: Symbol,
        side: Side,
    ) -> Result<Self, QuoteValidationError> {
        if price <= Decimal::ZERO {
            return Err(QuoteValidationError::NonPositivePrice(price));
        }
        if amount < Decimal::ZERO {
            return Err(QuoteValidationError::NegativeAmount(amount));
        }
        Ok(Quote {
            price,
            amount,
            timestamp: timestamp.into(),
            symbol,
            side,
            account: DATASET_ACCOUNT.to_string(),
        })
    }

    /// Re-tag the quote with an owning account.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// True when the quote belongs to no real participant.
    pub fn is_sentinel(&self) -> bool {
        self.account == DATASET_ACCOUNT
    }

    /// A fully matched quote; must not be matched again in the same pass.
    pub fn is_spent(&self) -> bool {
        self.amount.is_zero()
    }
}
