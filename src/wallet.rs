//! Per-account balance ledger
//!
//! Gates order admission (`can_fulfill`) and applies settlement from matched
//! trades. No operation may drive a balance negative.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::types::{Quote, Side};

/// Errors surfaced by wallet operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("amount ({0}) must be >= 0")]
    NegativeAmount(Decimal),

    #[error("wallet holds no {0}")]
    UnknownCurrency(String),

    #[error("insufficient {currency}: requested {requested}, held {held}")]
    InsufficientFunds {
        currency: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("symbol {0} is not a BASE/QUOTE pair")]
    InvalidSymbol(String),
}

/// Currency balances for one account.
#[derive(Debug, Clone, Default)]
pub struct Wallet {
    balances: BTreeMap<String, Decimal>,
}

impl Wallet {
    pub fn new() -> Self {
        Wallet::default()
    }

    /// Held balance for a currency; absent currencies behave as 0.
    pub fn balance(&self, currency: &str) -> Decimal {
        self.balances.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Add `amount` to the currency's balance, creating the entry at 0 when
    /// absent.
    pub fn insert_currency(&mut self, currency: &str, amount: Decimal) -> Result<(), WalletError> {
        if amount < Decimal::ZERO {
            return Err(WalletError::NegativeAmount(amount));
        }
        *self
            .balances
            .entry(currency.to_string())
            .or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    /// True iff the held balance for `currency` is at least `amount`.
    pub fn contains_currency(&self, currency: &str, amount: Decimal) -> bool {
        self.balance(currency) >= amount
    }

    /// Deduct `amount` of `currency`, reporting why a deduction is refused.
    pub fn remove_currency(&mut self, currency: &str, amount: Decimal) -> Result<(), WalletError> {
        if amount < Decimal::ZERO {
            return Err(WalletError::NegativeAmount(amount));
        }
        let Some(held) = self.balances.get_mut(currency) else {
            return Err(WalletError::UnknownCurrency(currency.to_string()));
        };
        if *held < amount {
            return Err(WalletError::InsufficientFunds {
                currency: currency.to_string(),
                requested: amount,
                held: *held,
            });
        }
        *held -= amount;
        Ok(())
    }

    /// Admission gate: can this wallet cover the quote?
    ///
    /// An ask needs `amount` of the base currency; a bid needs
    /// `amount * price` of the quote currency. Trade and unknown sides are
    /// never admissible.
    pub fn can_fulfill(&self, quote: &Quote) -> bool {
        let Some((base, counter)) = quote.symbol.currencies() else {
            return false;
        };
        match quote.side {
            Side::Ask => self.contains_currency(base, quote.amount),
            Side::Bid => self.contains_currency(counter, quote.amount * quote.price),
            _ => false,
        }
    }

    /// Apply one matched trade to the balances.
    ///
    /// `AskTrade`: the account sold `amount` base for `amount * price`
    /// quote. `BidTrade`: the account bought `amount` base for
    /// `amount * price` quote. The debit is checked first, so a failed
    /// settlement leaves the wallet untouched.
    pub fn settle(&mut self, trade: &Quote) -> Result<(), WalletError> {
        let (base, counter) = trade
            .symbol
            .currencies()
            .ok_or_else(|| WalletError::InvalidSymbol(trade.symbol.to_string()))?;
        match trade.side {
            Side::AskTrade => {
                self.remove_currency(base, trade.amount)?;
                self.insert_currency(counter, trade.amount * trade.price)?;
            }
            Side::BidTrade => {
                self.remove_currency(counter, trade.amount * trade.price)?;
                self.insert_currency(base, trade.amount)?;
            }
            other => warn!("settle called with non-trade side {}", other),
        }
        Ok(())
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (currency, balance) in &self.balances {
            writeln!(f, "{} : {}", currency, balance)?;
        }
        Ok(())
    }
}
