//! Simulation driver
//!
//! Owns the order book, the live account's wallet, and the simulated
//! clock, and serializes every read, insert, match, and settlement. One
//! step matches every known symbol at the current time, settles the live
//! account's trades, and advances the clock.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::book::{BookError, OrderBook};
use crate::config::Config;
use crate::types::{Quote, QuoteValidationError, Side, Symbol};
use crate::wallet::{Wallet, WalletError};

/// Errors surfaced while driving the simulation
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Quote(#[from] QuoteValidationError),
}

/// What one time step produced.
#[derive(Debug)]
pub struct StepReport {
    /// The timestamp that was matched.
    pub time: String,
    /// Every trade produced across all symbols, settled ones included.
    pub trades: Vec<Quote>,
}

/// Ask/bid snapshot of one symbol at the current time.
#[derive(Debug)]
pub struct MarketStats {
    pub symbol: Symbol,
    pub asks: SideSnapshot,
    pub bids: SideSnapshot,
}

/// Price summary of one side of the book; `None` when the side is empty.
#[derive(Debug)]
pub struct SideSnapshot {
    pub count: usize,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub roi: Option<Decimal>,
}

impl SideSnapshot {
    fn from_quotes(quotes: &[Quote]) -> Self {
        SideSnapshot {
            count: quotes.len(),
            high: OrderBook::high_price(quotes).ok(),
            low: OrderBook::low_price(quotes).ok(),
            roi: OrderBook::return_on_investment(quotes).ok(),
        }
    }
}

/// Discrete-time replay of the dataset through the matching engine.
pub struct Simulation {
    book: OrderBook,
    wallet: Wallet,
    account: String,
    current_time: String,
}

impl Simulation {
    /// Build a simulation from ingested quotes and a config.
    ///
    /// The clock starts at the earliest stored timestamp and the wallet is
    /// seeded with the configured starting allocation.
    pub fn new(quotes: Vec<Quote>, config: &Config) -> Result<Self, SimError> {
        let book = OrderBook::new(quotes);
        let current_time = book.earliest_time()?.to_string();

        let mut wallet = Wallet::new();
        for (currency, amount) in &config.starting_balances {
            wallet.insert_currency(currency, *amount)?;
        }

        info!(
            "Simulation starts at {} with {} quotes",
            current_time,
            book.len()
        );

        Ok(Simulation {
            book,
            wallet,
            account: config.account.clone(),
            current_time,
        })
    }

    pub fn current_time(&self) -> &str {
        &self.current_time
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Place a live order at the current simulated time.
    ///
    /// The quote is inserted only when the wallet can cover it; returns
    /// whether it was admitted.
    pub fn place_order(
        &mut self,
        side: Side,
        symbol: Symbol,
        price: Decimal,
        amount: Decimal,
    ) -> Result<bool, SimError> {
        let quote = Quote::new(price, amount, self.current_time.clone(), symbol, side)?
            .with_account(&self.account);

        if !self.wallet.can_fulfill(&quote) {
            warn!(
                "Rejected {} {} {} @ {}: insufficient funds",
                quote.side, quote.amount, quote.symbol, quote.price
            );
            return Ok(false);
        }

        info!(
            "Placed {} {} {} @ {}",
            quote.side, quote.amount, quote.symbol, quote.price
        );
        self.book.insert(quote);
        Ok(true)
    }

    /// Match every known symbol at the current time, settle the live
    /// account's trades, and advance the clock.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        let time = self.current_time.clone();
        let mut trades = Vec::new();

        for symbol in self.book.known_symbols() {
            let sales = self.book.match_asks_to_bids(&symbol, &time);
            debug!("{}: {} trades at {}", symbol, sales.len(), time);

            for trade in &sales {
                if trade.account == self.account {
                    self.wallet.settle(trade)?;
                    info!(
                        "Settled {} {} {} @ {}",
                        trade.side, trade.amount, trade.symbol, trade.price
                    );
                }
            }
            trades.extend(sales);
        }

        self.current_time = self.book.next_time(&time)?.to_string();

        Ok(StepReport { time, trades })
    }

    /// Drive `steps` time steps, collecting each step's report.
    pub fn run(&mut self, steps: usize) -> Result<Vec<StepReport>, SimError> {
        let mut reports = Vec::with_capacity(steps);
        for _ in 0..steps {
            let report = self.step()?;
            info!("{}: matched {} trades", report.time, report.trades.len());
            reports.push(report);
        }
        Ok(reports)
    }

    /// Per-symbol ask/bid snapshot at the current time, for the
    /// presentation boundary.
    pub fn market_stats(&self) -> Vec<MarketStats> {
        self.book
            .known_symbols()
            .into_iter()
            .map(|symbol| {
                let asks = self.book.query(Side::Ask, &symbol, &self.current_time);
                let bids = self.book.query(Side::Bid, &symbol, &self.current_time);
                MarketStats {
                    asks: SideSnapshot::from_quotes(&asks),
                    bids: SideSnapshot::from_quotes(&bids),
                    symbol,
                }
            })
            .collect()
    }
}
