//! Order book: quote storage, query surface, simulated clock, and matcher
//!
//! The book owns an append-only collection of quotes sorted by timestamp.
//! Matching works on local copies of the stored quotes, so a match never
//! mutates the book and repeated matching at the same timestamp is
//! idempotent.

use itertools::Itertools;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::types::{Quote, Side, Symbol, DATASET_ACCOUNT};

/// Errors surfaced by book queries and statistics
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("order book holds no quotes")]
    EmptyStore,

    #[error("operation requires at least one quote")]
    EmptyInput,

    #[error("no quotes match symbol {symbol}")]
    NoMatch { symbol: Symbol },
}

/// Authoritative quote repository for one simulation run.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Sorted by timestamp; insertion order preserved within a timestamp.
    quotes: Vec<Quote>,
}

impl OrderBook {
    /// Build a book from an ingested quote list.
    pub fn new(mut quotes: Vec<Quote>) -> Self {
        quotes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        OrderBook { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Distinct symbols across all stored quotes, in first-seen order.
    pub fn known_symbols(&self) -> Vec<Symbol> {
        self.quotes
            .iter()
            .map(|q| q.symbol.clone())
            .unique()
            .collect()
    }

    /// Distinct timestamps at which `symbol` has any quote, chronological.
    pub fn known_timestamps(&self, symbol: &Symbol) -> Vec<String> {
        self.quotes
            .iter()
            .filter(|q| &q.symbol == symbol)
            .map(|q| q.timestamp.clone())
            .dedup()
            .collect()
    }

    /// All quotes matching the three-way filter, insertion order preserved.
    ///
    /// Returns working copies; callers may mutate them freely without
    /// touching the book.
    pub fn query(&self, side: Side, symbol: &Symbol, timestamp: &str) -> Vec<Quote> {
        self.quotes
            .iter()
            .filter(|q| q.side == side && &q.symbol == symbol && q.timestamp == timestamp)
            .cloned()
            .collect()
    }

    /// Timestamp of the first stored quote.
    pub fn earliest_time(&self) -> Result<&str, BookError> {
        self.quotes
            .first()
            .map(|q| q.timestamp.as_str())
            .ok_or(BookError::EmptyStore)
    }

    /// Smallest stored timestamp strictly greater than `timestamp`.
    ///
    /// Wraps around to the earliest stored timestamp when none exists; the
    /// replay loop relies on this to cycle through the dataset.
    pub fn next_time(&self, timestamp: &str) -> Result<&str, BookError> {
        let idx = self
            .quotes
            .partition_point(|q| q.timestamp.as_str() <= timestamp);
        match self.quotes.get(idx) {
            Some(q) => Ok(&q.timestamp),
            None => self.earliest_time(),
        }
    }

    /// Insert a quote, keeping the timestamp-sorted invariant.
    ///
    /// Binary-searches the insertion point instead of re-sorting the whole
    /// collection; equal timestamps keep insertion order.
    pub fn insert(&mut self, quote: Quote) {
        let idx = self
            .quotes
            .partition_point(|q| q.timestamp <= quote.timestamp);
        self.quotes.insert(idx, quote);
    }

    /// Maximum price over the given quotes.
    pub fn high_price(quotes: &[Quote]) -> Result<Decimal, BookError> {
        quotes
            .iter()
            .map(|q| q.price)
            .max()
            .ok_or(BookError::EmptyInput)
    }

    /// Minimum price over the given quotes.
    pub fn low_price(quotes: &[Quote]) -> Result<Decimal, BookError> {
        quotes
            .iter()
            .map(|q| q.price)
            .min()
            .ok_or(BookError::EmptyInput)
    }

    /// Arithmetic mean price of the quotes whose symbol matches `symbol`.
    ///
    /// The list may mix symbols; zero matching quotes is an error, never a
    /// silent 0.
    pub fn average_price(quotes: &[Quote], symbol: &Symbol) -> Result<Decimal, BookError> {
        let prices: Vec<Decimal> = quotes
            .iter()
            .filter(|q| &q.symbol == symbol)
            .map(|q| q.price)
            .collect();
        if prices.is_empty() {
            return Err(BookError::NoMatch {
                symbol: symbol.clone(),
            });
        }
        let sum: Decimal = prices.iter().copied().sum();
        Ok(sum / Decimal::from(prices.len() as u64))
    }

    /// Derived spread statistic `((high - low) - low) / low * 100`.
    ///
    /// Not a conventional return-on-investment figure; kept as a named
    /// statistic over the given quotes.
    pub fn return_on_investment(quotes: &[Quote]) -> Result<Decimal, BookError> {
        let low = Self::low_price(quotes)?;
        let high = Self::high_price(quotes)?;
        Ok(((high - low) - low) / low * Decimal::ONE_HUNDRED)
    }

    /// Quote prices for one side of the book, best-first: asks ascending,
    /// bids descending.
    pub fn current_prices(&self, side: Side, symbol: &Symbol, timestamp: &str) -> Vec<Decimal> {
        let mut prices: Vec<Decimal> = self
            .query(side, symbol, timestamp)
            .iter()
            .map(|q| q.price)
            .collect();
        match side {
            Side::Bid => prices.sort_by(|a, b| b.cmp(a)),
            _ => prices.sort(),
        }
        prices
    }

    /// Match resting asks against resting bids for one symbol/timestamp.
    ///
    /// Single pass: asks are walked cheapest-first, bids highest-first, and
    /// a bid participates only while `bid.price >= ask.price`. Every trade
    /// executes at the resting ask's price. The trade inherits the account
    /// and trade side of a non-sentinel participant, the ask winning when
    /// both sides are real.
    ///
    /// Only the local working copies are decremented; the stored quotes keep
    /// their original amounts.
    pub fn match_asks_to_bids(&self, symbol: &Symbol, timestamp: &str) -> Vec<Quote> {
        let mut asks = self.query(Side::Ask, symbol, timestamp);
        let mut bids = self.query(Side::Bid, symbol, timestamp);

        if asks.is_empty() || bids.is_empty() {
            return Vec::new();
        }

        // Stable sorts keep insertion order among equal prices.
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.sort_by(|a, b| b.price.cmp(&a.price));

        debug!(
            "matching {}: {} asks (min {}), {} bids (max {})",
            symbol,
            asks.len(),
            asks[0].price,
            bids.len(),
            bids[0].price,
        );

        let mut trades = Vec::new();

        for ask in asks.iter_mut() {
            for bid in bids.iter_mut() {
                if bid.price < ask.price {
                    continue;
                }

                let mut trade = Quote {
                    price: ask.price,
                    amount: Decimal::ZERO,
                    timestamp: timestamp.to_string(),
                    symbol: symbol.clone(),
                    side: Side::AskTrade,
                    account: DATASET_ACCOUNT.to_string(),
                };
                if !bid.is_sentinel() {
                    trade.account = bid.account.clone();
                    trade.side = Side::BidTrade;
                }
                if !ask.is_sentinel() {
                    trade.account = ask.account.clone();
                    trade.side = Side::AskTrade;
                }

                if bid.amount == ask.amount {
                    // Full clear of both sides; this ask is done.
                    trade.amount = ask.amount;
                    trades.push(trade);
                    bid.amount = Decimal::ZERO;
                    break;
                } else if bid.amount > ask.amount {
                    // Ask fully consumed; the bid keeps its remainder for
                    // the next ask.
                    trade.amount = ask.amount;
                    bid.amount -= ask.amount;
                    trades.push(trade);
                    break;
                } else if bid.amount < ask.amount && bid.amount > Decimal::ZERO {
                    // Bid fully consumed; the shrunken ask scans on.
                    trade.amount = bid.amount;
                    ask.amount -= bid.amount;
                    bid.amount = Decimal::ZERO;
                    trades.push(trade);
                }
            }
        }

        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(
        price: Decimal,
        amount: Decimal,
        timestamp: &str,
        symbol: &str,
        side: Side,
    ) -> Quote {
        Quote::new(price, amount, timestamp, Symbol::new(symbol), side).unwrap()
    }

    fn sample_book() -> OrderBook {
        OrderBook::new(vec![
            quote(dec!(0.021), dec!(5), "2020/06/01 10:00:00", "ETH/BTC", Side::Ask),
            quote(dec!(0.020), dec!(3), "2020/06/01 10:00:00", "ETH/BTC", Side::Bid),
            quote(dec!(9000), dec!(1), "2020/06/01 10:00:00", "BTC/USDT", Side::Ask),
            quote(dec!(0.022), dec!(2), "2020/06/01 10:05:00", "ETH/BTC", Side::Ask),
            quote(dec!(9100), dec!(1), "2020/06/01 10:10:00", "BTC/USDT", Side::Bid),
        ])
    }

    #[test]
    fn test_known_symbols_unique() {
        let book = sample_book();
        let symbols = book.known_symbols();
        assert_eq!(symbols.len(), 2);
        assert!(symbols.contains(&Symbol::new("ETH/BTC")));
        assert!(symbols.contains(&Symbol::new("BTC/USDT")));
    }

    #[test]
    fn test_known_timestamps_chronological() {
        let book = sample_book();
        assert_eq!(
            book.known_timestamps(&Symbol::new("ETH/BTC")),
            vec!["2020/06/01 10:00:00", "2020/06/01 10:05:00"]
        );
        assert_eq!(
            book.known_timestamps(&Symbol::new("BTC/USDT")),
            vec!["2020/06/01 10:00:00", "2020/06/01 10:10:00"]
        );
    }

    #[test]
    fn test_query_filters_all_three_ways() {
        let book = sample_book();
        let asks = book.query(Side::Ask, &Symbol::new("ETH/BTC"), "2020/06/01 10:00:00");
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].price, dec!(0.021));

        let none = book.query(Side::Bid, &Symbol::new("BTC/USDT"), "2020/06/01 10:00:00");
        assert!(none.is_empty());
    }

    #[test]
    fn test_earliest_time_empty_store() {
        let book = OrderBook::new(Vec::new());
        assert_eq!(book.earliest_time(), Err(BookError::EmptyStore));
    }

    #[test]
    fn test_next_time_advances_and_wraps() {
        let book = sample_book();
        assert_eq!(book.earliest_time().unwrap(), "2020/06/01 10:00:00");
        assert_eq!(
            book.next_time("2020/06/01 10:00:00").unwrap(),
            "2020/06/01 10:05:00"
        );
        // Past the last timestamp the clock wraps to the earliest.
        assert_eq!(
            book.next_time("2020/06/01 10:10:00").unwrap(),
            "2020/06/01 10:00:00"
        );
    }

    #[test]
    fn test_insert_keeps_sort_and_query_consistent() {
        let mut book = sample_book();
        book.insert(quote(
            dec!(0.0205),
            dec!(1),
            "2020/06/01 10:00:00",
            "ETH/BTC",
            Side::Bid,
        ));

        // Inserted after the existing 10:00:00 bid: insertion order holds.
        let bids = book.query(Side::Bid, &Symbol::new("ETH/BTC"), "2020/06/01 10:00:00");
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].price, dec!(0.020));
        assert_eq!(bids[1].price, dec!(0.0205));

        assert_eq!(
            book.next_time("2020/06/01 10:00:00").unwrap(),
            "2020/06/01 10:05:00"
        );
    }

    #[test]
    fn test_high_low_price() {
        let quotes = vec![
            quote(dec!(10), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(30), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(20), dec!(1), "t", "A/B", Side::Ask),
        ];
        assert_eq!(OrderBook::high_price(&quotes).unwrap(), dec!(30));
        assert_eq!(OrderBook::low_price(&quotes).unwrap(), dec!(10));
    }

    #[test]
    fn test_high_low_price_empty_input() {
        assert_eq!(OrderBook::high_price(&[]), Err(BookError::EmptyInput));
        assert_eq!(OrderBook::low_price(&[]), Err(BookError::EmptyInput));
    }

    #[test]
    fn test_average_price_filters_by_symbol() {
        let quotes = vec![
            quote(dec!(10), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(20), dec!(1), "t", "B/C", Side::Ask),
            quote(dec!(30), dec!(1), "t", "A/B", Side::Ask),
        ];
        assert_eq!(
            OrderBook::average_price(&quotes, &Symbol::new("A/B")).unwrap(),
            dec!(20)
        );
        assert_eq!(
            OrderBook::average_price(&quotes, &Symbol::new("X/Y")),
            Err(BookError::NoMatch {
                symbol: Symbol::new("X/Y")
            })
        );
    }

    #[test]
    fn test_return_on_investment_formula() {
        let quotes = vec![
            quote(dec!(10), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(30), dec!(1), "t", "A/B", Side::Ask),
        ];
        // ((30 - 10) - 10) / 10 * 100
        assert_eq!(OrderBook::return_on_investment(&quotes).unwrap(), dec!(100));
        assert_eq!(
            OrderBook::return_on_investment(&[]),
            Err(BookError::EmptyInput)
        );
    }

    #[test]
    fn test_roi_as_float() {
        use approx::assert_relative_eq;
        use rust_decimal::prelude::ToPrimitive;

        let quotes = vec![
            quote(dec!(8), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(20), dec!(1), "t", "A/B", Side::Ask),
        ];
        let roi = OrderBook::return_on_investment(&quotes).unwrap();
        assert_relative_eq!(roi.to_f64().unwrap(), 50.0);
    }

    #[test]
    fn test_current_prices_best_first() {
        let book = OrderBook::new(vec![
            quote(dec!(3), dec!(1), "t", "A/B", Side::Bid),
            quote(dec!(5), dec!(1), "t", "A/B", Side::Bid),
            quote(dec!(4), dec!(1), "t", "A/B", Side::Ask),
            quote(dec!(2), dec!(1), "t", "A/B", Side::Ask),
        ]);
        let symbol = Symbol::new("A/B");
        assert_eq!(
            book.current_prices(Side::Ask, &symbol, "t"),
            vec![dec!(2), dec!(4)]
        );
        assert_eq!(
            book.current_prices(Side::Bid, &symbol, "t"),
            vec![dec!(5), dec!(3)]
        );
    }

    #[test]
    fn test_match_equal_amounts_single_trade() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(0.5), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(210), dec!(0.5), "t1", "ETH/BTC", Side::Bid),
        ]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(200));
        assert_eq!(trades[0].amount, dec!(0.5));
    }

    #[test]
    fn test_match_large_ask_consumed_by_two_bids() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(1.0), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(210), dec!(0.4), "t1", "ETH/BTC", Side::Bid),
            quote(dec!(205), dec!(0.6), "t1", "ETH/BTC", Side::Bid),
        ]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        assert_eq!(trades.len(), 2);
        // Highest bid first slices 0.4 off the ask, the second clears it.
        assert_eq!(trades[0].amount, dec!(0.4));
        assert_eq!(trades[0].price, dec!(200));
        assert_eq!(trades[1].amount, dec!(0.6));
        assert_eq!(trades[1].price, dec!(200));
    }

    #[test]
    fn test_match_bid_below_ask_produces_nothing() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(1), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(199), dec!(1), "t1", "ETH/BTC", Side::Bid),
        ]);
        assert!(book
            .match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1")
            .is_empty());
    }

    #[test]
    fn test_match_empty_side_short_circuits() {
        let book = OrderBook::new(vec![quote(
            dec!(200),
            dec!(1),
            "t1",
            "ETH/BTC",
            Side::Ask,
        )]);
        assert!(book
            .match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1")
            .is_empty());
        assert!(book
            .match_asks_to_bids(&Symbol::new("DOGE/BTC"), "t1")
            .is_empty());
    }

    #[test]
    fn test_match_does_not_mutate_store() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(0.5), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(210), dec!(0.5), "t1", "ETH/BTC", Side::Bid),
        ]);
        let symbol = Symbol::new("ETH/BTC");

        let first = book.match_asks_to_bids(&symbol, "t1");
        let second = book.match_asks_to_bids(&symbol, "t1");
        assert_eq!(first, second);

        // Stored amounts are untouched.
        let asks = book.query(Side::Ask, &symbol, "t1");
        assert_eq!(asks[0].amount, dec!(0.5));
    }

    #[test]
    fn test_match_conserves_amounts() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(1.5), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(201), dec!(2.0), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(210), dec!(0.7), "t1", "ETH/BTC", Side::Bid),
            quote(dec!(205), dec!(1.1), "t1", "ETH/BTC", Side::Bid),
            quote(dec!(199), dec!(4.0), "t1", "ETH/BTC", Side::Bid),
        ]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        let traded: Decimal = trades.iter().map(|t| t.amount).sum();
        // 0.7 + 0.8 against the cheap ask, then 0.3 against the second.
        assert_eq!(traded, dec!(1.8));
        // Never more than the thinner side of the original book.
        assert!(traded <= dec!(3.5).min(dec!(5.8)));
    }

    #[test]
    fn test_trade_inherits_real_account() {
        let mut bid = quote(dec!(210), dec!(0.5), "t1", "ETH/BTC", Side::Bid);
        bid = bid.with_account("simuser");
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(0.5), "t1", "ETH/BTC", Side::Ask),
            bid,
        ]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].account, "simuser");
        assert_eq!(trades[0].side, Side::BidTrade);
    }

    #[test]
    fn test_trade_ask_account_wins_over_bid() {
        let ask = quote(dec!(200), dec!(0.5), "t1", "ETH/BTC", Side::Ask).with_account("alice");
        let bid = quote(dec!(210), dec!(0.5), "t1", "ETH/BTC", Side::Bid).with_account("bob");
        let book = OrderBook::new(vec![ask, bid]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        assert_eq!(trades[0].account, "alice");
        assert_eq!(trades[0].side, Side::AskTrade);
    }

    #[test]
    fn test_dataset_only_trade_keeps_sentinel() {
        let book = OrderBook::new(vec![
            quote(dec!(200), dec!(0.5), "t1", "ETH/BTC", Side::Ask),
            quote(dec!(210), dec!(0.5), "t1", "ETH/BTC", Side::Bid),
        ]);
        let trades = book.match_asks_to_bids(&Symbol::new("ETH/BTC"), "t1");
        assert!(trades[0].is_sentinel());
    }
}
