//! Order-book and baseline models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// One price level of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Best level on each side, as returned by a single depth fetch.
/// Either side may be missing when the book is empty (or not loaded yet).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub best_ask: Option<PriceLevel>,
    pub best_bid: Option<PriceLevel>,
}

impl TopOfBook {
    pub fn new(best_ask: Option<PriceLevel>, best_bid: Option<PriceLevel>) -> Self {
        Self { best_ask, best_bid }
    }

    /// `(bid, ask)` when both sides are present
    pub fn quote(&self) -> Option<(PriceLevel, PriceLevel)> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid, ask)),
            _ => None,
        }
    }
}

/// Daily baseline: the mid-price taken on the first tick of a UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub mid_price: Decimal,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, mid_price: Decimal) -> Self {
        Self { timestamp, mid_price }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// What gets published for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub label: String,
    pub change_pct: Option<Decimal>,
}

/// Outcome of evaluating one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// One side of the book was empty; nothing published
    Skipped,
    Published {
        mid_price: Decimal,
        display: DisplayState,
        baseline_replaced: bool,
    },
}
