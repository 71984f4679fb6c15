use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{PriceLevel, TopOfBook};

/// Upstream feed errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The session could not be established
    #[error("Connection error: {0}")]
    Connection(String),
    /// A round-trip failed on an established session
    #[error("Fetch error: {0}")]
    Fetch(String),
}

/// Depth response: `{"bids": [["99.5", "2"]], "asks": [["100.5", "1"]]}`
#[derive(Debug, Deserialize)]
pub struct DepthResponse {
    #[serde(default)]
    pub bids: Vec<[String; 2]>,
    #[serde(default)]
    pub asks: Vec<[String; 2]>,
}

impl DepthResponse {
    /// Highest bid and lowest ask. The upstream order is not trusted.
    pub fn top_of_book(&self) -> Result<TopOfBook, FeedError> {
        let bids = parse_levels(&self.bids, "bid")?;
        let asks = parse_levels(&self.asks, "ask")?;

        let best_bid = bids.into_iter().max_by(|a, b| a.price.cmp(&b.price));
        let best_ask = asks.into_iter().min_by(|a, b| a.price.cmp(&b.price));

        Ok(TopOfBook::new(best_ask, best_bid))
    }
}

fn parse_levels(raw: &[[String; 2]], side: &str) -> Result<Vec<PriceLevel>, FeedError> {
    raw.iter()
        .map(|[price, size]| {
            let price = Decimal::from_str(price.trim())
                .map_err(|e| FeedError::Fetch(format!("Failed to parse {} price '{}': {}", side, price, e)))?;
            let size = Decimal::from_str(size.trim())
                .map_err(|e| FeedError::Fetch(format!("Failed to parse {} size '{}': {}", side, size, e)))?;
            Ok(PriceLevel::new(price, size))
        })
        .collect()
}
