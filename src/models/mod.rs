//! Data models shared by the feed, the monitor and the presence sink

pub mod price;

pub use price::{DisplayState, PriceLevel, Snapshot, TickReport, TopOfBook};
