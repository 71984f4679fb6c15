pub mod monitor_service;
pub mod price_service;

pub use monitor_service::{MonitorTiming, PriceMonitor};
pub use price_service::DisplayFormat;
