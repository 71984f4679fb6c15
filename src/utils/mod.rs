pub mod shutdown;

pub use shutdown::{Cancelled, MonitorHandle, Shutdown};
