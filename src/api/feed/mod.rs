pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::models::TopOfBook;

pub use client::{DepthFeed, DepthFeedSettings};
pub use models::FeedError;

/// Upstream order-book source.
///
/// Implementations translate one upstream call into a [`TopOfBook`] and keep no
/// state beyond the open connection. Retries belong to the caller.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    type Connection: Send;

    /// Open a session. Fails with [`FeedError::Connection`].
    async fn connect(&self) -> Result<Self::Connection, FeedError>;

    /// Best ask and best bid, either of which may be absent. Fails with [`FeedError::Fetch`].
    async fn fetch_top_of_book(&self, conn: &mut Self::Connection) -> Result<TopOfBook, FeedError>;

    /// Best-effort release of the session
    async fn close(&self, conn: Self::Connection);
}
