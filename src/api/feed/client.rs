use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use super::models::{DepthResponse, FeedError};
use super::FeedConnector;
use crate::models::TopOfBook;

/// Routes and transport limits of the depth endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFeedSettings {
    pub depth_path: String,
    pub ping_path: String,
    pub request_timeout: Duration,
}

impl Default for DepthFeedSettings {
    fn default() -> Self {
        Self {
            depth_path: DepthFeed::DEFAULT_DEPTH_PATH.to_string(),
            ping_path: DepthFeed::DEFAULT_PING_PATH.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP JSON order-book feed for a single symbol
pub struct DepthFeed {
    base_url: String,
    symbol: String,
    settings: DepthFeedSettings,
}

/// An open session against the depth endpoint. `None` once closed.
pub struct DepthConnection {
    http_client: Option<HttpClient>,
}

impl DepthFeed {
    pub const DEFAULT_DEPTH_PATH: &'static str = "/api/v3/depth";
    pub const DEFAULT_PING_PATH: &'static str = "/api/v3/ping";

    pub fn new(base_url: &str, symbol: &str, settings: DepthFeedSettings) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            symbol: normalize_symbol(symbol),
            settings,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn depth_url(&self) -> String {
        format!(
            "{}{}?symbol={}&limit=1",
            self.base_url, self.settings.depth_path, self.symbol
        )
    }

    pub fn ping_url(&self) -> String {
        format!("{}{}", self.base_url, self.settings.ping_path)
    }
}

#[async_trait]
impl FeedConnector for DepthFeed {
    type Connection = DepthConnection;

    async fn connect(&self) -> Result<DepthConnection, FeedError> {
        let http_client = HttpClient::builder()
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|e| FeedError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        let url = self.ping_url();
        let response = http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Connection(format!("Handshake with {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(FeedError::Connection(format!(
                "Handshake with {} returned status {}",
                url,
                response.status()
            )));
        }

        debug!("Connected to {}", self.base_url);
        Ok(DepthConnection {
            http_client: Some(http_client),
        })
    }

    async fn fetch_top_of_book(&self, conn: &mut DepthConnection) -> Result<TopOfBook, FeedError> {
        let http_client = conn
            .http_client
            .as_ref()
            .ok_or_else(|| FeedError::Fetch("Connection is closed".to_string()))?;

        let response = http_client
            .get(self.depth_url())
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(FeedError::Fetch(format!(
                "HTTP error: status {}, response: {}",
                status,
                body_text.chars().take(200).collect::<String>()
            )));
        }

        let depth = response
            .json::<DepthResponse>()
            .await
            .map_err(|e| FeedError::Fetch(format!("Failed to parse depth response: {}", e)))?;

        depth.top_of_book()
    }

    async fn close(&self, mut conn: DepthConnection) {
        if conn.http_client.take().is_some() {
            debug!("Closed connection to {}", self.base_url);
        }
    }
}

/// `"sol/usdc"` -> `"SOLUSDC"`
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_'))
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceLevel;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("sol/usdc"), "SOLUSDC");
        assert_eq!(normalize_symbol(" BTC-USDT "), "BTCUSDT");
        assert_eq!(normalize_symbol("eth_btc"), "ETHBTC");
    }

    #[test]
    fn test_urls_are_built_from_base_and_routes() {
        let feed = DepthFeed::new("https://api.example.com/", "SOL/USDC", DepthFeedSettings::default());
        assert_eq!(
            feed.depth_url(),
            "https://api.example.com/api/v3/depth?symbol=SOLUSDC&limit=1"
        );
        assert_eq!(feed.ping_url(), "https://api.example.com/api/v3/ping");
    }

    #[tokio::test]
    async fn test_fetch_on_closed_connection_fails() {
        let feed = DepthFeed::new("http://127.0.0.1:9", "SOLUSDC", DepthFeedSettings::default());
        let mut conn = DepthConnection { http_client: None };
        let err = feed.fetch_top_of_book(&mut conn).await.unwrap_err();
        assert!(matches!(err, FeedError::Fetch(_)));

        // closing twice is harmless
        feed.close(conn).await;
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_endpoint_is_connection_error() {
        let settings = DepthFeedSettings {
            request_timeout: Duration::from_millis(500),
            ..DepthFeedSettings::default()
        };
        // port 9 (discard) is not expected to serve HTTP
        let feed = DepthFeed::new("http://127.0.0.1:9", "SOLUSDC", settings);
        let err = feed.connect().await.err().unwrap();
        assert!(matches!(err, FeedError::Connection(_)));
    }

    type Route = (&'static str, u16, &'static str);

    /// Minimal HTTP/1.1 server answering by path prefix, one response per connection
    async fn serve(routes: Vec<Route>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = routes
                        .iter()
                        .find(|(prefix, _, _)| path.starts_with(prefix))
                        .map(|(_, status, body)| (*status, *body))
                        .unwrap_or((404, "{}"));

                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    const DEPTH_BODY: &str =
        r#"{"lastUpdateId": 7, "bids": [["99.00", "1.5"]], "asks": [["101.00", "0.2"]]}"#;

    #[tokio::test]
    async fn test_connect_and_fetch_against_live_server() {
        let base = serve(vec![("/api/v3/ping", 200, "{}"), ("/api/v3/depth", 200, DEPTH_BODY)]).await;
        let feed = DepthFeed::new(&base, "SOL/USDC", DepthFeedSettings::default());

        let mut conn = feed.connect().await.unwrap();
        let book = feed.fetch_top_of_book(&mut conn).await.unwrap();

        assert_eq!(book.best_bid, Some(PriceLevel::new(dec!(99.00), dec!(1.5))));
        assert_eq!(book.best_ask, Some(PriceLevel::new(dec!(101.00), dec!(0.2))));

        feed.close(conn).await;
    }

    #[tokio::test]
    async fn test_empty_book_from_server_has_no_levels() {
        let base = serve(vec![
            ("/api/v3/ping", 200, "{}"),
            ("/api/v3/depth", 200, r#"{"bids": [], "asks": []}"#),
        ])
        .await;
        let feed = DepthFeed::new(&base, "SOLUSDC", DepthFeedSettings::default());

        let mut conn = feed.connect().await.unwrap();
        assert_eq!(feed.fetch_top_of_book(&mut conn).await.unwrap(), TopOfBook::default());
    }

    #[tokio::test]
    async fn test_failed_handshake_is_connection_error() {
        let base = serve(vec![("/api/v3/ping", 503, "{}")]).await;
        let feed = DepthFeed::new(&base, "SOLUSDC", DepthFeedSettings::default());

        match feed.connect().await {
            Err(FeedError::Connection(msg)) => assert!(msg.contains("503")),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("handshake should fail"),
        }
    }

    #[tokio::test]
    async fn test_depth_http_error_is_fetch_error() {
        let base = serve(vec![
            ("/api/v3/ping", 200, "{}"),
            ("/api/v3/depth", 500, r#"{"msg": "internal"}"#),
        ])
        .await;
        let feed = DepthFeed::new(&base, "SOLUSDC", DepthFeedSettings::default());

        let mut conn = feed.connect().await.unwrap();
        match feed.fetch_top_of_book(&mut conn).await {
            Err(FeedError::Fetch(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("internal"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_depth_body_is_fetch_error() {
        let base = serve(vec![
            ("/api/v3/ping", 200, "{}"),
            ("/api/v3/depth", 200, "<html>maintenance</html>"),
        ])
        .await;
        let feed = DepthFeed::new(&base, "SOLUSDC", DepthFeedSettings::default());

        let mut conn = feed.connect().await.unwrap();
        let err = feed.fetch_top_of_book(&mut conn).await.unwrap_err();
        assert!(matches!(err, FeedError::Fetch(_)));
    }
}
