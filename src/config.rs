//! Bot configuration
//!
//! Read once at startup from a TOML document:
//!
//! ```toml
//! Symbol = "SOL/USDC"
//! Digits = 2
//! Suffix = ""
//! Currency = "USDC"
//! DiscordToken = "..."
//! Rpc = "https://api.example.com"
//! RpcRedirect = "https://example.com/current-endpoint.txt"
//! ```
//!
//! `DISCORD_TOKEN` in the environment (or `.env`) overrides `DiscordToken`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::api::feed::{DepthFeed, DepthFeedSettings};
use crate::services::{DisplayFormat, MonitorTiming};

const MAX_DIGITS: u32 = 18;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Io(String, std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Endpoint redirect failed: {0}")]
    Redirect(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub symbol: String,
    pub digits: u32,
    #[serde(default)]
    pub suffix: String,
    pub currency: String,
    #[serde(default)]
    pub discord_token: Option<String>,
    pub rpc: String,
    #[serde(default)]
    pub rpc_redirect: Option<String>,
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: f64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: f64,
    #[serde(default = "default_push_delay")]
    pub push_delay_secs: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: f64,
    #[serde(default = "default_depth_path")]
    pub depth_path: String,
    #[serde(default = "default_ping_path")]
    pub ping_path: String,
}

fn default_sample_interval() -> f64 {
    10.0
}

fn default_reconnect_delay() -> f64 {
    5.0
}

fn default_push_delay() -> f64 {
    0.5
}

fn default_request_timeout() -> f64 {
    10.0
}

fn default_depth_path() -> String {
    DepthFeed::DEFAULT_DEPTH_PATH.to_string()
}

fn default_ping_path() -> String {
    DepthFeed::DEFAULT_PING_PATH.to_string()
}

impl Config {
    /// Read, apply the environment override and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        let env_token = std::env::var("DISCORD_TOKEN").ok();
        Self::from_toml(&text, env_token)
    }

    pub fn from_toml(text: &str, env_token: Option<String>) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)?;
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            config.discord_token = Some(token);
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("Symbol cannot be empty".to_string()));
        }
        if self.rpc.trim().is_empty() {
            return Err(ConfigError::Invalid("Rpc cannot be empty".to_string()));
        }
        if self.digits > MAX_DIGITS {
            return Err(ConfigError::Invalid(format!(
                "Digits must be at most {}, got {}",
                MAX_DIGITS, self.digits
            )));
        }
        if self.token().is_none() {
            return Err(ConfigError::Invalid(
                "DiscordToken is not set (config or DISCORD_TOKEN)".to_string(),
            ));
        }

        let intervals = [
            ("SampleIntervalSecs", self.sample_interval_secs),
            ("ReconnectDelaySecs", self.reconnect_delay_secs),
            ("PushDelaySecs", self.push_delay_secs),
            ("RequestTimeoutSecs", self.request_timeout_secs),
        ];
        for (name, secs) in intervals {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a non-negative number of seconds in range, got {}",
                    name, secs
                ))
            })?;
        }
        if self.request_timeout_secs == 0.0 {
            return Err(ConfigError::Invalid("RequestTimeoutSecs must be positive".to_string()));
        }

        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.discord_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn display_format(&self) -> DisplayFormat {
        DisplayFormat::new(self.digits, self.suffix.clone(), self.currency.clone())
    }

    pub fn timing(&self) -> MonitorTiming {
        MonitorTiming {
            sample_interval: Duration::from_secs_f64(self.sample_interval_secs),
            reconnect_delay: Duration::from_secs_f64(self.reconnect_delay_secs),
            push_delay: Duration::from_secs_f64(self.push_delay_secs),
        }
    }

    pub fn feed_settings(&self) -> DepthFeedSettings {
        DepthFeedSettings {
            depth_path: self.depth_path.clone(),
            ping_path: self.ping_path.clone(),
            request_timeout: Duration::from_secs_f64(self.request_timeout_secs),
        }
    }

    /// Upstream endpoint, following `RpcRedirect` once when configured
    pub async fn resolve_endpoint(&self) -> Result<String, ConfigError> {
        let Some(redirect) = self.rpc_redirect.as_deref() else {
            return Ok(self.rpc.trim().to_string());
        };

        info!("Resolving upstream endpoint via {}", redirect);
        let response = reqwest::get(redirect)
            .await
            .map_err(|e| ConfigError::Redirect(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ConfigError::Redirect(format!(
                "{} returned status {}",
                redirect,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConfigError::Redirect(format!("Failed to read body: {}", e)))?;

        parse_redirect_body(&body)
    }
}

fn parse_redirect_body(body: &str) -> Result<String, ConfigError> {
    let endpoint = body.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Redirect("Response body is empty".to_string()));
    }
    Ok(endpoint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        Symbol = "SOL/USDC"
        Digits = 3
        Currency = "USDC"
        DiscordToken = "token-from-file"
        Rpc = "https://api.example.com"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL, None).unwrap();

        assert_eq!(config.symbol, "SOL/USDC");
        assert_eq!(config.suffix, "");
        assert_eq!(config.rpc_redirect, None);
        assert_eq!(config.token(), Some("token-from-file"));
        assert_eq!(config.timing(), MonitorTiming::default());
        assert_eq!(config.feed_settings(), DepthFeedSettings::default());
        assert_eq!(config.display_format(), DisplayFormat::new(3, "", "USDC"));
    }

    #[test]
    fn test_env_token_overrides_file() {
        let config = Config::from_toml(MINIMAL, Some("token-from-env".to_string())).unwrap();
        assert_eq!(config.token(), Some("token-from-env"));

        let config = Config::from_toml(MINIMAL, Some("  ".to_string())).unwrap();
        assert_eq!(config.token(), Some("token-from-file"));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let text = MINIMAL.replace("DiscordToken = \"token-from-file\"", "");
        assert!(matches!(Config::from_toml(&text, None), Err(ConfigError::Invalid(_))));
        assert!(Config::from_toml(&text, Some("abc".to_string())).is_ok());
    }

    #[test]
    fn test_optional_keys_are_read() {
        let text = format!(
            "{}\nSuffix = \"SOL \"\nRpcRedirect = \"https://example.com/rpc.txt\"\nSampleIntervalSecs = 2.5\nPushDelaySecs = 0.0\nDepthPath = \"/depth\"",
            MINIMAL
        );
        let config = Config::from_toml(&text, None).unwrap();

        assert_eq!(config.suffix, "SOL ");
        assert_eq!(config.rpc_redirect.as_deref(), Some("https://example.com/rpc.txt"));
        assert_eq!(config.timing().sample_interval, Duration::from_millis(2500));
        assert_eq!(config.timing().push_delay, Duration::ZERO);
        assert_eq!(config.feed_settings().depth_path, "/depth");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let negative = format!("{}\nReconnectDelaySecs = -1.0", MINIMAL);
        assert!(matches!(Config::from_toml(&negative, None), Err(ConfigError::Invalid(_))));

        let huge = format!("{}\nSampleIntervalSecs = 1e30", MINIMAL);
        assert!(matches!(Config::from_toml(&huge, None), Err(ConfigError::Invalid(_))));

        let timeout = format!("{}\nRequestTimeoutSecs = 1e300", MINIMAL);
        assert!(matches!(Config::from_toml(&timeout, None), Err(ConfigError::Invalid(_))));

        let digits = MINIMAL.replace("Digits = 3", "Digits = 40");
        assert!(matches!(Config::from_toml(&digits, None), Err(ConfigError::Invalid(_))));

        let symbol = MINIMAL.replace("\"SOL/USDC\"", "\"  \"");
        assert!(matches!(Config::from_toml(&symbol, None), Err(ConfigError::Invalid(_))));

        let missing = MINIMAL.replace("Currency = \"USDC\"", "");
        assert!(matches!(Config::from_toml(&missing, None), Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn test_endpoint_without_redirect_is_rpc() {
        let config = Config::from_toml(MINIMAL, None).unwrap();
        assert_eq!(config.resolve_endpoint().await.unwrap(), "https://api.example.com");
    }

    #[test]
    fn test_redirect_body_is_trimmed() {
        assert_eq!(
            parse_redirect_body("  https://node.example.com\n").unwrap(),
            "https://node.example.com"
        );
        assert!(matches!(parse_redirect_body(" \n"), Err(ConfigError::Redirect(_))));
    }
}
