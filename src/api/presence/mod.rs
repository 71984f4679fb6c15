pub mod discord;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use thiserror::Error;

pub use discord::DiscordPresence;

/// Presence sink errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("Discord error: {0}")]
    Discord(String),
}

/// Push-only sink for the bot's nickname and status
#[async_trait]
pub trait PresenceSink: Send + Sync {
    /// Guilds whose nickname should be updated
    fn targets(&self) -> Vec<GuildId>;

    async fn set_nickname(&self, target: GuildId, text: &str) -> Result<(), PushError>;

    /// Shown as a "Watching <text>" activity
    async fn set_status(&self, text: &str) -> Result<(), PushError>;
}
