use async_trait::async_trait;
use serenity::all::ActivityData;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

use super::{PresenceSink, PushError};

/// Presence sink backed by the bot's gateway session
#[derive(Clone)]
pub struct DiscordPresence {
    ctx: Context,
}

impl DiscordPresence {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PresenceSink for DiscordPresence {
    fn targets(&self) -> Vec<GuildId> {
        self.ctx.cache.guilds()
    }

    async fn set_nickname(&self, target: GuildId, text: &str) -> Result<(), PushError> {
        target
            .edit_nickname(&self.ctx.http, Some(text))
            .await
            .map_err(|e| {
                let error_msg = e.to_string();
                if error_msg.contains("429") || error_msg.contains("rate limit") {
                    PushError::Discord(format!("Rate limited while renaming in {}: {}", target, error_msg))
                } else {
                    PushError::Discord(format!("Failed to set nickname in {}: {}", target, error_msg))
                }
            })
    }

    async fn set_status(&self, text: &str) -> Result<(), PushError> {
        // queued on the shard; the gateway gives no acknowledgement
        self.ctx.set_activity(Some(ActivityData::watching(text)));
        Ok(())
    }
}
