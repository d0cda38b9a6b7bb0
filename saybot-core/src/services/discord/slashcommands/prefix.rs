// File: saybot-core/src/services/discord/slashcommands/prefix.rs

use tracing::warn;
use twilight_model::application::command::CommandType;
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

use saybot_common::models::UserId;

use super::CommandReply;
use crate::services::SettingsService;

pub const PREFIX_UPDATED: &str = "Your prefix has been updated";

/// `/prefix value:<string>`
pub fn create_prefix_command() -> CommandBuilder {
    CommandBuilder::new("prefix", "Sets the prefix to trigger TTS", CommandType::ChatInput)
        .option(StringBuilder::new("value", "The text string to use as a prefix").required(true))
}

pub async fn handle_prefix_command(settings: &SettingsService, user_id: UserId, value: &str) -> CommandReply {
    match settings.set_prefix(user_id.get(), value).await {
        Ok(_) => CommandReply::ephemeral(PREFIX_UPDATED),
        Err(e) => {
            warn!("Saving prefix for user {user_id} failed: {e}");
            CommandReply::ephemeral(format!("I couldn't save your prefix: {e}"))
        }
    }
}
