// File: saybot-core/src/services/discord/slashcommands/leave.rs

use twilight_model::application::command::CommandType;
use twilight_util::builder::command::CommandBuilder;

use saybot_common::models::{GuildId, UserId};

use super::CommandReply;
use crate::voice::{LeaveOutcome, VoiceModule};

pub const NOT_CONNECTED: &str = "I'm not in any voice channel";
pub const NOT_IN_SAME_CHANNEL: &str = "You need to be in my voice channel to make me leave";
pub const DISCONNECTED: &str = "Successfully disconnected!";

/// `/leave`, guilds only.
pub fn create_leave_command() -> CommandBuilder {
    CommandBuilder::new("leave", "Leave the current voice chat", CommandType::ChatInput)
        .dm_permission(false)
}

pub fn leave_reply(outcome: LeaveOutcome) -> CommandReply {
    match outcome {
        LeaveOutcome::NotConnected => CommandReply::ephemeral(NOT_CONNECTED),
        LeaveOutcome::NotInSameChannel => CommandReply::ephemeral(NOT_IN_SAME_CHANNEL),
        LeaveOutcome::Disconnected => CommandReply::public(DISCONNECTED),
    }
}

pub async fn handle_leave_command(
    voice: &VoiceModule,
    guild_id: Option<GuildId>,
    user_id: UserId,
) -> CommandReply {
    let outcome = match guild_id {
        Some(guild_id) => voice.leave(guild_id, user_id).await,
        None => LeaveOutcome::NotConnected,
    };
    leave_reply(outcome)
}
