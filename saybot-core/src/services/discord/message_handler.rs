// File: saybot-core/src/services/discord/message_handler.rs
//
// Chat messages that start with the author's prefix get spoken.

use twilight_http::Client as HttpClient;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::gateway::payload::incoming::MessageCreate;
use twilight_model::id::Id;
use twilight_model::id::marker::MessageMarker;
use tracing::{debug, trace};

use saybot_common::models::ChannelId;

use crate::Error;
use crate::services::SettingsService;
use crate::voice::VoiceModule;

/// The text to speak, if `content` is `"{prefix} ..."` with something after
/// the prefix.
pub fn extract_utterance<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(prefix)?;
    if !rest.starts_with(' ') {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

pub async fn handle_message_create(
    http: &HttpClient,
    voice: &VoiceModule,
    settings: &SettingsService,
    msg: &MessageCreate,
) -> Result<(), Error> {
    if msg.author.bot {
        trace!("Ignoring bot message from {}", msg.author.name);
        return Ok(());
    }
    // No voice outside guilds.
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let user = settings.get(msg.author.id.get()).await?;
    let Some(text) = extract_utterance(&msg.content, &user.prefix) else {
        return Ok(());
    };

    debug!(
        "{} asked to speak {} char(s) in guild {guild_id} as {}",
        msg.author.name,
        text.chars().count(),
        user.voice
    );

    if let Err(e) = voice
        .handle_say(text, &user.speaker_profile(), guild_id, msg.author.id)
        .await
    {
        debug!("Speech for {} failed: {e}", msg.author.name);
        reply_quietly(http, msg.channel_id, msg.id, &e.to_string()).await?;
    }

    Ok(())
}

/// Replies without pinging anyone, the author included.
async fn reply_quietly(
    http: &HttpClient,
    channel_id: ChannelId,
    message_id: Id<MessageMarker>,
    content: &str,
) -> Result<(), Error> {
    let no_mentions = AllowedMentions::default();
    http.create_message(channel_id)
        .content(content)
        .reply(message_id)
        .allowed_mentions(Some(&no_mentions))
        .await
        .map_err(|e| Error::Platform(format!("Error replying on Discord: {e}")))?;
    Ok(())
}
