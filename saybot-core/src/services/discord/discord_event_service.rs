// File: saybot-core/src/services/discord/discord_event_service.rs

use std::sync::Arc;

use songbird::Songbird;
use tracing::{error, info, trace, warn};
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::Event;
use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

use crate::services::SettingsService;
use crate::services::discord::message_handler::handle_message_create;
use crate::services::discord::slashcommands::handle_interaction_create;
use crate::voice::VoiceModule;

/// Routes gateway events to songbird, the voice module and the command
/// handlers. The shard runner calls `handle_event` on a fresh task per event.
pub struct DiscordEventService {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    application_id: Id<ApplicationMarker>,
    songbird: Arc<Songbird>,
    voice: VoiceModule,
    settings: Arc<SettingsService>,
}

impl DiscordEventService {
    pub fn new(
        http: Arc<HttpClient>,
        cache: Arc<InMemoryCache>,
        application_id: Id<ApplicationMarker>,
        songbird: Arc<Songbird>,
        voice: VoiceModule,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            http,
            cache,
            application_id,
            songbird,
            voice,
            settings,
        }
    }

    pub async fn handle_event(&self, event: Event) {
        // Voice server and voice state updates drive songbird's connections.
        self.songbird.process(&event).await;

        match event {
            Event::Ready(ready) => {
                info!(
                    "READY as {} (ID={}) in {} guild(s)",
                    ready.user.name,
                    ready.user.id,
                    ready.guilds.len()
                );
            }
            Event::MessageCreate(msg) => {
                if let Err(e) = handle_message_create(&self.http, &self.voice, &self.settings, &msg).await {
                    error!("Handling message {} failed: {e}", msg.id);
                }
            }
            Event::VoiceStateUpdate(update) => {
                let state = &update.0;
                let Some(guild_id) = state.guild_id else {
                    return;
                };
                let Some(bot_user) = self.cache.current_user().map(|u| u.id) else {
                    warn!("Voice state update before READY, ignoring");
                    return;
                };
                self.voice
                    .handle_voice_state_update(bot_user, state.user_id, guild_id, state.channel_id)
                    .await;
            }
            Event::InteractionCreate(interaction) => {
                if let Err(e) = handle_interaction_create(
                    self.http.clone(),
                    self.application_id,
                    &self.voice,
                    &self.settings,
                    &interaction,
                )
                .await
                {
                    error!("Handling interaction {} failed: {e}", interaction.id);
                }
            }
            other => {
                trace!("Unhandled event: {:?}", other.kind());
            }
        }
    }
}
