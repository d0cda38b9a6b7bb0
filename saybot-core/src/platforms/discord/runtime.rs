// File: saybot-core/src/platforms/discord/runtime.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use songbird::Songbird;
use songbird::shards::TwilightMap;
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

use crate::Error;
use crate::services::discord::DiscordEventService;
use super::voice::SongbirdVoiceConnector;
use super::voice_state::CacheVoiceStates;

/// Reads one shard's events until the gateway closes it. Each event updates
/// the cache first, then gets its own task so a long utterance never stalls
/// the shard.
async fn shard_runner(mut shard: Shard, cache: Arc<InMemoryCache>, events: Arc<DiscordEventService>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                cache.update(&event);
                let events = events.clone();
                tokio::spawn(async move {
                    events.handle_event(event).await;
                });
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Gateway shards, HTTP client, cache and voice manager for one bot token.
///
/// `connect` prepares everything but does not read events yet, so the voice
/// module can be built on the runtime's shards before `start` wires it in.
pub struct DiscordRuntime {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    application_id: Id<ApplicationMarker>,
    songbird: Arc<Songbird>,
    pending_shards: Vec<Shard>,
    shard_senders: Vec<MessageSender>,
    shard_tasks: Vec<JoinHandle<()>>,
}

impl DiscordRuntime {
    pub async fn connect(token: String) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Platform("Discord token is empty".into()));
        }

        let http = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let application_id = http
            .current_user_application()
            .await
            .map_err(|e| Error::Platform(format!("Fetching application info failed: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Parsing application info failed: {e}")))?
            .id;

        let bot_user_id = http
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("Fetching current user failed: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Parsing current user failed: {e}")))?
            .id;

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(ResourceType::GUILD | ResourceType::VOICE_STATE | ResourceType::USER_CURRENT)
                .build(),
        );

        let config = Config::new(
            token,
            Intents::GUILDS | Intents::GUILD_VOICE_STATES | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
        );

        let shards: Vec<Shard> = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?
            .collect();

        let shard_senders = shards.iter().map(|shard| shard.sender()).collect();
        let voice_senders = TwilightMap::new(
            shards
                .iter()
                .map(|shard| (shard.id().number().into(), shard.sender()))
                .collect(),
        );
        let songbird = Arc::new(Songbird::twilight(Arc::new(voice_senders), bot_user_id));
        info!("Discord application {application_id}: {} shard(s) prepared", shards.len());

        Ok(Self {
            http,
            cache,
            application_id,
            songbird,
            pending_shards: shards,
            shard_senders,
            shard_tasks: Vec::new(),
        })
    }

    pub fn http(&self) -> Arc<HttpClient> {
        self.http.clone()
    }

    pub fn cache(&self) -> Arc<InMemoryCache> {
        self.cache.clone()
    }

    pub fn application_id(&self) -> Id<ApplicationMarker> {
        self.application_id
    }

    /// Needs every gateway event; `DiscordEventService` forwards them.
    pub fn songbird(&self) -> Arc<Songbird> {
        self.songbird.clone()
    }

    pub fn voice_connector(&self) -> SongbirdVoiceConnector {
        SongbirdVoiceConnector::new(self.songbird.clone())
    }

    pub fn voice_states(&self) -> CacheVoiceStates {
        CacheVoiceStates::new(self.cache.clone())
    }

    /// Spawns one runner per shard. Calling it again does nothing.
    pub fn start(&mut self, events: Arc<DiscordEventService>) {
        if self.pending_shards.is_empty() {
            info!("(DiscordRuntime) Already started => skipping");
            return;
        }

        for shard in self.pending_shards.drain(..) {
            let cache = self.cache.clone();
            let events = events.clone();
            self.shard_tasks.push(tokio::spawn(shard_runner(shard, cache, events)));
        }
        info!("(DiscordRuntime) {} shard runner(s) started", self.shard_tasks.len());
    }

    pub async fn disconnect(&mut self) {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in self.shard_tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Shard task ended abnormally: {e}");
            }
        }

        self.shard_senders.clear();
        info!("(DiscordRuntime) Disconnected");
    }
}
