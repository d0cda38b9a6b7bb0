// File: saybot-core/src/voice/module.rs

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use saybot_common::error::VoiceError;
use saybot_common::models::{ChannelId, GuildId, SpeakerProfile, UserId};
use saybot_common::traits::voice_traits::{
    SpeechSynthesizer, VoiceConnection, VoiceConnector, VoiceStateLookup,
};

use crate::audio::{AudioPipeline, CodecFactory, OpusFrameCodec};
use super::catalog::VoiceCatalog;
use super::registry::SessionRegistry;
use super::session::VoiceSession;
use super::VoiceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    NotConnected,
    NotInSameChannel,
    Disconnected,
}

struct ModuleInner {
    registry: Arc<SessionRegistry>,
    connector: Arc<dyn VoiceConnector>,
    voice_states: Arc<dyn VoiceStateLookup>,
    pipeline: Arc<AudioPipeline>,
    codec_factory: CodecFactory,
    catalog: Arc<VoiceCatalog>,
    config: VoiceConfig,
}

/// Entry point for everything voice: owns the guild → session table and
/// routes chat and voice-state events to the right session.
#[derive(Clone)]
pub struct VoiceModule {
    inner: Arc<ModuleInner>,
}

pub struct VoiceModuleBuilder {
    connector: Arc<dyn VoiceConnector>,
    voice_states: Arc<dyn VoiceStateLookup>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    catalog: Arc<VoiceCatalog>,
    codec_factory: CodecFactory,
    config: VoiceConfig,
}

impl VoiceModuleBuilder {
    pub fn config(mut self, config: VoiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: Arc<VoiceCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn codec_factory(mut self, factory: CodecFactory) -> Self {
        self.codec_factory = factory;
        self
    }

    pub fn build(self) -> VoiceModule {
        let pipeline = AudioPipeline::new(self.synthesizer, self.config.transcoder.clone());
        VoiceModule {
            inner: Arc::new(ModuleInner {
                registry: Arc::new(SessionRegistry::new()),
                connector: self.connector,
                voice_states: self.voice_states,
                pipeline: Arc::new(pipeline),
                codec_factory: self.codec_factory,
                catalog: self.catalog,
                config: self.config,
            }),
        }
    }
}

impl VoiceModule {
    pub fn builder(
        connector: Arc<dyn VoiceConnector>,
        voice_states: Arc<dyn VoiceStateLookup>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> VoiceModuleBuilder {
        VoiceModuleBuilder {
            connector,
            voice_states,
            synthesizer,
            catalog: Arc::new(VoiceCatalog::default()),
            codec_factory: OpusFrameCodec::factory(),
            config: VoiceConfig::default(),
        }
    }

    pub fn catalog(&self) -> &Arc<VoiceCatalog> {
        &self.inner.catalog
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.inner.registry
    }

    pub async fn session(&self, guild_id: GuildId) -> Option<Arc<VoiceSession>> {
        self.inner.registry.get(guild_id).await
    }

    /// Speaks `text` in whatever voice channel `requester` is in.
    pub async fn handle_say(
        &self,
        text: &str,
        profile: &SpeakerProfile,
        guild_id: GuildId,
        requester: UserId,
    ) -> Result<usize, VoiceError> {
        let channel_id = self
            .inner
            .voice_states
            .voice_channel(guild_id, requester)
            .ok_or(VoiceError::NotInVoiceChannel)?;

        let session = self.get_or_create_session(guild_id, channel_id).await?;
        match session.say_message(text, profile).await {
            // Went idle between the lookup and the lock; one fresh session is fine.
            Err(VoiceError::SessionClosed) => {
                debug!("Session for guild {guild_id} closed under us, reconnecting");
                let session = self.get_or_create_session(guild_id, channel_id).await?;
                session.say_message(text, profile).await
            }
            other => other,
        }
    }

    /// The guild's session, created by joining `channel_id` if there is none.
    pub async fn get_or_create_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<VoiceSession>, VoiceError> {
        loop {
            if let Some(session) = self.inner.registry.get(guild_id).await {
                if session.is_closed() {
                    session.wait_closed().await;
                    continue;
                }
                return self.reuse(session, channel_id);
            }

            let mut sessions = self.inner.registry.write().await;

            // Someone may have won the race to the write lock.
            if let Some(session) = sessions.get(&guild_id).cloned() {
                drop(sessions);
                if session.is_closed() {
                    session.wait_closed().await;
                    continue;
                }
                return self.reuse(session, channel_id);
            }

            let codec = (self.inner.codec_factory)()?;
            let connection = self.connect(guild_id, channel_id).await?;

            let session = VoiceSession::start(
                connection,
                codec,
                self.inner.pipeline.clone(),
                Arc::downgrade(&self.inner.registry),
                self.inner.config.idle_timeout,
            );
            sessions.insert(guild_id, session.clone());

            info!("Voice session opened in guild {guild_id}, channel {channel_id}");
            return Ok(session);
        }
    }

    fn reuse(
        &self,
        session: Arc<VoiceSession>,
        channel_id: ChannelId,
    ) -> Result<Arc<VoiceSession>, VoiceError> {
        if session.channel_id() != channel_id {
            return Err(VoiceError::ChannelConflict);
        }
        // A request is about to follow.
        session.pulse();
        Ok(session)
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        if let Some(existing) = self.inner.connector.existing(guild_id).await {
            if existing.channel_id() != channel_id {
                return Err(VoiceError::ChannelConflict);
            }
            debug!("Adopting existing voice connection in guild {guild_id}");
            return Ok(existing);
        }

        match self.inner.connector.join(guild_id, channel_id).await {
            Ok(connection) => Ok(connection),
            Err(e) => {
                warn!("Joining channel {channel_id} in guild {guild_id} failed: {e}");
                let connector = self.inner.connector.clone();
                tokio::spawn(async move {
                    if let Err(e) = connector.leave(guild_id).await {
                        debug!("Cleaning up failed join in guild {guild_id}: {e}");
                    }
                });
                Err(match e {
                    join @ VoiceError::Join(_) => join,
                    other => VoiceError::Join(other.to_string()),
                })
            }
        }
    }

    /// `/leave`: only someone in the bot's channel may send it away.
    pub async fn leave(&self, guild_id: GuildId, requester: UserId) -> LeaveOutcome {
        let Some(session) = self.inner.registry.get(guild_id).await else {
            return LeaveOutcome::NotConnected;
        };

        match self.inner.voice_states.voice_channel(guild_id, requester) {
            Some(channel_id) if channel_id == session.channel_id() => {
                session.close().await;
                LeaveOutcome::Disconnected
            }
            _ => LeaveOutcome::NotInSameChannel,
        }
    }

    /// Reacts to the bot's own voice state changing under it: a disconnect or
    /// a move out of the session's channel ends the session. Returns whether a
    /// session was closed.
    pub async fn handle_voice_state_update(
        &self,
        bot_user: UserId,
        user_id: UserId,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
    ) -> bool {
        if user_id != bot_user {
            return false;
        }
        let Some(session) = self.inner.registry.get(guild_id).await else {
            return false;
        };
        if channel_id == Some(session.channel_id()) {
            return false;
        }

        info!(
            "Bot left voice channel {} in guild {guild_id} (now {:?}), closing session",
            session.channel_id(),
            channel_id
        );
        session.close().await
    }

    /// Closes every session at once, e.g. on shutdown. Each close still waits
    /// for its own session's utterance in progress.
    pub async fn close_all(&self) {
        let sessions = self.inner.registry.all().await;
        let count = sessions.len();
        join_all(sessions.iter().map(|session| session.close())).await;
        info!("Closed {count} voice session(s)");
    }
}
