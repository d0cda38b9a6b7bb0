// File: saybot-common/src/traits/voice_traits.rs
//
// The seams between the voice core and the services it drives.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::VoiceError;
use crate::models::{ChannelId, GuildId, SynthesisRequest, UserId, VoicePage};

/// Synthesized audio, in the requested container, as it arrives.
pub type SpeechStream = Pin<Box<dyn AsyncRead + Send>>;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SpeechStream, VoiceError>;

    /// One page of the voice listing; pass the previous page's token to continue.
    async fn list_voices(&self, next_token: Option<String>) -> Result<VoicePage, VoiceError>;
}

/// A live voice connection bound to one channel of one guild.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn guild_id(&self) -> GuildId;
    fn channel_id(&self) -> ChannelId;

    /// Queues one encoded frame. Waits while the transport's queue is full.
    async fn send_frame(&self, frame: Bytes) -> Result<(), VoiceError>;

    /// Marks the end of one utterance and waits until it has been played out.
    async fn finish_stream(&self) -> Result<(), VoiceError>;

    async fn disconnect(&self) -> Result<(), VoiceError>;
}

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    /// A connection that was established outside the session registry, if any.
    async fn existing(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceConnection>>;

    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError>;

    /// Tears down whatever is left of a guild's connection, complete or not.
    async fn leave(&self, guild_id: GuildId) -> Result<(), VoiceError>;
}

/// Where users currently are in voice.
pub trait VoiceStateLookup: Send + Sync {
    fn voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;
}
