// File: saybot-core/src/voice/session.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use saybot_common::error::VoiceError;
use saybot_common::models::{ChannelId, GuildId, SpeakerProfile};
use saybot_common::traits::voice_traits::VoiceConnection;

use crate::audio::{AudioPipeline, FrameCodec, FrameSink};
use super::registry::SessionRegistry;
use super::watchdog::{IdleWatchdog, Liveness};

/// One guild's voice connection, plus everything needed to speak on it.
///
/// All speech and the close itself run under `lock`, so a guild speaks one
/// utterance at a time and is never torn down mid-utterance.
pub struct VoiceSession {
    guild_id: GuildId,
    connection: Arc<dyn VoiceConnection>,
    codec: Arc<dyn FrameCodec>,
    pipeline: Arc<AudioPipeline>,
    registry: Weak<SessionRegistry>,
    liveness: Liveness,
    cancel: CancellationToken,
    lock: Mutex<()>,
    closed: AtomicBool,
}

impl VoiceSession {
    /// Builds the session and arms its idle watchdog.
    pub(crate) fn start(
        connection: Arc<dyn VoiceConnection>,
        codec: Arc<dyn FrameCodec>,
        pipeline: Arc<AudioPipeline>,
        registry: Weak<SessionRegistry>,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        let (liveness, watchdog) = IdleWatchdog::new(idle_timeout);
        let cancel = CancellationToken::new();

        let session = Arc::new(Self {
            guild_id: connection.guild_id(),
            connection,
            codec,
            pipeline,
            registry,
            liveness,
            cancel: cancel.clone(),
            lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&session);
        watchdog.spawn(cancel, move || async move {
            if let Some(session) = weak.upgrade() {
                if session.close().await {
                    info!("Voice session for guild {} closed after {:?} idle", session.guild_id, idle_timeout);
                }
            }
        });

        session
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.connection.channel_id()
    }

    pub fn connection(&self) -> &Arc<dyn VoiceConnection> {
        &self.connection
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resets the idle timer.
    pub fn pulse(&self) {
        self.liveness.pulse();
    }

    /// Speaks `text` on this session's connection. Waits for any utterance
    /// already in progress. Returns the number of frames sent.
    pub async fn say_message(&self, text: &str, profile: &SpeakerProfile) -> Result<usize, VoiceError> {
        let _guard = self.lock.lock().await;
        if self.is_closed() {
            return Err(VoiceError::SessionClosed);
        }

        let mut sink = SessionSink {
            connection: self.connection.as_ref(),
            liveness: &self.liveness,
        };

        let spoken = self
            .pipeline
            .synthesize_and_stream(text, profile, self.codec.as_ref(), &mut sink)
            .await;

        // Whatever reached the transport still gets played out.
        if let Err(e) = self.connection.finish_stream().await {
            warn!("Ending utterance in guild {} failed: {e}", self.guild_id);
        }

        spoken.map_err(VoiceError::internal)
    }

    /// Deregisters and disconnects. Only the first call does anything; it
    /// returns `true`.
    pub async fn close(self: &Arc<Self>) -> bool {
        let _guard = self.lock.lock().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.cancel.cancel();

        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self).await;
        }

        if let Err(e) = self.connection.disconnect().await {
            warn!("Disconnecting voice in guild {} failed: {e}", self.guild_id);
        }

        debug!("Voice session for guild {} closed", self.guild_id);
        true
    }

    /// Returns once a close that is already underway has finished.
    pub(crate) async fn wait_closed(&self) {
        let _guard = self.lock.lock().await;
    }
}

/// Sends each frame, then counts it as a sign of life.
struct SessionSink<'a> {
    connection: &'a dyn VoiceConnection,
    liveness: &'a Liveness,
}

#[async_trait]
impl<'a> FrameSink for SessionSink<'a> {
    async fn deliver(&mut self, frame: Bytes) -> Result<(), VoiceError> {
        self.connection.send_frame(frame).await?;
        self.liveness.pulse();
        Ok(())
    }
}
