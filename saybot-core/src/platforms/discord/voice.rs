// File: saybot-core/src/platforms/discord/voice.rs
//
// Voice connections through songbird. Each utterance is one live track: its
// frames are DCA-framed into a bounded in-memory pipe that the call's mixer
// drains at playback speed, so a full pipe holds the speaker back.

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use songbird::error::JoinError;
use songbird::events::{Event, EventContext, EventHandler, TrackEvent};
use songbird::input::{AsyncAdapterStream, AsyncMediaSource, AudioStream, Input, LiveInput};
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, trace, warn};
use twilight_model::id::Id;

use saybot_common::error::VoiceError;
use saybot_common::models::{ChannelId, GuildId};
use saybot_common::traits::voice_traits::{VoiceConnection, VoiceConnector};

use crate::audio::MAX_ENCODED_BYTES;
use super::dca;

/// Frames a speaker may run ahead of playback.
pub const FRAME_QUEUE_DEPTH: usize = 8;
const PIPE_CAPACITY: usize = FRAME_QUEUE_DEPTH * MAX_ENCODED_BYTES;
const ADAPTER_BUFFER: usize = 32 * 1024;
/// Upper bound on waiting for a finished track to play out its buffer.
const DRAIN_LIMIT: Duration = Duration::from_secs(30);

type ConnectionMap = Arc<DashMap<GuildId, Arc<SongbirdVoiceConnection>>>;

/// Read end of a track's pipe, as songbird wants it.
struct PipeSource {
    reader: DuplexStream,
}

impl AsyncRead for PipeSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

impl AsyncSeek for PipeSource {
    fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "live speech can't seek"))
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::Unsupported, "live speech can't seek")))
    }
}

#[async_trait]
impl AsyncMediaSource for PipeSource {
    fn is_seekable(&self) -> bool {
        false
    }

    async fn byte_len(&self) -> Option<u64> {
        None
    }
}

/// Signals once the track stops, however it stopped.
struct TrackStopped {
    done: Arc<Notify>,
}

#[async_trait]
impl EventHandler for TrackStopped {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        self.done.notify_one();
        Some(Event::Cancel)
    }
}

struct LiveTrack {
    writer: DuplexStream,
    handle: TrackHandle,
    stopped: Arc<Notify>,
}

pub struct SongbirdVoiceConnection {
    guild_id: GuildId,
    channel_id: ChannelId,
    call: Arc<Mutex<Call>>,
    manager: Arc<Songbird>,
    connections: ConnectionMap,
    track: Mutex<Option<LiveTrack>>,
    sent: AtomicU64,
}

impl SongbirdVoiceConnection {
    fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        call: Arc<Mutex<Call>>,
        manager: Arc<Songbird>,
        connections: ConnectionMap,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            channel_id,
            call,
            manager,
            connections,
            track: Mutex::new(None),
            sent: AtomicU64::new(0),
        })
    }

    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    async fn start_track(&self) -> Result<LiveTrack, VoiceError> {
        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        writer
            .write_all(&dca::header()?)
            .await
            .map_err(|e| VoiceError::Transport(format!("couldn't start track: {e}")))?;

        let source = AsyncAdapterStream::new(Box::new(PipeSource { reader }), ADAPTER_BUFFER);
        let input = Input::Live(
            LiveInput::Raw(AudioStream {
                input: Box::new(source),
                hint: None,
            }),
            None,
        );
        let handle = self.call.lock().await.play_input(input);

        let stopped = Arc::new(Notify::new());
        for event in [TrackEvent::End, TrackEvent::Error] {
            let handler = TrackStopped { done: stopped.clone() };
            if let Err(e) = handle.add_event(Event::Track(event), handler) {
                debug!("Couldn't watch track in guild {}: {e}", self.guild_id);
            }
        }

        trace!("Track {} started in guild {}", handle.uuid(), self.guild_id);
        Ok(LiveTrack {
            writer,
            handle,
            stopped,
        })
    }
}

#[async_trait]
impl VoiceConnection for SongbirdVoiceConnection {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn send_frame(&self, frame: Bytes) -> Result<(), VoiceError> {
        let framed = dca::frame(&frame)?;

        let mut track = self.track.lock().await;
        if track.is_none() {
            *track = Some(self.start_track().await?);
        }
        let Some(live) = track.as_mut() else {
            return Err(VoiceError::Transport("no track to play on".into()));
        };

        // Fails once the mixer has dropped the track's read end.
        if let Err(e) = live.writer.write_all(&framed).await {
            *track = None;
            return Err(VoiceError::Transport(format!("playback stopped taking audio: {e}")));
        }

        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn finish_stream(&self) -> Result<(), VoiceError> {
        let Some(mut live) = self.track.lock().await.take() else {
            return Ok(());
        };

        // EOF ends the track once the mixer has played everything before it.
        live.writer
            .shutdown()
            .await
            .map_err(|e| VoiceError::Transport(format!("couldn't end track: {e}")))?;

        if tokio::time::timeout(DRAIN_LIMIT, live.stopped.notified()).await.is_err() {
            warn!("Track in guild {} still playing after {DRAIN_LIMIT:?}, stopping it", self.guild_id);
            let _ = live.handle.stop();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        if let Some(live) = self.track.lock().await.take() {
            let _ = live.handle.stop();
        }
        self.connections
            .remove_if(&self.guild_id, |_, current| std::ptr::eq(Arc::as_ptr(current), self));

        remove_call(&self.manager, self.guild_id).await?;

        info!(
            "Left voice channel {} in guild {} after {} frame(s)",
            self.channel_id,
            self.guild_id,
            self.frames_sent()
        );
        Ok(())
    }
}

/// Leaves and forgets the guild's call. No call is not an error.
async fn remove_call(manager: &Songbird, guild_id: GuildId) -> Result<(), VoiceError> {
    match manager.remove(guild_id).await {
        Ok(()) | Err(JoinError::NoCall) => Ok(()),
        Err(e) => Err(VoiceError::Transport(format!("leaving voice failed: {e}"))),
    }
}

pub struct SongbirdVoiceConnector {
    manager: Arc<Songbird>,
    connections: ConnectionMap,
}

impl SongbirdVoiceConnector {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl VoiceConnector for SongbirdVoiceConnector {
    async fn existing(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceConnection>> {
        let known = self.connections.get(&guild_id).map(|entry| entry.value().clone());
        if let Some(connection) = known {
            return Some(connection);
        }

        // A call songbird holds that no session ever wrapped.
        let call = self.manager.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;
        debug!("Wrapping songbird's call in guild {guild_id}");

        let connection = SongbirdVoiceConnection::new(
            guild_id,
            Id::from(channel.0),
            call,
            self.manager.clone(),
            self.connections.clone(),
        );
        self.connections.insert(guild_id, connection.clone());
        Some(connection)
    }

    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Join(e.to_string()))?;

        // Listening is never needed.
        if let Err(e) = call.lock().await.deafen(true).await {
            debug!("Couldn't self-deafen in guild {guild_id}: {e}");
        }

        let connection = SongbirdVoiceConnection::new(
            guild_id,
            channel_id,
            call,
            self.manager.clone(),
            self.connections.clone(),
        );
        self.connections.insert(guild_id, connection.clone());

        info!("Joined voice channel {channel_id} in guild {guild_id}");
        Ok(connection)
    }

    async fn leave(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        let known = self.connections.get(&guild_id).map(|entry| entry.value().clone());
        match known {
            Some(connection) => connection.disconnect().await,
            None => remove_call(&self.manager, guild_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use songbird::shards::TwilightMap;
    use tokio::io::AsyncReadExt;
    use twilight_model::id::marker::UserMarker;

    fn manager() -> Arc<Songbird> {
        let bot: Id<UserMarker> = Id::new(999);
        Arc::new(Songbird::twilight(Arc::new(TwilightMap::new(HashMap::new())), bot))
    }

    #[tokio::test]
    async fn pipe_hands_over_the_stream_and_ends_on_shutdown() {
        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let mut source = PipeSource { reader };
        assert!(!source.is_seekable());
        assert_eq!(source.byte_len().await, None);

        let header = dca::header().unwrap();
        let frame = dca::frame(&[1, 2, 3]).unwrap();
        writer.write_all(&header).await.unwrap();
        writer.write_all(&frame).await.unwrap();
        writer.shutdown().await.unwrap();

        let mut read = Vec::new();
        source.read_to_end(&mut read).await.unwrap();
        assert_eq!(read.len(), header.len() + frame.len());
        assert_eq!(&read[..4], dca::MAGIC);
        assert_eq!(&read[header.len()..], &frame[..]);
    }

    #[tokio::test]
    async fn unknown_guilds_have_no_connection_and_leave_quietly() {
        let connector = SongbirdVoiceConnector::new(manager());
        assert!(connector.existing(Id::new(1)).await.is_none());
        assert!(connector.leave(Id::new(1)).await.is_ok());
        assert_eq!(connector.connection_count(), 0);
    }
}
