// File: saybot-core/tests/test_utils/mod.rs
//
// In-memory stand-ins for the synthesizer, the voice transport and the
// gateway's voice-state cache.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use twilight_model::id::Id;

use saybot_common::error::{SynthesisFailure, VoiceError};
use saybot_common::models::{ChannelId, GuildId, SynthesisRequest, UserId, VoiceInfo, VoicePage};
use saybot_common::traits::voice_traits::{
    SpeechStream, SpeechSynthesizer, VoiceConnection, VoiceConnector, VoiceStateLookup,
};
use saybot_core::audio::{TranscoderConfig, RAW_FRAME_BYTES};
use saybot_core::voice::{VoiceConfig, VoiceModule};

pub const GUILD: GuildId = Id::new(100);
pub const CHANNEL_A: ChannelId = Id::new(200);
pub const CHANNEL_B: ChannelId = Id::new(201);
pub const USER: UserId = Id::new(300);
pub const OTHER_USER: UserId = Id::new(301);
pub const BOT: UserId = Id::new(999);

/// `cat` passes the fake synthesizer's raw PCM straight through.
pub fn passthrough_transcoder() -> TranscoderConfig {
    TranscoderConfig::new("cat", Vec::new())
}

/// `frames` whole frames of a non-silent ramp, plus `tail` stray bytes.
pub fn pcm_bytes(frames: usize, tail: usize) -> Vec<u8> {
    let samples = frames * RAW_FRAME_BYTES / 2;
    let mut out = Vec::with_capacity(samples * 2 + tail);
    for i in 0..samples {
        let sample = ((i % 200) as i16 - 100) * 50;
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out.extend(std::iter::repeat(0u8).take(tail));
    out
}

pub fn voice(id: &str, lang: &str, name: &str, language_name: &str, gender: &str) -> VoiceInfo {
    VoiceInfo {
        id: id.to_string(),
        language_code: lang.to_string(),
        name: name.to_string(),
        language_name: language_name.to_string(),
        gender: gender.to_string(),
    }
}

/// A synthesized stream whose connection drops out.
pub struct BrokenOff;

impl AsyncRead for BrokenOff {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")))
    }
}

pub struct FakeSynthesizer {
    pub frames: usize,
    pub tail: usize,
    /// The stream fails after its frames instead of ending.
    pub breaks_off: bool,
    /// The stream never ends.
    pub endless: bool,
    pub calls: AtomicUsize,
    pub fail_next: AtomicBool,
    pub requests: Mutex<Vec<SynthesisRequest>>,
    pub pages: Vec<Vec<VoiceInfo>>,
    pub page_requests: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn new(frames: usize, tail: usize) -> Self {
        Self {
            frames,
            tail,
            breaks_off: false,
            endless: false,
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            pages: Vec::new(),
            page_requests: AtomicUsize::new(0),
        }
    }

    pub fn breaking_off_after(frames: usize) -> Self {
        Self {
            breaks_off: true,
            ..Self::new(frames, 0)
        }
    }

    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(0, 0)
        }
    }

    pub fn with_pages(pages: Vec<Vec<VoiceInfo>>) -> Self {
        Self {
            pages,
            ..Self::new(0, 0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SpeechStream, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::synthesis(
                SynthesisFailure::InvalidVoice,
                format!("no such voice: {}", request.voice_id),
            ));
        }
        if self.endless {
            return Ok(Box::pin(tokio::io::repeat(0)));
        }
        let pcm = Cursor::new(pcm_bytes(self.frames, self.tail));
        if self.breaks_off {
            return Ok(Box::pin(pcm.chain(BrokenOff)));
        }
        Ok(Box::pin(pcm))
    }

    async fn list_voices(&self, next_token: Option<String>) -> Result<VoicePage, VoiceError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let index = next_token.as_deref().map_or(Ok(0), |t| t.parse::<usize>()).map_err(|_| {
            VoiceError::synthesis(SynthesisFailure::Other, "bad page token")
        })?;
        let voices = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(VoicePage { voices, next_token })
    }
}

pub struct FakeConnection {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub frames: Mutex<Vec<Bytes>>,
    pub finished_streams: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeConnection {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            channel_id,
            frames: Mutex::new(Vec::new()),
            finished_streams: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn finished_streams(&self) -> usize {
        self.finished_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn send_frame(&self, frame: Bytes) -> Result<(), VoiceError> {
        self.frames.lock().push(frame);
        Ok(())
    }

    async fn finish_stream(&self) -> Result<(), VoiceError> {
        self.finished_streams.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub joins: AtomicUsize,
    pub leaves: AtomicUsize,
    pub fail_join: AtomicBool,
    pub join_delay: Duration,
    /// Returned by `existing`, as if joined outside the registry.
    pub preexisting: Mutex<Option<Arc<FakeConnection>>>,
    pub connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeConnector {
    pub fn with_join_delay(join_delay: Duration) -> Self {
        Self {
            join_delay,
            ..Self::default()
        }
    }

    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn leaves(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }

    pub fn last_connection(&self) -> Option<Arc<FakeConnection>> {
        self.connections.lock().last().cloned()
    }
}

#[async_trait]
impl VoiceConnector for FakeConnector {
    async fn existing(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceConnection>> {
        self.preexisting
            .lock()
            .as_ref()
            .filter(|c| c.guild_id == guild_id)
            .map(|c| c.clone() as Arc<dyn VoiceConnection>)
    }

    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        if !self.join_delay.is_zero() {
            tokio::time::sleep(self.join_delay).await;
        }
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(VoiceError::Join("voice server never answered".into()));
        }

        let connection = FakeConnection::new(guild_id, channel_id);
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }

    async fn leave(&self, _guild_id: GuildId) -> Result<(), VoiceError> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticVoiceStates {
    states: Mutex<HashMap<(GuildId, UserId), ChannelId>>,
}

impl StaticVoiceStates {
    pub fn set(&self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) {
        self.states.lock().insert((guild_id, user_id), channel_id);
    }

    pub fn remove(&self, guild_id: GuildId, user_id: UserId) {
        self.states.lock().remove(&(guild_id, user_id));
    }
}

impl VoiceStateLookup for StaticVoiceStates {
    fn voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.states.lock().get(&(guild_id, user_id)).copied()
    }
}

pub struct Harness {
    pub module: VoiceModule,
    pub connector: Arc<FakeConnector>,
    pub states: Arc<StaticVoiceStates>,
    pub synth: Arc<FakeSynthesizer>,
}

pub fn harness(connector: FakeConnector, synth: FakeSynthesizer, idle_timeout: Duration) -> Harness {
    let connector = Arc::new(connector);
    let states = Arc::new(StaticVoiceStates::default());
    let synth = Arc::new(synth);

    let module = VoiceModule::builder(connector.clone(), states.clone(), synth.clone())
        .config(VoiceConfig {
            idle_timeout,
            transcoder: passthrough_transcoder(),
        })
        .build();

    Harness {
        module,
        connector,
        states,
        synth,
    }
}
