// File: saybot-core/src/audio/pipeline.rs

use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use saybot_common::error::VoiceError;
use saybot_common::models::{SpeakerProfile, SynthesisRequest};
use saybot_common::traits::voice_traits::SpeechSynthesizer;

use super::codec::FrameCodec;
use super::transcoder::{TranscodeProcess, TranscoderConfig};
use super::{RAW_FRAME_BYTES, RAW_FRAME_SAMPLES};

/// Receives encoded frames in order. The next frame is not read until
/// `deliver` returns, which is what throttles synthesis and transcoding.
#[async_trait]
pub trait FrameSink: Send {
    async fn deliver(&mut self, frame: Bytes) -> Result<(), VoiceError>;
}

#[async_trait]
impl FrameSink for Vec<Bytes> {
    async fn deliver(&mut self, frame: Bytes) -> Result<(), VoiceError> {
        self.push(frame);
        Ok(())
    }
}

/// text → synthesizer → transcoder → frame codec → sink
pub struct AudioPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcoder: TranscoderConfig,
}

impl AudioPipeline {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, transcoder: TranscoderConfig) -> Self {
        Self {
            synthesizer,
            transcoder,
        }
    }

    /// Speaks `text` into `sink`, returning the number of frames delivered.
    pub async fn synthesize_and_stream(
        &self,
        text: &str,
        profile: &SpeakerProfile,
        codec: &dyn FrameCodec,
        sink: &mut dyn FrameSink,
    ) -> Result<usize, VoiceError> {
        let request = SynthesisRequest::new(text, profile);
        debug!(
            "Synthesizing {} chars as {:?} with voice {} ({})",
            request.text.len(),
            request.mode,
            request.voice_id,
            request.language
        );

        let speech = self.synthesizer.synthesize(&request).await?;
        let mut process = TranscodeProcess::spawn(&self.transcoder, speech)?;

        // On error `process` is dropped here, which kills the transcoder.
        let frames = stream_frames(process.stdout(), codec, sink).await?;
        process.finish().await?;

        debug!("Utterance done: {frames} frames");
        Ok(frames)
    }
}

/// Reads whole PCM frames from `reader` until EOF, encoding and delivering each.
///
/// A trailing partial frame counts as a clean end of stream and is dropped.
pub async fn stream_frames<R>(
    reader: &mut R,
    codec: &dyn FrameCodec,
    sink: &mut dyn FrameSink,
) -> Result<usize, VoiceError>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut raw = vec![0u8; RAW_FRAME_BYTES];
    let mut pcm = vec![0i16; RAW_FRAME_SAMPLES];
    let mut delivered = 0usize;

    loop {
        match reader.read_exact(&mut raw).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(delivered),
            Err(e) => return Err(VoiceError::StreamRead(e)),
        }

        for (sample, le) in pcm.iter_mut().zip(raw.chunks_exact(2)) {
            *sample = i16::from_le_bytes([le[0], le[1]]);
        }

        let frame = codec.encode(&pcm)?;
        sink.deliver(frame).await?;
        delivered += 1;
    }
}
