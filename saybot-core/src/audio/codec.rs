// File: saybot-core/src/audio/codec.rs

use std::sync::Arc;

use bytes::Bytes;
use opus::{Application, Channels, Encoder};
use parking_lot::Mutex;

use saybot_common::error::VoiceError;

use super::{MAX_ENCODED_BYTES, RAW_FRAME_SAMPLES, SAMPLE_RATE};

/// Turns one PCM frame into one compressed frame.
///
/// Implementations keep state between calls, so frames of one stream must go
/// through the same instance in order.
pub trait FrameCodec: Send + Sync {
    fn encode(&self, pcm: &[i16]) -> Result<Bytes, VoiceError>;
}

/// Builds a fresh codec for each new voice session.
pub type CodecFactory = Arc<dyn Fn() -> Result<Arc<dyn FrameCodec>, VoiceError> + Send + Sync>;

pub struct OpusFrameCodec {
    encoder: Mutex<Encoder>,
}

impl OpusFrameCodec {
    pub fn new() -> Result<Self, VoiceError> {
        let encoder = Encoder::new(SAMPLE_RATE, Channels::Stereo, Application::Voip)
            .map_err(|e| VoiceError::Encode(format!("couldn't create encoder: {e}")))?;
        Ok(Self {
            encoder: Mutex::new(encoder),
        })
    }

    pub fn factory() -> CodecFactory {
        Arc::new(|| Ok(Arc::new(OpusFrameCodec::new()?) as Arc<dyn FrameCodec>))
    }
}

impl FrameCodec for OpusFrameCodec {
    fn encode(&self, pcm: &[i16]) -> Result<Bytes, VoiceError> {
        if pcm.len() != RAW_FRAME_SAMPLES {
            return Err(VoiceError::Encode(format!(
                "expected {} samples per frame, got {}",
                RAW_FRAME_SAMPLES,
                pcm.len()
            )));
        }

        let packet = self
            .encoder
            .lock()
            .encode_vec(pcm, MAX_ENCODED_BYTES)
            .map_err(|e| VoiceError::Encode(e.to_string()))?;

        Ok(Bytes::from(packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FRAME_SIZE;
    use opus::Decoder;

    #[test]
    fn silent_frame_round_trip_stays_within_bound() {
        let codec = OpusFrameCodec::new().unwrap();
        let silence = vec![0i16; RAW_FRAME_SAMPLES];

        let packet = codec.encode(&silence).unwrap();
        assert!(!packet.is_empty());
        assert!(packet.len() <= MAX_ENCODED_BYTES);

        let mut decoder = Decoder::new(SAMPLE_RATE, Channels::Stereo).unwrap();
        let mut out = vec![1i16; RAW_FRAME_SAMPLES];
        let per_channel = decoder.decode(&packet, &mut out, false).unwrap();
        assert_eq!(per_channel, FRAME_SIZE);
    }

    #[test]
    fn rejects_short_frame() {
        let codec = OpusFrameCodec::new().unwrap();
        let short = vec![0i16; RAW_FRAME_SAMPLES - 2];
        let err = codec.encode(&short).unwrap_err();
        assert!(matches!(err, VoiceError::Encode(_)));
    }

    #[test]
    fn factory_hands_out_independent_encoders() {
        let factory = OpusFrameCodec::factory();
        let a = factory().unwrap();
        let b = factory().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        let tone: Vec<i16> = (0..RAW_FRAME_SAMPLES).map(|i| ((i % 64) as i16 - 32) * 200).collect();
        assert!(a.encode(&tone).unwrap().len() <= MAX_ENCODED_BYTES);
        assert!(b.encode(&tone).unwrap().len() <= MAX_ENCODED_BYTES);
    }
}
