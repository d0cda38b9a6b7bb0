// File: saybot-core/src/audio/mod.rs
//
// Fixed output format: 48 kHz interleaved stereo s16le, cut into 20 ms frames.

pub mod codec;
pub mod pipeline;
pub mod transcoder;

pub use codec::{CodecFactory, FrameCodec, OpusFrameCodec};
pub use pipeline::{AudioPipeline, FrameSink};
pub use transcoder::{TranscodeProcess, TranscoderConfig};

pub const SAMPLE_RATE: u32 = 48_000;
pub const CHANNELS: usize = 2;
/// Samples per channel in one frame.
pub const FRAME_SIZE: usize = 960;
/// Bytes per sample.
pub const SAMPLE_WIDTH: usize = 2;
/// Interleaved samples in one frame.
pub const RAW_FRAME_SAMPLES: usize = FRAME_SIZE * CHANNELS;
/// Bytes of PCM in one frame, as read off the transcoder.
pub const RAW_FRAME_BYTES: usize = RAW_FRAME_SAMPLES * SAMPLE_WIDTH;
/// Upper bound on a single encoded frame.
pub const MAX_ENCODED_BYTES: usize = RAW_FRAME_SAMPLES * SAMPLE_WIDTH;
