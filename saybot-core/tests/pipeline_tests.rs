// tests/pipeline_tests.rs

mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use opus::{Channels, Decoder};

use saybot_common::error::VoiceError;
use saybot_common::models::SpeakerProfile;
use saybot_core::audio::{
    AudioPipeline, FrameSink, OpusFrameCodec, TranscoderConfig, FRAME_SIZE, MAX_ENCODED_BYTES, SAMPLE_RATE,
};

use test_utils::{passthrough_transcoder, FakeSynthesizer};

fn profile() -> SpeakerProfile {
    SpeakerProfile::new("Matthew", "en-US")
}

#[tokio::test]
async fn pcm_through_a_real_process_comes_out_as_opus_frames() {
    let synth = Arc::new(FakeSynthesizer::new(5, 1234));
    let pipeline = AudioPipeline::new(synth.clone(), passthrough_transcoder());
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut frames: Vec<Bytes> = Vec::new();

    let count = pipeline
        .synthesize_and_stream("five frames please", &profile(), &codec, &mut frames)
        .await
        .expect("pipeline");

    assert_eq!(count, 5);
    assert_eq!(frames.len(), 5);
    assert_eq!(synth.calls(), 1);

    let mut decoder = Decoder::new(SAMPLE_RATE, Channels::Stereo).expect("decoder");
    let mut pcm = vec![0i16; FRAME_SIZE * 2];
    for frame in &frames {
        assert!(!frame.is_empty());
        assert!(frame.len() <= MAX_ENCODED_BYTES);
        let decoded = decoder.decode(frame, &mut pcm, false).expect("decodes");
        assert_eq!(decoded, FRAME_SIZE);
    }
}

#[tokio::test]
async fn less_than_a_frame_yields_nothing() {
    let synth = Arc::new(FakeSynthesizer::new(0, 3000));
    let pipeline = AudioPipeline::new(synth, passthrough_transcoder());
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut frames: Vec<Bytes> = Vec::new();

    let count = pipeline
        .synthesize_and_stream("short", &profile(), &codec, &mut frames)
        .await
        .expect("clean end");

    assert_eq!(count, 0);
    assert!(frames.is_empty());
}

#[tokio::test]
async fn missing_transcoder_is_a_transcode_error() {
    let synth = Arc::new(FakeSynthesizer::new(2, 0));
    let pipeline = AudioPipeline::new(
        synth,
        TranscoderConfig::new("/nonexistent/saybot-transcoder", Vec::new()),
    );
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut frames: Vec<Bytes> = Vec::new();

    let err = pipeline
        .synthesize_and_stream("hello", &profile(), &codec, &mut frames)
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceError::Transcode(_)));
    assert!(frames.is_empty());
}

#[tokio::test]
async fn transcoder_that_exits_early_ends_the_utterance() {
    // `head -c` stops after two frames' worth and closes its end of the pipe.
    let synth = Arc::new(FakeSynthesizer::new(50, 0));
    let two_frames = (2 * FRAME_SIZE * 2 * 2).to_string();
    let pipeline = AudioPipeline::new(
        synth,
        TranscoderConfig::new("head", vec!["-c".to_string(), two_frames]),
    );
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut frames: Vec<Bytes> = Vec::new();

    let count = pipeline
        .synthesize_and_stream("truncated", &profile(), &codec, &mut frames)
        .await
        .expect("eof is not an error");

    assert_eq!(count, 2);
}

#[tokio::test]
async fn synthesized_stream_breaking_off_is_a_transcode_error() {
    let synth = Arc::new(FakeSynthesizer::breaking_off_after(3));
    let pipeline = AudioPipeline::new(synth, passthrough_transcoder());
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut frames: Vec<Bytes> = Vec::new();

    let err = pipeline
        .synthesize_and_stream("cut short", &profile(), &codec, &mut frames)
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceError::Transcode(_)), "got {err:?}");
    assert!(err.to_string().contains("connection reset"));
    // What arrived before the fault was still spoken.
    assert_eq!(frames.len(), 3);
}

/// Takes one frame, then refuses the rest.
#[derive(Default)]
struct RefusesSecondFrame {
    delivered: usize,
}

#[async_trait]
impl FrameSink for RefusesSecondFrame {
    async fn deliver(&mut self, _frame: Bytes) -> Result<(), VoiceError> {
        if self.delivered == 1 {
            return Err(VoiceError::Transport("connection went away".into()));
        }
        self.delivered += 1;
        Ok(())
    }
}

#[tokio::test]
async fn transcoder_is_killed_and_reaped_when_delivery_fails() {
    let pid_file = std::env::temp_dir().join(format!("saybot-transcoder-{}.pid", std::process::id()));
    let script = format!("echo $$ > '{}'; exec cat", pid_file.display());
    let pipeline = AudioPipeline::new(
        Arc::new(FakeSynthesizer::endless()),
        TranscoderConfig::new("sh", vec!["-c".to_string(), script]),
    );
    let codec = OpusFrameCodec::new().expect("encoder");
    let mut sink = RefusesSecondFrame::default();

    let err = pipeline
        .synthesize_and_stream("never ends", &profile(), &codec, &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::Transport(_)));
    assert_eq!(sink.delivered, 1);

    let pid = tokio::fs::read_to_string(&pid_file).await.expect("pid written");
    let _ = tokio::fs::remove_file(&pid_file).await;
    let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));

    let mut gone = false;
    for _ in 0..100 {
        if !proc_entry.exists() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(gone, "transcoder {} still exists", pid.trim());
}
