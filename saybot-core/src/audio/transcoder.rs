// File: saybot-core/src/audio/transcoder.rs
//
// Runs the container → PCM conversion as a child process. Synthesized audio is
// piped into stdin by a feeder task while the caller reads stdout, so neither
// side is ever fully buffered.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use saybot_common::error::VoiceError;
use saybot_common::traits::voice_traits::SpeechStream;

/// How long a transcoder gets to exit on its own after its output hit EOF.
const EXIT_GRACE: Duration = Duration::from_secs(5);
const FEED_CHUNK: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TranscoderConfig {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Ogg Vorbis on stdin, 48 kHz stereo s16le on stdout.
    pub fn ffmpeg(program: impl Into<PathBuf>) -> Self {
        let args = [
            "-hide_banner",
            "-loglevel", "warning",
            "-analyzeduration", "0",
            "-channel_layout", "mono",
            "-guess_layout_max", "0",
            "-c:a", "libvorbis",
            "-i", "pipe:0",
            "-f", "s16le",
            "-ar", "48000",
            "-ac", "2",
            "pipe:1",
        ];
        Self::new(program, args.iter().map(|s| s.to_string()).collect())
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self::ffmpeg("ffmpeg")
    }
}

/// A running transcoder. Dropping it kills the process and stops the feeder.
pub struct TranscodeProcess {
    child: Child,
    stdout: ChildStdout,
    feeder: JoinHandle<std::io::Result<u64>>,
    stderr_task: Option<JoinHandle<()>>,
    finished: bool,
}

impl TranscodeProcess {
    pub fn spawn(config: &TranscoderConfig, input: SpeechStream) -> Result<Self, VoiceError> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VoiceError::Transcode(format!("couldn't spawn {}: {e}", config.program.display()))
            })?;

        // On any early return below `child` is dropped, and kill_on_drop reaps it.
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Transcode("couldn't create pipe to transcoder".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::Transcode("couldn't create pipe from transcoder".into()))?;
        let stderr_task = child.stderr.take().map(|s| tokio::spawn(log_stderr(s)));

        trace!("Transcoder spawned: pid={:?}", child.id());

        Ok(Self {
            child,
            stdout,
            feeder: tokio::spawn(feed(input, stdin)),
            stderr_task,
            finished: false,
        })
    }

    pub fn stdout(&mut self) -> &mut ChildStdout {
        &mut self.stdout
    }

    /// Waits for the process after its output reached EOF. A bad exit status is
    /// only logged: every frame it produced has been delivered already. A fault
    /// reading the synthesized audio is an error, since the output it cut short
    /// looked like a clean end.
    pub async fn finish(mut self) -> Result<(), VoiceError> {
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                trace!("Transcoder exited cleanly");
            }
            Ok(Ok(status)) => {
                warn!("Transcoder exited with {status}");
            }
            Ok(Err(e)) => {
                warn!("Couldn't wait for transcoder: {e}");
            }
            Err(_) => {
                warn!("Transcoder still running {EXIT_GRACE:?} after EOF, killing it");
                let _ = self.child.kill().await;
            }
        }
        self.finished = true;

        match tokio::time::timeout(EXIT_GRACE, &mut self.feeder).await {
            Ok(Ok(Ok(fed))) => {
                trace!("Transcoder input done after {fed} bytes");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(VoiceError::Transcode(format!("synthesized audio broke off: {e}"))),
            Ok(Err(e)) => Err(VoiceError::Transcode(format!("transcoder feeder failed: {e}"))),
            Err(_) => {
                warn!("Synthesized audio still arriving {EXIT_GRACE:?} after the transcoder finished");
                Ok(())
            }
        }
    }
}

impl Drop for TranscodeProcess {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.child.start_kill() {
                debug!("Transcoder already gone: {e}");
            }
        }
        self.feeder.abort();
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

/// Copies synthesized audio into the transcoder. Only a fault on the input
/// side is an error; a transcoder that stops reading early shows up on its
/// output instead.
async fn feed(mut input: SpeechStream, mut stdin: ChildStdin) -> std::io::Result<u64> {
    let mut buf = vec![0u8; FEED_CHUNK];
    let mut fed = 0u64;

    loop {
        // Returning drops stdin, so the transcoder still sees EOF.
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if let Err(e) = stdin.write_all(&buf[..n]).await {
            debug!("Transcoder stopped taking input after {fed} bytes: {e}");
            return Ok(fed);
        }
        fed += n as u64;
    }

    let _ = stdin.shutdown().await;
    Ok(fed)
}

async fn log_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!("(transcoder) {line}");
    }
}
