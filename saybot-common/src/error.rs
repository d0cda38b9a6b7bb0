// ================================================================
// File: saybot-common/src/error.rs
// ================================================================

use thiserror::Error;

/// Why a synthesis request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisFailure {
    InvalidVoice,
    Quota,
    Unavailable,
    Other,
}

impl std::fmt::Display for SynthesisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SynthesisFailure::InvalidVoice => "invalid voice",
            SynthesisFailure::Quota => "quota exceeded",
            SynthesisFailure::Unavailable => "service unavailable",
            SynthesisFailure::Other => "request failed",
        };
        f.write_str(s)
    }
}

/// Everything that can go wrong between a chat message and the voice transport.
///
/// The `Display` text is what ends up in the reply to the user.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("you aren't in a voice channel")]
    NotInVoiceChannel,

    #[error("already in another voice channel")]
    ChannelConflict,

    #[error("couldn't join voice channel: {0}")]
    Join(String),

    #[error("unable to synthesize speech ({kind}): {message}")]
    Synthesis {
        kind: SynthesisFailure,
        message: String,
    },

    #[error("transcoding failed: {0}")]
    Transcode(String),

    #[error("couldn't read raw audio: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("couldn't encode raw audio: {0}")]
    Encode(String),

    #[error("voice transport error: {0}")]
    Transport(String),

    #[error("voice session closed")]
    SessionClosed,

    #[error("internal error: {0}")]
    Internal(#[source] Box<VoiceError>),
}

impl VoiceError {
    pub fn synthesis(kind: SynthesisFailure, message: impl Into<String>) -> Self {
        VoiceError::Synthesis {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(inner: VoiceError) -> Self {
        match inner {
            // never double-wrap
            already @ VoiceError::Internal(_) => already,
            other => VoiceError::Internal(Box::new(other)),
        }
    }

    /// Peels off any `Internal` wrapper.
    pub fn root(&self) -> &VoiceError {
        match self {
            VoiceError::Internal(inner) => inner.root(),
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
