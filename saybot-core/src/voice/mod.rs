// File: saybot-core/src/voice/mod.rs

pub mod catalog;
pub mod module;
pub mod registry;
pub mod session;
pub mod watchdog;

use std::time::Duration;

use crate::audio::TranscoderConfig;

pub use catalog::{VoiceCatalog, VoiceChoice, AUTOCOMPLETE_LIMIT};
pub use module::{LeaveOutcome, VoiceModule, VoiceModuleBuilder};
pub use registry::SessionRegistry;
pub use session::VoiceSession;
pub use watchdog::{IdleWatchdog, Liveness};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// A session with no audio for this long disconnects.
    pub idle_timeout: Duration,
    pub transcoder: TranscoderConfig,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            transcoder: TranscoderConfig::default(),
        }
    }
}
