use serde::{Deserialize, Serialize};

use crate::models::voice::SpeakerProfile;

pub const DEFAULT_VOICE: &str = "Joanna";
pub const DEFAULT_VOICE_LANG: &str = "en-US";
pub const DEFAULT_PREFIX: &str = "say";

/// Per-user preferences. Users that never touched a command get the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub user_id: u64,
    pub voice: String,
    pub voice_lang: String,
    pub prefix: String,
}

impl UserSettings {
    pub fn with_defaults(user_id: u64) -> Self {
        Self {
            user_id,
            voice: DEFAULT_VOICE.to_string(),
            voice_lang: DEFAULT_VOICE_LANG.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn speaker_profile(&self) -> SpeakerProfile {
        SpeakerProfile::new(&self.voice, &self.voice_lang)
    }
}
