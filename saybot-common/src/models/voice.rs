use serde::{Deserialize, Serialize};

/// Which voice speaks an utterance, and in what language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    pub voice_id: String,
    pub language: String,
}

impl SpeakerProfile {
    pub fn new(voice_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Plain,
    Ssml,
}

impl TextMode {
    /// Any text carrying a `<speak>` root is sent as SSML, untouched.
    pub fn detect(text: &str) -> Self {
        if text.contains("<speak>") {
            TextMode::Ssml
        } else {
            TextMode::Plain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioContainer {
    OggVorbis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub mode: TextMode,
    pub voice_id: String,
    pub language: String,
    pub container: AudioContainer,
}

impl SynthesisRequest {
    pub fn new(text: &str, profile: &SpeakerProfile) -> Self {
        Self {
            text: text.to_string(),
            mode: TextMode::detect(text),
            voice_id: profile.voice_id.clone(),
            language: profile.language.clone(),
            container: AudioContainer::OggVorbis,
        }
    }
}

/// Catalog metadata for one synthesizer voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub language_code: String,
    pub name: String,
    pub language_name: String,
    pub gender: String,
}

impl VoiceInfo {
    /// Catalog key, e.g. `Joanna#en-US`. A voice id alone is not unique across languages.
    pub fn key(&self) -> String {
        format!("{}#{}", self.id, self.language_code)
    }

    pub fn display_name(&self) -> String {
        format!("{} ({}, {})", self.name, self.language_name, self.gender)
    }
}

/// One page of a paginated voice listing.
#[derive(Debug, Clone, Default)]
pub struct VoicePage {
    pub voices: Vec<VoiceInfo>,
    pub next_token: Option<String>,
}
