// File: saybot-core/src/voice/catalog.rs
//
// Every voice the synthesizer offers, fetched once at startup.

use std::collections::HashMap;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::{debug, info};

use saybot_common::error::VoiceError;
use saybot_common::models::VoiceInfo;
use saybot_common::traits::voice_traits::SpeechSynthesizer;

/// Discord caps autocomplete responses at 25 choices.
pub const AUTOCOMPLETE_LIMIT: usize = 25;

/// A search hit: what the user sees, and the catalog key it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChoice {
    pub display: String,
    pub key: String,
}

/// Read-only once built.
#[derive(Debug, Default)]
pub struct VoiceCatalog {
    voices: HashMap<String, VoiceInfo>,
}

impl VoiceCatalog {
    pub fn from_voices(voices: impl IntoIterator<Item = VoiceInfo>) -> Self {
        let voices = voices.into_iter().map(|v| (v.key(), v)).collect();
        Self { voices }
    }

    /// Walks every page of the synthesizer's voice listing.
    pub async fn load(synthesizer: &dyn SpeechSynthesizer) -> Result<Self, VoiceError> {
        let mut voices = HashMap::new();
        let mut next_token = None;
        let mut pages = 0usize;

        loop {
            let page = synthesizer.list_voices(next_token.take()).await?;
            pages += 1;
            for voice in page.voices {
                voices.insert(voice.key(), voice);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        info!("Voice catalog loaded: {} voices over {} page(s)", voices.len(), pages);
        Ok(Self { voices })
    }

    pub fn get(&self, key: &str) -> Option<&VoiceInfo> {
        self.voices.get(key)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Fuzzy, case-insensitive match over `"Name (Language, Gender)"`, best
    /// first, at most `limit` hits. A blank query lists voices alphabetically.
    pub fn search(&self, query: &str, limit: usize) -> Vec<VoiceChoice> {
        let query = query.trim().to_lowercase();
        let matcher = SkimMatcherV2::default();

        let mut scored: Vec<(i64, VoiceChoice)> = self
            .voices
            .iter()
            .filter_map(|(key, voice)| {
                let display = voice.display_name();
                let score = if query.is_empty() {
                    0
                } else {
                    matcher.fuzzy_match(&display.to_lowercase(), &query)?
                };
                Some((score, VoiceChoice { display, key: key.clone() }))
            })
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.display.cmp(&b.display)));
        scored.truncate(limit);

        debug!("Voice search {:?}: {} hit(s)", query, scored.len());
        scored.into_iter().map(|(_, choice)| choice).collect()
    }
}
