// File: saybot-core/src/platforms/polly/mod.rs
//
// Amazon Polly as the speech synthesizer. Credentials and region come from the
// usual AWS environment / profile chain.

use async_trait::async_trait;
use aws_sdk_polly::Client;
use aws_sdk_polly::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_polly::types::{Engine, LanguageCode, OutputFormat, TextType, Voice, VoiceId};
use tracing::{debug, trace};

use saybot_common::error::{SynthesisFailure, VoiceError};
use saybot_common::models::{AudioContainer, SynthesisRequest, TextMode, VoiceInfo, VoicePage};
use saybot_common::traits::voice_traits::{SpeechStream, SpeechSynthesizer};

pub struct PollySynthesizer {
    client: Client,
    engine: Engine,
}

impl PollySynthesizer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            engine: Engine::Standard,
        }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        debug!("Polly client region: {:?}", config.region());
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SpeechStream, VoiceError> {
        let text_type = match request.mode {
            TextMode::Plain => TextType::Text,
            TextMode::Ssml => TextType::Ssml,
        };
        let output_format = match request.container {
            AudioContainer::OggVorbis => OutputFormat::OggVorbis,
        };

        let output = self
            .client
            .synthesize_speech()
            .engine(self.engine.clone())
            .output_format(output_format)
            .text(&request.text)
            .text_type(text_type)
            .voice_id(VoiceId::from(request.voice_id.as_str()))
            .language_code(LanguageCode::from(request.language.as_str()))
            .send()
            .await
            .map_err(|e| {
                VoiceError::synthesis(classify_error_code(e.code()), DisplayErrorContext(&e).to_string())
            })?;

        trace!("Polly stream open: {:?}", output.content_type());
        Ok(Box::pin(output.audio_stream.into_async_read()))
    }

    async fn list_voices(&self, next_token: Option<String>) -> Result<VoicePage, VoiceError> {
        let output = self
            .client
            .describe_voices()
            .engine(self.engine.clone())
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                VoiceError::synthesis(classify_error_code(e.code()), DisplayErrorContext(&e).to_string())
            })?;

        Ok(VoicePage {
            voices: output.voices().iter().filter_map(voice_info).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }
}

fn voice_info(voice: &Voice) -> Option<VoiceInfo> {
    let id = voice.id()?.as_str().to_string();
    let language_code = voice.language_code()?.as_str().to_string();
    Some(VoiceInfo {
        name: voice.name().unwrap_or(&id).to_string(),
        language_name: voice.language_name().unwrap_or_default().to_string(),
        gender: voice.gender().map(|g| g.as_str()).unwrap_or("Unknown").to_string(),
        id,
        language_code,
    })
}

/// Maps Polly's error codes onto the failure kinds users are told about.
/// No code at all means the request never got an answer.
pub fn classify_error_code(code: Option<&str>) -> SynthesisFailure {
    match code {
        Some(
            "ValidationException"
            | "LanguageNotSupportedException"
            | "EngineNotSupportedException"
            | "LexiconNotFoundException",
        ) => SynthesisFailure::InvalidVoice,
        Some("ThrottlingException" | "ServiceQuotaExceededException" | "TextLengthExceededException") => {
            SynthesisFailure::Quota
        }
        Some("ServiceFailureException" | "ServiceUnavailableException") | None => SynthesisFailure::Unavailable,
        Some(_) => SynthesisFailure::Other,
    }
}
