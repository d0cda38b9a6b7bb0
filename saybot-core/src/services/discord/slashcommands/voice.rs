// File: saybot-core/src/services/discord/slashcommands/voice.rs

use tracing::warn;
use twilight_model::{
    application::command::{CommandOptionChoice, CommandOptionChoiceValue, CommandType},
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
};
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

use saybot_common::models::UserId;

use super::CommandReply;
use crate::services::SettingsService;
use crate::voice::{VoiceCatalog, AUTOCOMPLETE_LIMIT};

pub const VOICE_UPDATED: &str = "Your voice has been updated";
pub const VOICE_NOT_FOUND: &str = "I couldn't find that voice";

/// `/voice name:<autocomplete>`
pub fn create_voice_command() -> CommandBuilder {
    CommandBuilder::new("voice", "Sets the voice you talk with", CommandType::ChatInput)
        .option(
            StringBuilder::new("name", "The name of the voice")
                .required(true)
                .autocomplete(true),
        )
}

/// Autocomplete: the catalog's best matches for what's typed so far. Each
/// choice submits the catalog key, not the display text.
pub fn handle_voice_autocomplete(catalog: &VoiceCatalog, query: &str) -> InteractionResponse {
    let choices = catalog
        .search(query, AUTOCOMPLETE_LIMIT)
        .into_iter()
        .map(|choice| CommandOptionChoice {
            name: choice.display,
            name_localizations: None,
            value: CommandOptionChoiceValue::String(choice.key),
        })
        .collect();

    InteractionResponse {
        kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
        data: Some(InteractionResponseData {
            choices: Some(choices),
            ..Default::default()
        }),
    }
}

pub async fn handle_voice_command(
    catalog: &VoiceCatalog,
    settings: &SettingsService,
    user_id: UserId,
    key: &str,
) -> CommandReply {
    let Some(voice) = catalog.get(key) else {
        return CommandReply::ephemeral(VOICE_NOT_FOUND);
    };

    match settings.set_voice(user_id.get(), &voice.id, &voice.language_code).await {
        Ok(_) => CommandReply::ephemeral(VOICE_UPDATED),
        Err(e) => {
            warn!("Saving voice for user {user_id} failed: {e}");
            CommandReply::ephemeral(format!("I couldn't save your voice: {e}"))
        }
    }
}
