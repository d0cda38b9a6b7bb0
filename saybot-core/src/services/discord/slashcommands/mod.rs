// File: saybot-core/src/services/discord/slashcommands/mod.rs

pub mod leave;
pub mod prefix;
pub mod voice;

use std::sync::Arc;

use tracing::{debug, info};
use twilight_http::Client as HttpClient;
use twilight_model::{
    application::{
        command::Command,
        interaction::{
            application_command::{CommandData, CommandOptionValue},
            InteractionData, InteractionType,
        },
    },
    channel::message::MessageFlags,
    gateway::payload::incoming::InteractionCreate,
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    id::marker::ApplicationMarker,
    id::Id,
};

use saybot_common::error::Error;
use crate::services::SettingsService;
use crate::voice::VoiceModule;
use self::leave::{create_leave_command, handle_leave_command};
use self::prefix::{create_prefix_command, handle_prefix_command};
use self::voice::{create_voice_command, handle_voice_autocomplete, handle_voice_command};

/// What a command answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// Only the invoking user sees it.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn into_response(self) -> InteractionResponse {
        InteractionResponse {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(InteractionResponseData {
                content: Some(self.content),
                flags: self.ephemeral.then_some(MessageFlags::EPHEMERAL),
                ..Default::default()
            }),
        }
    }
}

pub fn global_commands() -> Vec<Command> {
    vec![
        create_voice_command().build(),
        create_prefix_command().build(),
        create_leave_command().build(),
    ]
}

/// Overwrites the application's global commands with ours.
pub async fn register_global_slash_commands(
    http: &Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
) -> Result<(), Error> {
    let commands = global_commands();

    http.interaction(application_id)
        .set_global_commands(&commands)
        .await
        .map_err(|e| Error::Platform(format!("Failed to register global slash commands: {e}")))?;

    info!("Registered {} global slash command(s)", commands.len());
    Ok(())
}

/// The value of a string option, including one the user is still typing.
pub(crate) fn string_option<'a>(data: &'a CommandData, name: &str) -> Option<&'a str> {
    data.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            CommandOptionValue::String(value) => Some(value.as_str()),
            CommandOptionValue::Focused(value, _) => Some(value.as_str()),
            _ => None,
        })
}

/// Dispatch slash commands and autocomplete requests from an `InteractionCreate`.
pub async fn handle_interaction_create(
    http: Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
    voice: &VoiceModule,
    settings: &SettingsService,
    event: &InteractionCreate,
) -> Result<(), Error> {
    let interaction = &event.0;

    let Some(InteractionData::ApplicationCommand(cmd_data)) = &interaction.data else {
        return Ok(());
    };
    let Some(user_id) = interaction.author_id() else {
        return Ok(());
    };
    let name = cmd_data.name.as_str();

    let response = match interaction.kind {
        InteractionType::ApplicationCommandAutocomplete => match name {
            "voice" => {
                let query = string_option(cmd_data, "name").unwrap_or_default();
                handle_voice_autocomplete(voice.catalog(), query)
            }
            other => {
                debug!("No autocomplete for /{other}");
                return Ok(());
            }
        },
        InteractionType::ApplicationCommand => {
            debug!("/{name} from user {user_id}");
            let reply = match name {
                "voice" => {
                    let key = string_option(cmd_data, "name").unwrap_or_default();
                    handle_voice_command(voice.catalog(), settings, user_id, key).await
                }
                "prefix" => {
                    let value = string_option(cmd_data, "value").unwrap_or_default();
                    handle_prefix_command(settings, user_id, value).await
                }
                "leave" => handle_leave_command(voice, interaction.guild_id, user_id).await,
                other => CommandReply::ephemeral(format!("Unrecognized command: {other}")),
            };
            reply.into_response()
        }
        _ => return Ok(()),
    };

    http.interaction(application_id)
        .create_response(interaction.id, &interaction.token, &response)
        .await
        .map_err(|e| Error::Platform(format!("Error responding to `/{name}`: {e}")))?;

    Ok(())
}
