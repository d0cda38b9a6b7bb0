// File: saybot-core/src/services/discord/mod.rs

pub mod discord_event_service;
pub mod message_handler;
pub mod slashcommands;

pub use discord_event_service::DiscordEventService;
