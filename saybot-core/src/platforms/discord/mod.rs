// File: saybot-core/src/platforms/discord/mod.rs

pub mod dca;
pub mod runtime;
pub mod voice;
pub mod voice_state;

pub use runtime::DiscordRuntime;
pub use voice::{SongbirdVoiceConnection, SongbirdVoiceConnector};
pub use voice_state::CacheVoiceStates;
