// File: saybot-common/src/models/mod.rs
pub mod user;
pub mod voice;

pub use user::UserSettings;
pub use voice::{
    AudioContainer, SpeakerProfile, SynthesisRequest, TextMode, VoiceInfo, VoicePage,
};

use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

pub type GuildId = Id<GuildMarker>;
pub type ChannelId = Id<ChannelMarker>;
pub type UserId = Id<UserMarker>;
