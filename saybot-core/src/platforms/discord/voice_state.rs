// File: saybot-core/src/platforms/discord/voice_state.rs

use std::sync::Arc;

use twilight_cache_inmemory::InMemoryCache;

use saybot_common::models::{ChannelId, GuildId, UserId};
use saybot_common::traits::voice_traits::VoiceStateLookup;

/// Voice states as seen by the gateway cache. Only as fresh as the last
/// `VOICE_STATE_UPDATE` the shard received.
pub struct CacheVoiceStates {
    cache: Arc<InMemoryCache>,
}

impl CacheVoiceStates {
    pub fn new(cache: Arc<InMemoryCache>) -> Self {
        Self { cache }
    }
}

impl VoiceStateLookup for CacheVoiceStates {
    fn voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.cache
            .voice_state(user_id, guild_id)
            .map(|state| state.channel_id())
    }
}
