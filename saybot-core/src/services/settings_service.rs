// File: saybot-core/src/services/settings_service.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use saybot_common::models::UserSettings;
use saybot_common::traits::repository_traits::UserSettingsRepository;

use crate::cache::TtlCache;
use crate::Error;

pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// User preferences, read through a TTL cache.
pub struct SettingsService {
    repo: Arc<dyn UserSettingsRepository>,
    cache: TtlCache<u64, UserSettings>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn UserSettingsRepository>) -> Self {
        Self::with_ttl(repo, SETTINGS_CACHE_TTL)
    }

    pub fn with_ttl(repo: Arc<dyn UserSettingsRepository>, ttl: Duration) -> Self {
        Self {
            repo,
            cache: TtlCache::new(ttl),
        }
    }

    /// Stored settings, or the defaults for users who never changed anything.
    pub async fn get(&self, user_id: u64) -> Result<UserSettings, Error> {
        if let Some(settings) = self.cache.get(&user_id) {
            return Ok(settings);
        }

        let settings = match self.repo.get(user_id).await? {
            Some(s) => s,
            None => {
                debug!("No settings stored for user {user_id}, using defaults");
                UserSettings::with_defaults(user_id)
            }
        };

        self.cache.set(user_id, settings.clone());
        Ok(settings)
    }

    pub async fn set_voice(&self, user_id: u64, voice: &str, voice_lang: &str) -> Result<UserSettings, Error> {
        let mut settings = self.get(user_id).await?;
        settings.voice = voice.to_string();
        settings.voice_lang = voice_lang.to_string();
        self.save(settings).await
    }

    pub async fn set_prefix(&self, user_id: u64, prefix: &str) -> Result<UserSettings, Error> {
        let mut settings = self.get(user_id).await?;
        settings.prefix = prefix.to_string();
        self.save(settings).await
    }

    /// Caches before writing: a failed write still leaves the new value cached
    /// until it expires.
    async fn save(&self, settings: UserSettings) -> Result<UserSettings, Error> {
        self.cache.set(settings.user_id, settings.clone());
        if let Err(e) = self.repo.upsert(&settings).await {
            warn!("Persisting settings for user {} failed: {e}", settings.user_id);
            return Err(e);
        }
        Ok(settings)
    }

    pub fn purge_expired(&self) {
        self.cache.purge_expired();
    }
}
