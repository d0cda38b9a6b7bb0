use async_trait::async_trait;

use crate::error::Error;
use crate::models::UserSettings;

#[async_trait]
pub trait UserSettingsRepository: Send + Sync {
    async fn get(&self, user_id: u64) -> Result<Option<UserSettings>, Error>;
    /// Insert, or replace the row if the user already has one.
    async fn upsert(&self, settings: &UserSettings) -> Result<(), Error>;
}
