// src/repositories/postgres/user_settings.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use saybot_common::models::UserSettings;
use saybot_common::traits::repository_traits::UserSettingsRepository;

use crate::Error;

pub struct PostgresUserSettingsRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUserSettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// Discord snowflakes fit in 63 bits, so BIGINT holds them as-is.
fn to_db_id(user_id: u64) -> Result<i64, Error> {
    i64::try_from(user_id).map_err(|_| Error::Parse(format!("user id out of range: {user_id}")))
}

#[async_trait]
impl UserSettingsRepository for PostgresUserSettingsRepository {
    async fn get(&self, user_id: u64) -> Result<Option<UserSettings>, Error> {
        let row = sqlx::query(
            r#"
            SELECT id, voice, voice_lang, prefix
            FROM user_settings
            WHERE id = $1
            "#,
        )
            .bind(to_db_id(user_id)?)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row {
            let id: i64 = r.try_get("id")?;
            Ok(Some(UserSettings {
                user_id: id as u64,
                voice: r.try_get("voice")?,
                voice_lang: r.try_get("voice_lang")?,
                prefix: r.try_get("prefix")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn upsert(&self, settings: &UserSettings) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (id, voice, voice_lang, prefix)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET voice = EXCLUDED.voice,
                voice_lang = EXCLUDED.voice_lang,
                prefix = EXCLUDED.prefix
            "#,
        )
            .bind(to_db_id(settings.user_id)?)
            .bind(&settings.voice)
            .bind(&settings.voice_lang)
            .bind(&settings.prefix)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
