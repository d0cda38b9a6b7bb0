pub mod user_settings;

pub use user_settings::PostgresUserSettingsRepository;
