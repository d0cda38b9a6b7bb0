// File: saybot-core/src/services/mod.rs

pub mod discord;
pub mod settings_service;

pub use settings_service::SettingsService;
