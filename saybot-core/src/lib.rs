// src/lib.rs

pub mod audio;
pub mod cache;
pub mod db;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod voice;

pub use db::Database;
pub use saybot_common::error::{Error, VoiceError};
pub use voice::{VoiceConfig, VoiceModule};
