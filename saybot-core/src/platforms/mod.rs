// File: saybot-core/src/platforms/mod.rs

pub mod discord;
pub mod polly;
