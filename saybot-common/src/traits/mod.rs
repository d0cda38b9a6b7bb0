// File: saybot-common/src/traits/mod.rs
pub mod repository_traits;
pub mod voice_traits;
