// File: saybot-core/src/cache/mod.rs

pub mod ttl_cache;

pub use ttl_cache::TtlCache;
