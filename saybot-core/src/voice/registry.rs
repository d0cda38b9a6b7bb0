// File: saybot-core/src/voice/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard};

use saybot_common::models::GuildId;

use super::session::VoiceSession;

/// guild → live session. Lookups share the read lock; creating a session
/// holds the write lock from the re-check until the insert.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<GuildId, Arc<VoiceSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<VoiceSession>> {
        self.sessions.read().await.get(&guild_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Arc<VoiceSession>> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, HashMap<GuildId, Arc<VoiceSession>>> {
        self.sessions.write().await
    }

    /// Removes `session`, but only if the guild still maps to that very session.
    pub(crate) async fn deregister(&self, session: &Arc<VoiceSession>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&session.guild_id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(&session.guild_id());
                true
            }
            _ => false,
        }
    }
}
