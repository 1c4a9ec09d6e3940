use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::domain::{SessionState, SessionStore};

/// Process-local session store with per-entry expiry.
///
/// Expired entries are dropped when read, and every write drops all expired
/// entries, so tokens that are never presented again do not accumulate.
#[derive(Default)]
pub struct MemorySessionStore {
    // ---
    entries: Mutex<HashMap<String, (SessionState, Instant)>>,
}

impl MemorySessionStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including any that expired since the last write.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    // ---
    async fn load(&self, token: &str) -> Result<Option<SessionState>> {
        // ---
        let mut entries = self.entries.lock();
        match entries.get(token) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(token);
                Ok(None)
            }
            Some((state, _)) => Ok(Some(state.clone())),
            None => Ok(None),
        }
    }

    async fn store(&self, token: &str, state: &SessionState, ttl: Duration) -> Result<()> {
        // ---
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(token.to_string(), (state.clone(), now + ttl));
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        self.entries.lock().remove(token);
        Ok(())
    }
}
