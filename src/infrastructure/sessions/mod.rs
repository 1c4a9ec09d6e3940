mod memory_store;
mod redis_store;

pub use memory_store::MemorySessionStore;
pub use redis_store::RedisSessionStore;

use anyhow::Result;
use std::sync::Arc;

use crate::config::SessionBackend;
use crate::domain::SessionStorePtr;

/// Creates a process-local session store.
pub fn create_memory_session_store() -> SessionStorePtr {
    Arc::new(MemorySessionStore::new())
}

/// Creates the session store selected by configuration.
pub fn create_session_store(backend: &SessionBackend) -> Result<SessionStorePtr> {
    // ---
    match backend {
        SessionBackend::Memory => {
            tracing::info!("Using in-memory session store");
            Ok(create_memory_session_store())
        }
        SessionBackend::Redis(url) => {
            tracing::info!("Using Redis session store");
            Ok(Arc::new(RedisSessionStore::open(url)?))
        }
    }
}
