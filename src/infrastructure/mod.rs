mod database;
pub mod metrics;
mod sessions;
mod webauthn;

// Re-export the factory functions for easy access
pub use database::{
    connect_with_retry, create_memory_repository, create_postgres_repository, MemoryRepository,
    PostgresRepository,
};
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use sessions::{
    create_memory_session_store, create_session_store, MemorySessionStore, RedisSessionStore,
};
pub use webauthn::{create_webauthn, create_webauthn_verifier, WebauthnVerifier};
