mod memory_repository;
mod postgres_repository;


pub use memory_repository::{create_memory_repository, MemoryRepository};
pub use postgres_repository::{create_postgres_repository, PostgresRepository};

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Delay between connection attempts.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connect to Postgres, retrying while the database comes up, then apply
/// pending migrations.
///
/// Gives up after `config.retry_count` failed attempts.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    // ---
    let mut attempt = 0;
    let pool = loop {
        attempt += 1;

        let result = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await;

        match result {
            Ok(pool) => break pool,
            Err(e) if attempt < config.retry_count => {
                tracing::warn!(
                    "Database connection attempt {}/{} failed: {}",
                    attempt,
                    config.retry_count,
                    e
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to connect to database after {attempt} attempts")
                })
            }
        }
    };
    tracing::info!("Connected to database after {} attempt(s)", attempt);

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
