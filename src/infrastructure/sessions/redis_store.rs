use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

use crate::domain::{SessionState, SessionStore};

/// Session state as JSON under `session:{token}`, expired by Redis itself.
pub struct RedisSessionStore {
    // ---
    client: Client,
}

impl RedisSessionStore {
    // ---
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Open a client for `url`. Does not connect yet.
    pub fn open(url: &str) -> Result<Self> {
        // ---
        let client = Client::open(url).with_context(|| format!("Invalid Redis URL: {url}"))?;
        Ok(Self::new(client))
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        // ---
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }

    fn key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    // ---
    async fn load(&self, token: &str) -> Result<Option<SessionState>> {
        // ---
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(Self::key(token)).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!("Discarding undecodable session: {}", e);
                Ok(None)
            }
        }
    }

    async fn store(&self, token: &str, state: &SessionState, ttl: Duration) -> Result<()> {
        // ---
        let json = serde_json::to_string(state)?;
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(Self::key(token), json, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(Self::key(token)).await?;
        Ok(())
    }
}
