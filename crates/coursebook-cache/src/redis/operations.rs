//! Redis cache provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use coursebook_core::error::{AppError, ErrorKind};
use coursebook_core::result::AppResult;
use coursebook_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// Keys deleted per `DEL` round-trip while clearing a pattern.
const DELETE_BATCH: usize = 500;

/// Redis-backed cache provider.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
    default_ttl: Duration,
}

impl RedisCacheProvider {
    /// Create a new Redis cache provider.
    pub fn new(client: RedisClient, default_ttl_seconds: u64) -> Self {
        Self {
            client,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        let kind = if e.is_io_error() || e.is_connection_dropped() {
            ErrorKind::ServiceUnavailable
        } else {
            ErrorKind::Cache
        };
        AppError::with_source(kind, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn();
        conn.get(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.client.conn();
        let _: () = conn
            .set_ex(self.client.prefixed_key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.client.conn();
        let _: () = conn
            .del(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut scan_conn = self.client.conn();

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> = scan_conn
                .scan_match(&full_pattern)
                .await
                .map_err(Self::map_err)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        let mut conn = self.client.conn();
        let mut count = 0u64;
        for batch in keys.chunks(DELETE_BATCH) {
            let removed: u64 = conn.del(batch).await.map_err(Self::map_err)?;
            count += removed;
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }

    async fn flush_all(&self) -> AppResult<()> {
        // Only our prefix, never the whole Redis database.
        self.delete_pattern("*").await?;
        Ok(())
    }
}
