use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::info;

use balloonhop_core::{StoreError, StoreResult};

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis client configured for rate limiting");
        Ok(Self { client })
    }

    pub async fn check_rate_limit(&self, key: &str, limit: u64, window_seconds: u64) -> redis::RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // INCR then EXPIRE NX so the window starts with the first hit.
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }

    pub async fn current_count(&self, key: &str) -> redis::RedisResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: Option<u64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn hit(&self, key: &str, limit: u64, window_seconds: u64) -> StoreResult<bool> {
        self.check_rate_limit(key, limit, window_seconds)
            .await
            .map_err(StoreError::backend)
    }

    async fn current(&self, key: &str, _window_seconds: u64) -> StoreResult<u64> {
        self.current_count(key).await.map_err(StoreError::backend)
    }
}
