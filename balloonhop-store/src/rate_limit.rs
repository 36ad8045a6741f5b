use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use balloonhop_core::StoreResult;

/// Fixed-window request counter keyed by client and scope.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one request against `key`; `Ok(false)` once the window's limit is exceeded.
    async fn hit(&self, key: &str, limit: u64, window_seconds: u64) -> StoreResult<bool>;

    /// Requests counted against `key` in the current window, without counting one.
    async fn current(&self, key: &str, window_seconds: u64) -> StoreResult<u64>;
}

/// Process-local counters, used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryRateLimiter {
    windows: Mutex<HashMap<String, (Instant, u64)>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn hit(&self, key: &str, limit: u64, window_seconds: u64) -> StoreResult<bool> {
        let now = Instant::now();
        let window = Duration::from_secs(window_seconds);
        let mut windows = self.windows.lock().await;

        windows.retain(|_, (started, _)| now.duration_since(*started) < window);
        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        entry.1 += 1;
        Ok(entry.1 <= limit)
    }

    async fn current(&self, key: &str, window_seconds: u64) -> StoreResult<u64> {
        let window = Duration::from_secs(window_seconds);
        let windows = self.windows.lock().await;
        Ok(windows
            .get(key)
            .filter(|(started, _)| started.elapsed() < window)
            .map_or(0, |(_, count)| *count))
    }
}
