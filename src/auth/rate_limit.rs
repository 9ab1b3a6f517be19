//! Failed-attempt counters keyed by principal and action.
//!
//! A counter's window starts at its first hit and is not extended by later
//! hits. Expiry is evaluated lazily when the counter is read or hit; nothing
//! sweeps in the background.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    pub user_id: Uuid,
    pub action: String,
}

impl AttemptKey {
    pub fn new(user_id: Uuid, action: impl Into<String>) -> Self {
        Self { user_id, action: action.into() }
    }
}

/// Shared counter storage. `hit` must be an atomic increment-with-expiry so
/// that concurrent failures for the same key are never under-counted.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Hits recorded inside the live window, 0 if none or expired.
    async fn attempts(&self, key: &AttemptKey) -> Result<u32, DatabaseError>;

    /// Records one hit and returns the new count. Opens a fresh window of
    /// `decay` if none is live.
    async fn hit(&self, key: &AttemptKey, decay: Duration) -> Result<u32, DatabaseError>;

    /// Records one hit only while fewer than `max_attempts` are live, in the
    /// same atomic step as the read. `None` means the key is blocked and
    /// nothing was recorded.
    async fn reserve(
        &self,
        key: &AttemptKey,
        max_attempts: u32,
        decay: Duration,
    ) -> Result<Option<u32>, DatabaseError>;

    async fn clear(&self, key: &AttemptKey) -> Result<(), DatabaseError>;
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn AttemptStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    pub async fn too_many_attempts(&self, key: &AttemptKey, max_attempts: u32) -> Result<bool, DatabaseError> {
        Ok(self.store.attempts(key).await? >= max_attempts)
    }

    pub async fn attempts(&self, key: &AttemptKey) -> Result<u32, DatabaseError> {
        self.store.attempts(key).await
    }

    pub async fn hit(&self, key: &AttemptKey, decay: Duration) -> Result<u32, DatabaseError> {
        self.store.hit(key, decay).await
    }

    /// Claims an attempt slot before the guarded comparison runs, so
    /// concurrent callers can never exceed `max_attempts` comparisons.
    pub async fn reserve(
        &self,
        key: &AttemptKey,
        max_attempts: u32,
        decay: Duration,
    ) -> Result<Option<u32>, DatabaseError> {
        self.store.reserve(key, max_attempts, decay).await
    }

    pub async fn clear(&self, key: &AttemptKey) -> Result<(), DatabaseError> {
        self.store.clear(key).await
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    hits: u32,
    expires_at: Instant,
}

/// Process-local counters for single-instance deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryAttemptStore {
    counters: Mutex<HashMap<AttemptKey, Counter>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, live or not yet evicted.
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn attempts(&self, key: &AttemptKey) -> Result<u32, DatabaseError> {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let live = counters.get(key).map(|counter| (counter.hits, counter.expires_at > now));
        match live {
            Some((hits, true)) => Ok(hits),
            Some((_, false)) => {
                counters.remove(key);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn hit(&self, key: &AttemptKey, decay: Duration) -> Result<u32, DatabaseError> {
        // Read and increment happen under one lock acquisition
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let counter = counters.entry(key.clone()).or_insert(Counter { hits: 0, expires_at: now + decay });
        if counter.expires_at <= now {
            *counter = Counter { hits: 0, expires_at: now + decay };
        }
        counter.hits += 1;

        Ok(counter.hits)
    }

    async fn reserve(
        &self,
        key: &AttemptKey,
        max_attempts: u32,
        decay: Duration,
    ) -> Result<Option<u32>, DatabaseError> {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let counter = counters.entry(key.clone()).or_insert(Counter { hits: 0, expires_at: now + decay });
        if counter.expires_at <= now {
            *counter = Counter { hits: 0, expires_at: now + decay };
        }
        if counter.hits >= max_attempts {
            return Ok(None);
        }
        counter.hits += 1;

        Ok(Some(counter.hits))
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), DatabaseError> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn key(action: &str) -> AttemptKey {
        AttemptKey::new(Uuid::from_u128(7), action)
    }

    #[tokio::test(start_paused = true)]
    async fn counts_hits_within_window() {
        let store = MemoryAttemptStore::new();
        let key = key("pin");

        assert_eq!(store.attempts(&key).await.unwrap(), 0);
        assert_eq!(store.hit(&key, WINDOW).await.unwrap(), 1);
        assert_eq!(store.hit(&key, WINDOW).await.unwrap(), 2);
        assert_eq!(store.attempts(&key).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expires_lazily() {
        let store = MemoryAttemptStore::new();
        let key = key("pin");

        store.hit(&key, WINDOW).await.unwrap();
        store.hit(&key, WINDOW).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.attempts(&key).await.unwrap(), 0);
        assert_eq!(store.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn later_hits_do_not_extend_window() {
        let store = MemoryAttemptStore::new();
        let key = key("pin");

        store.hit(&key, WINDOW).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        store.hit(&key, WINDOW).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.attempts(&key).await.unwrap(), 0);
        // A hit after expiry opens a fresh window
        assert_eq!(store.hit(&key, WINDOW).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn keys_are_isolated_by_action_and_user() {
        let store = MemoryAttemptStore::new();

        store.hit(&key("pin"), WINDOW).await.unwrap();
        assert_eq!(store.attempts(&key("login")).await.unwrap(), 0);
        assert_eq!(store.attempts(&AttemptKey::new(Uuid::from_u128(8), "pin")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_resets_counter() {
        let limiter = RateLimiter::new(Arc::new(MemoryAttemptStore::new()));
        let key = key("pin");

        for _ in 0..3 {
            limiter.hit(&key, WINDOW).await.unwrap();
        }
        assert!(limiter.too_many_attempts(&key, 3).await.unwrap());

        limiter.clear(&key).await.unwrap();
        assert!(!limiter.too_many_attempts(&key, 3).await.unwrap());
        assert_eq!(limiter.hit(&key, WINDOW).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reserve_stops_at_limit() {
        let store = MemoryAttemptStore::new();
        let key = key("pin");

        for expected in 1..=3 {
            assert_eq!(store.reserve(&key, 3, WINDOW).await.unwrap(), Some(expected));
        }
        assert_eq!(store.reserve(&key, 3, WINDOW).await.unwrap(), None);
        assert_eq!(store.attempts(&key).await.unwrap(), 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.reserve(&key, 3, WINDOW).await.unwrap(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_exceed_limit() {
        let store = Arc::new(MemoryAttemptStore::new());
        let key = key("pin");

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move { store.reserve(&key, 5, WINDOW).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(store.attempts(&key).await.unwrap(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_hits_are_not_lost() {
        let store = Arc::new(MemoryAttemptStore::new());
        let key = key("pin");

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move { store.hit(&key, WINDOW).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.attempts(&key).await.unwrap(), 50);
    }
}
