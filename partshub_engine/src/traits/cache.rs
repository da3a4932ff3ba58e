//! The injected external cache capability.
//!
//! The payment workflow uses a short-lived cache entry per payment so that external gateway callbacks can resolve
//! already-applied transitions without a ledger round trip. The cache is strictly a latency optimisation: absence is
//! never authoritative, and every workflow must function correctly (just slower) with [`NoCache`].
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Cache error: {0}")]
pub struct CacheError(pub String);

#[allow(async_fn_in_trait)]
pub trait IdempotencyCache: Clone + Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

//--------------------------------------       NoCache       ---------------------------------------------------------
/// The absent cache. Every lookup misses and every write is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl IdempotencyCache for NoCache {
    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

//--------------------------------------     MemoryCache     ---------------------------------------------------------
/// An in-process TTL cache. Suitable for tests and single-node deployments; a hosted cache can be swapped in by
/// implementing [`IdempotencyCache`] against it.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
