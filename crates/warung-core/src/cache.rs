// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value cache seam.
//!
//! The external cache binding (Redis in production deployments) lives
//! behind [`Cache`]. [`MemoryCache`] is the in-process implementation used
//! by default and in tests. Read failures are surfaced as errors so callers
//! can decide whether a miss is fatal; for the price-list cache they are
//! logged as warnings only.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::WarungError;

/// JSON-valued cache with per-entry TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss or an expired entry.
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, WarungError>;

    /// Store a value with a TTL.
    async fn set_json(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), WarungError>;
}

/// In-process TTL cache. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Instant, serde_json::Value)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, WarungError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((expires_at, value)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_json(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), WarungError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (Instant::now() + ttl, value));
        Ok(())
    }
}
