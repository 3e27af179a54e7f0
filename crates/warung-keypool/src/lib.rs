// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential rotator.
//!
//! Multiplexes a fleet of API keys: eligible keys are re-read from
//! storage on every invocation (so an external resync is visible without
//! restart), tried sequentially in priority order, and cooled down when
//! the provider signals quota exhaustion. At most one secret is in use
//! per invocation; there is no fan-out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use warung_core::WarungError;
use warung_storage::Store;

/// Default cooldown window after quota exhaustion.
pub const DEFAULT_COOLDOWN: chrono::Duration = chrono::Duration::hours(24);

/// How a single key attempt failed.
#[derive(Debug)]
pub enum KeyFailure {
    /// Provider signalled 429 or quota text. The key is cooled down and
    /// the next one is tried.
    Quota(String),
    /// Transient 5xx/network/deadline failure. The next key is tried
    /// without cooldown.
    Transient(String),
    /// Anything else aborts rotation immediately.
    Fatal(WarungError),
}

/// Priority-ordered key pool backed by the persistence facade.
pub struct KeyPool {
    store: Arc<Store>,
    provider: String,
    cooldown: chrono::Duration,
}

impl KeyPool {
    pub fn new(store: Arc<Store>, provider: impl Into<String>, cooldown: chrono::Duration) -> Self {
        Self {
            store,
            provider: provider.into(),
            cooldown,
        }
    }

    /// Run `call` with each eligible secret in priority order until one
    /// succeeds. Returns the first success, otherwise the last error.
    ///
    /// Returns [`WarungError::NoCredentialsAvailable`] without calling
    /// `call` when the pool is empty.
    pub async fn invoke<T, F, Fut>(&self, mut call: F) -> Result<T, WarungError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, KeyFailure>>,
    {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let keys = self.store.list_eligible_keys(&self.provider, &now).await?;
        if keys.is_empty() {
            warn!(provider = %self.provider, "no eligible credentials");
            return Err(WarungError::NoCredentialsAvailable);
        }

        let mut last_error: Option<WarungError> = None;
        for key in keys {
            match call(key.value.clone()).await {
                Ok(result) => return Ok(result),
                Err(KeyFailure::Quota(message)) => {
                    let until = (Utc::now() + self.cooldown)
                        .to_rfc3339_opts(SecondsFormat::Millis, true);
                    info!(
                        provider = %self.provider,
                        key_id = %key.id,
                        until = %until,
                        "quota exhausted, cooling key down"
                    );
                    if let Err(e) = self.store.set_cooldown(&key.id, &until).await {
                        warn!(error = %e, key_id = %key.id, "failed to persist cooldown");
                    }
                    last_error = Some(WarungError::QuotaExceeded(message));
                }
                Err(KeyFailure::Transient(message)) => {
                    debug!(
                        provider = %self.provider,
                        key_id = %key.id,
                        "transient failure, trying next key"
                    );
                    last_error = Some(WarungError::TransientUpstream(message));
                }
                Err(KeyFailure::Fatal(error)) => return Err(error),
            }
        }

        Err(last_error.unwrap_or(WarungError::NoCredentialsAvailable))
    }

    /// Spawn a background task that periodically clears elapsed cooldowns.
    ///
    /// Not required for correctness: eligibility is a time comparison on
    /// read. The sweeper keeps the table tidy and makes recovery visible
    /// in the logs.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                match pool
                    .store
                    .clear_expired_cooldowns(&pool.provider, &now)
                    .await
                {
                    Ok(0) => {}
                    Ok(cleared) => {
                        info!(provider = %pool.provider, cleared, "cooldowns expired");
                    }
                    Err(e) => warn!(error = %e, "cooldown sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    async fn pool_with_keys(keys: &[&str]) -> (Arc<KeyPool>, Arc<Store>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let store = Arc::new(Store::open(path.to_str().unwrap()).await.unwrap());
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        store.sync_keys("gemini", &keys).await.unwrap();
        let pool = Arc::new(KeyPool::new(Arc::clone(&store), "gemini", DEFAULT_COOLDOWN));
        (pool, store, dir)
    }

    #[tokio::test]
    async fn first_key_success_short_circuits() {
        let (pool, _store, _dir) = pool_with_keys(&["k1", "k2"]).await;
        let calls = AtomicUsize::new(0);
        let result = pool
            .invoke(|secret| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, KeyFailure>(secret) }
            })
            .await
            .unwrap();
        assert_eq!(result, "k1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quota_cools_key_and_fails_over() {
        let (pool, store, _dir) = pool_with_keys(&["k1", "k2"]).await;
        let calls = AtomicUsize::new(0);

        let result = pool
            .invoke(|secret| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if secret == "k1" {
                        Err(KeyFailure::Quota("quota exceeded".into()))
                    } else {
                        Ok(secret)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "k2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // k1 is now on cooldown for roughly 24 hours.
        let keys = store.list_keys("gemini").await.unwrap();
        let k1 = keys.iter().find(|k| k.value == "k1").unwrap();
        let until = chrono::DateTime::parse_from_rfc3339(k1.cooldown_until.as_deref().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        assert!(until >= Utc::now() + chrono::Duration::hours(23));

        // Subsequent invokes only see k2.
        let result = pool
            .invoke(|secret| async move { Ok::<_, KeyFailure>(secret) })
            .await
            .unwrap();
        assert_eq!(result, "k2");
    }

    #[tokio::test]
    async fn all_quota_returns_quota_exceeded_and_cools_both() {
        let (pool, store, _dir) = pool_with_keys(&["k1", "k2"]).await;
        let err = pool
            .invoke(|_secret| async move {
                Err::<(), _>(KeyFailure::Quota("quota exceeded".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::QuotaExceeded(_)), "got {err:?}");

        let keys = store.list_keys("gemini").await.unwrap();
        assert!(keys.iter().all(|k| k.cooldown_until.is_some()));

        let err = pool
            .invoke(|secret| async move { Ok::<_, KeyFailure>(secret) })
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::NoCredentialsAvailable));
    }

    #[tokio::test]
    async fn transient_failure_does_not_cool_down() {
        let (pool, store, _dir) = pool_with_keys(&["k1", "k2"]).await;
        let result = pool
            .invoke(|secret| async move {
                if secret == "k1" {
                    Err(KeyFailure::Transient("503".into()))
                } else {
                    Ok(secret)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "k2");

        let keys = store.list_keys("gemini").await.unwrap();
        assert!(keys.iter().all(|k| k.cooldown_until.is_none()));
    }

    #[tokio::test]
    async fn fatal_error_aborts_rotation() {
        let (pool, _store, _dir) = pool_with_keys(&["k1", "k2"]).await;
        let calls = AtomicUsize::new(0);
        let err = pool
            .invoke(|_secret| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<(), _>(KeyFailure::Fatal(WarungError::Validation("bad".into())))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_pool_is_distinguished() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        let store = Arc::new(Store::open(path.to_str().unwrap()).await.unwrap());
        let pool = KeyPool::new(store, "gemini", DEFAULT_COOLDOWN);
        let err = pool
            .invoke(|secret| async move { Ok::<_, KeyFailure>(secret) })
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::NoCredentialsAvailable));
    }
}
