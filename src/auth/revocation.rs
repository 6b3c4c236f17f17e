/// Token Revocation
///
/// Keeps the `jti` of tokens that were explicitly revoked before their
/// natural expiry. Each entry remembers when its token would have expired so
/// that stale entries can be pruned.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `jti` as revoked for `remaining_ttl`.
    ///
    /// Returns `true` only for the call that actually recorded it, so it can
    /// double as an atomic claim on a single-use token. A non-positive
    /// `remaining_ttl` records nothing and returns `false`.
    async fn revoke(&self, jti: &str, remaining_ttl: Duration) -> Result<bool, AppError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError>;

    /// Drop entries whose token has expired anyway; returns how many were removed
    async fn prune_expired(&self) -> Result<u64, AppError>;
}

/// Process-local revocation set
#[derive(Clone, Default)]
pub struct InMemoryRevocationStore {
    revoked: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.revoked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: &str, remaining_ttl: Duration) -> Result<bool, AppError> {
        if remaining_ttl <= Duration::zero() {
            return Ok(false);
        }
        let expires_at = Utc::now() + remaining_ttl;
        match self.entries().entry(jti.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        Ok(self.entries().contains_key(jti))
    }

    async fn prune_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

/// Periodically prune a revocation store until the runtime shuts down
pub fn spawn_pruning(
    store: Arc<dyn RevocationStore>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.prune_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Pruned expired revocation entries"),
                Err(e) => tracing::error!(error = %e, "Failed to prune revocation entries"),
            }
        }
    })
}
