//! TTL cache over the trustomer API
//!
//! Configuration changes rarely; every consumer goes through this cache
//! rather than the client. Refresh is best-effort: when a fetch fails and a
//! stale value exists, the stale value is served.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::client::TrustomerClient;
use crate::config::TrustomerConfig;
use crate::TrustomerError;

struct CacheState {
    config: Arc<TrustomerConfig>,
    fetched_at: Instant,
}

/// Process-wide trustomer configuration cache
pub struct TrustomerCache {
    client: Option<TrustomerClient>,
    ttl: Duration,
    state: RwLock<Option<CacheState>>,
}

impl TrustomerCache {
    /// Cache backed by the trustomer API with the given TTL
    pub fn new(client: TrustomerClient, ttl: Duration) -> Self {
        Self {
            client: Some(client),
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Cache pinned to a fixed configuration, never refreshed
    ///
    /// Used by tests and local development.
    pub fn fixed(config: TrustomerConfig) -> Self {
        Self {
            client: None,
            ttl: Duration::MAX,
            state: RwLock::new(Some(CacheState {
                config: Arc::new(config),
                fetched_at: Instant::now(),
            })),
        }
    }

    /// Get the current configuration, refreshing if the TTL has lapsed
    pub async fn get(&self) -> Result<Arc<TrustomerConfig>, TrustomerError> {
        if let Some(state) = self.state.read().await.as_ref() {
            if self.client.is_none() || state.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&state.config));
            }
        }

        let Some(client) = &self.client else {
            return Err(TrustomerError::NotConfigured);
        };

        let mut guard = self.state.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(state) = guard.as_ref() {
            if state.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&state.config));
            }
        }

        match client.fetch().await {
            Ok(config) => {
                let config = Arc::new(config);
                *guard = Some(CacheState {
                    config: Arc::clone(&config),
                    fetched_at: Instant::now(),
                });
                Ok(config)
            }
            Err(error) => match guard.as_ref() {
                Some(state) => {
                    tracing::warn!(%error, "Trustomer refresh failed, serving stale configuration");
                    Ok(Arc::clone(&state.config))
                }
                None => Err(error),
            },
        }
    }
}
