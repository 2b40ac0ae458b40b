//! Verification key discovery and caching.
//!
//! Key sets are fetched from a metadata endpoint (either an OpenID
//! configuration document whose `jwks_uri` is followed, or a JWKS document
//! directly), cached per endpoint with a TTL, and shared across
//! authentication calls. Concurrent refreshes for the same endpoint collapse
//! to a single in-flight fetch.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::error::{KeyDiscoveryError, TokenError};

/// How long a fetched key set is served before it is re-fetched.
const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(3600);

/// Timeout for each discovery HTTP request.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum interval between fetches of the same endpoint.
///
/// An unknown `kid` forces a refresh (key rotation tolerance); this floor
/// keeps a flood of tokens with bogus kids from hammering the endpoint.
const DEFAULT_REFRESH_BACKOFF: Duration = Duration::from_secs(30);

/// OpenID configuration document (subset of fields we need).
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Clone)]
struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

impl CachedKeys {
    fn new(keys: JwkSet) -> Self {
        Self {
            keys: Arc::new(keys),
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    fn find(&self, kid: Option<&str>) -> Option<Jwk> {
        match kid {
            Some(kid) => self.keys.find(kid).cloned(),
            // Tokens without a kid are only verifiable against an
            // unambiguous key set.
            None if self.keys.keys.len() == 1 => self.keys.keys.first().cloned(),
            None => None,
        }
    }
}

/// TTL cache of verification key sets, keyed by discovery endpoint.
///
/// The one object intended for cross-call sharing: clone an `Arc<KeyStore>`
/// into every authenticator that should share fetched keys.
pub struct KeyStore {
    client: reqwest::Client,
    ttl: Duration,
    refresh_backoff: Duration,
    cache: RwLock<HashMap<String, CachedKeys>>,
    // Per-endpoint refresh gates (single-flight).
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore").field("ttl", &self.ttl).finish()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_KEYS_TTL, DEFAULT_HTTP_TIMEOUT, DEFAULT_REFRESH_BACKOFF)
    }

    /// Key store with a custom cache TTL, per-request HTTP timeout, and
    /// minimum interval between fetches of the same endpoint.
    pub fn with_settings(ttl: Duration, http_timeout: Duration, refresh_backoff: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            ttl,
            refresh_backoff,
            cache: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the cache for an endpoint without any network access.
    ///
    /// For offline operation and test fixtures; the seeded set ages out like
    /// a fetched one.
    pub async fn prime(&self, endpoint: &Url, keys: JwkSet) {
        self.cache
            .write()
            .await
            .insert(endpoint.to_string(), CachedKeys::new(keys));
    }

    /// Drop all cached key sets.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Get the verification key for `kid` from `endpoint`.
    ///
    /// Fetches the key set on first use or after the TTL expires. An unknown
    /// `kid` in a fresh set triggers one refresh before failing, so freshly
    /// rotated keys are picked up without waiting out the TTL.
    pub async fn get(&self, endpoint: &Url, kid: Option<&str>) -> Result<Jwk, TokenError> {
        if let Some(cached) = self.lookup(endpoint).await {
            if cached.is_fresh(self.ttl) {
                if let Some(jwk) = cached.find(kid) {
                    return Ok(jwk);
                }
                debug!(endpoint = %endpoint, kid = ?kid, "kid not in cached key set, refreshing");
            }
        }

        if let Err(err) = self.refresh(endpoint).await {
            // Serve the cached set if we still have one; an unreachable
            // endpoint must not take down verification of current keys.
            match self.lookup(endpoint).await {
                Some(cached) => {
                    warn!(endpoint = %endpoint, error = %err, "key refresh failed, serving cached set");
                    return cached
                        .find(kid)
                        .ok_or_else(|| TokenError::UnknownKey { kid: kid.map(str::to_string) });
                }
                None => return Err(TokenError::KeyDiscovery(err)),
            }
        }

        let cached = self.lookup(endpoint).await.ok_or_else(|| {
            TokenError::KeyDiscovery(KeyDiscoveryError::Fetch {
                url: endpoint.to_string(),
                reason: "cache empty after refresh".into(),
            })
        })?;

        cached
            .find(kid)
            .ok_or_else(|| TokenError::UnknownKey { kid: kid.map(str::to_string) })
    }

    async fn lookup(&self, endpoint: &Url) -> Option<CachedKeys> {
        self.cache.read().await.get(endpoint.as_str()).cloned()
    }

    /// Refresh the key set for one endpoint, single-flight.
    ///
    /// Concurrent callers queue on the endpoint's gate; whoever enters after
    /// a completed fetch sees a recent `fetched_at` and skips the network.
    async fn refresh(&self, endpoint: &Url) -> Result<(), KeyDiscoveryError> {
        let gate = {
            let mut gates = self.gates.lock().await;
            gates
                .entry(endpoint.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _flight = gate.lock().await;

        if let Some(cached) = self.lookup(endpoint).await {
            if cached.fetched_at.elapsed() < self.refresh_backoff {
                return Ok(());
            }
        }

        let keys = self.fetch(endpoint).await?;
        debug!(endpoint = %endpoint, key_count = keys.keys.len(), "key set fetched");
        self.cache
            .write()
            .await
            .insert(endpoint.to_string(), CachedKeys::new(keys));

        Ok(())
    }

    async fn fetch(&self, endpoint: &Url) -> Result<JwkSet, KeyDiscoveryError> {
        let document: serde_json::Value = self.get_json(endpoint.clone()).await?;

        // The endpoint may serve the JWKS directly or an OpenID configuration
        // document pointing at it.
        if document.get("keys").is_some() {
            return serde_json::from_value(document).map_err(|e| {
                KeyDiscoveryError::InvalidDocument {
                    url: endpoint.to_string(),
                    reason: format!("invalid JWKS: {e}"),
                }
            });
        }

        let discovery: DiscoveryDocument =
            serde_json::from_value(document).map_err(|e| KeyDiscoveryError::InvalidDocument {
                url: endpoint.to_string(),
                reason: format!("neither a JWKS nor an OpenID configuration: {e}"),
            })?;

        let jwks_url =
            Url::parse(&discovery.jwks_uri).map_err(|e| KeyDiscoveryError::InvalidDocument {
                url: endpoint.to_string(),
                reason: format!("invalid jwks_uri: {e}"),
            })?;

        debug!(jwks_uri = %jwks_url, "following discovery document");
        let keys: serde_json::Value = self.get_json(jwks_url.clone()).await?;
        serde_json::from_value(keys).map_err(|e| KeyDiscoveryError::InvalidDocument {
            url: jwks_url.to_string(),
            reason: format!("invalid JWKS: {e}"),
        })
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, KeyDiscoveryError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| KeyDiscoveryError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeyDiscoveryError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| KeyDiscoveryError::InvalidDocument {
                url: url.to_string(),
                reason: format!("invalid JSON: {e}"),
            })
    }
}
