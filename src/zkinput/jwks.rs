//! JWKS cache and fetch.
//!
//! Fetching certificates from the identity provider happens over the
//! network; this module defines the contract (`JwksFetcher`) and a thin
//! `reqwest`-backed implementation, plus the resolve-by-`kid` lookup the
//! ZK input builder depends on.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksEntry {
    pub kty: String,
    pub kid: String,
    /// RSA modulus, base64url-encoded, unpadded.
    pub n: String,
    /// RSA public exponent, base64url-encoded, unpadded.
    pub e: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub use_: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JwksSet {
    pub keys: Vec<JwksEntry>,
}

impl JwksSet {
    pub fn resolve(&self, kid: &str) -> Option<&JwksEntry> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[derive(Debug, Error)]
pub enum JwksFetchError {
    #[error("network error fetching JWKS: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait::async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self, jwks_uri: &str) -> Result<JwksSet, JwksFetchError>;
}

pub struct ReqwestJwksFetcher {
    client: reqwest::Client,
}

impl Default for ReqwestJwksFetcher {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl JwksFetcher for ReqwestJwksFetcher {
    async fn fetch(&self, jwks_uri: &str) -> Result<JwksSet, JwksFetchError> {
        let set = self
            .client
            .get(jwks_uri)
            .send()
            .await?
            .json::<JwksSet>()
            .await?;
        Ok(set)
    }
}

struct CachedJwks {
    set: JwksSet,
    fetched_at: Instant,
}

/// Caches a fetched `JwksSet` per issuer, refreshing once on an unknown
/// `kid` before giving up (mirrors the OIDC JWKS-caching pattern used
/// across the retrieval pack rather than re-fetching on every call).
pub struct JwksCache<F: JwksFetcher> {
    fetcher: F,
    ttl: Duration,
    entries: DashMap<String, CachedJwks>,
}

impl<F: JwksFetcher> JwksCache<F> {
    pub fn new(fetcher: F, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entries: DashMap::new(),
        }
    }

    pub async fn resolve(
        &self,
        issuer: &str,
        jwks_uri: &str,
        kid: &str,
    ) -> Result<Option<JwksEntry>, JwksFetchError> {
        let is_stale = self
            .entries
            .get(issuer)
            .map(|c| c.fetched_at.elapsed() >= self.ttl)
            .unwrap_or(true);

        if !is_stale {
            if let Some(cached) = self.entries.get(issuer) {
                if let Some(entry) = cached.set.resolve(kid) {
                    return Ok(Some(entry.clone()));
                }
            }
        }

        let set = self.fetcher.fetch(jwks_uri).await?;
        let resolved = set.resolve(kid).cloned();
        self.entries.insert(
            issuer.to_string(),
            CachedJwks {
                set,
                fetched_at: Instant::now(),
            },
        );
        Ok(resolved)
    }
}
