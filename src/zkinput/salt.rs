//! Salt issuance. In production this is an external collaborator (an
//! oracle service gating salt release behind its own authentication), so
//! this module only defines the seam the builder's caller plugs into, the
//! same way `jwks::JwksFetcher` seams out the identity provider's network
//! call.

use crate::error::ZkInputError;
use crate::poseidon::{fr_to_decimal, poseidon_hash};
use crate::zkinput::{field_hash_ascii, AUD_VALUE_HASH_PAD, KC_VALUE_HASH_PAD};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaltError {
    #[error("salt lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait SaltProvider: Send + Sync {
    async fn salt_for(&self, sub: &str, aud: &str) -> Result<String, SaltError>;
}

/// Derives a stable decimal salt from `(sub, aud)` via Poseidon. Not a
/// production salt service — two different users can compute each other's
/// salt from public JWT claims — but deterministic, so fixtures and tests
/// never need a live oracle.
pub struct DeterministicSaltProvider;

#[async_trait]
impl SaltProvider for DeterministicSaltProvider {
    async fn salt_for(&self, sub: &str, aud: &str) -> Result<String, SaltError> {
        let hash_claim = |bytes: &[u8], pad: usize| -> Result<_, SaltError> {
            field_hash_ascii(bytes, pad).map_err(|e: ZkInputError| SaltError::Lookup(e.to_string()))
        };
        let sub_f = hash_claim(sub.as_bytes(), KC_VALUE_HASH_PAD)?;
        let aud_f = hash_claim(aud.as_bytes(), AUD_VALUE_HASH_PAD)?;
        let salt_f = poseidon_hash(&[sub_f, aud_f]).map_err(|e| SaltError::Lookup(e.to_string()))?;
        Ok(fr_to_decimal(&salt_f))
    }
}
