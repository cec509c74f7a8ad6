//! OAuth nonce generation.
//!
//! The OAuth initiation dance itself happens outside this crate, but the
//! nonce it embeds is a Poseidon commitment over the ephemeral key and
//! `max_epoch` — squarely ZK-input-construction territory, so it lives
//! next to the builder rather than behind an HTTP surface.

use crate::error::ZkInputError;
use crate::poseidon::poseidon_hash;
use crate::zkinput::compute_eph_public_key;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use num_bigint::BigUint;
use rand::RngCore;

/// Byte width the nonce is truncated to after hashing, matching the
/// short opaque-token shape OAuth `nonce` parameters are expected to have.
const NONCE_TRUNCATED_BYTES: usize = 20;
const RANDOMNESS_BYTES: usize = 16;

pub struct GeneratedNonce {
    pub nonce: String,
    pub randomness: String,
}

/// Derive a fresh `(nonce, randomness)` pair bound to `ephemeral_public_key`
/// and `max_epoch`. Called once per OAuth initiation; two calls must never
/// produce the same pair.
pub fn generate_nonce(
    ephemeral_public_key: &str,
    max_epoch: u64,
) -> Result<GeneratedNonce, ZkInputError> {
    let mut randomness_bytes = [0u8; RANDOMNESS_BYTES];
    rand::thread_rng().fill_bytes(&mut randomness_bytes);
    let randomness_int = BigUint::from_bytes_be(&randomness_bytes);
    let randomness = randomness_int.to_string();

    let (eph_key_int, _) = compute_eph_public_key(ephemeral_public_key)?;
    let low_mask = (BigUint::from(1u32) << 128u32) - BigUint::from(1u32);
    let eph_high = Fr::from_be_bytes_mod_order(&(&eph_key_int >> 128u32).to_bytes_be());
    let eph_low = Fr::from_be_bytes_mod_order(&(&eph_key_int & &low_mask).to_bytes_be());
    let max_epoch_fr = Fr::from(max_epoch);
    let randomness_fr = Fr::from_be_bytes_mod_order(&randomness_int.to_bytes_be());

    let nonce_fr = poseidon_hash(&[eph_high, eph_low, max_epoch_fr, randomness_fr])?;
    let nonce_bytes = nonce_fr.into_bigint().to_bytes_be();
    let truncated = &nonce_bytes[nonce_bytes.len() - NONCE_TRUNCATED_BYTES..];
    let nonce = URL_SAFE_NO_PAD.encode(truncated);

    Ok(GeneratedNonce { nonce, randomness })
}
