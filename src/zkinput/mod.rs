//! ZK Input Builder — the only externally-visible surface of this
//! subsystem. `generate_zk_input` is a pure function of its arguments
//! plus the resolved JWKS entry: no clocks, no RNG, no ambient state, so
//! that identical calls produce bitwise identical output.

pub mod jwks;
pub mod rsa;
pub mod salt;
pub mod sha_pad;
pub mod types;

use crate::error::ZkInputError;
use crate::jwt::{self, ClaimLocator};
use crate::poseidon::{convert_base_to_fr, fr_to_decimal, poseidon_hash};
use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use std::str::FromStr;

pub use jwks::{JwksEntry, JwksSet};
pub use salt::{DeterministicSaltProvider, SaltError, SaltProvider};
pub use types::{CircuitInputs, IssBase64Details, SuiProofFields};

// Fixed witness-layout constants. Every one of these is load-bearing:
// changing any of them changes witness layout and invalidates proofs.
pub const SUB_PAD_LEN: usize = 126;
pub const NONCE_PAD_LEN: usize = 44;
pub const EV_PAD_LEN: usize = 53;
pub const AUD_PAD_LEN: usize = 160;
pub const ISS_HASH_PAD: usize = 224;
pub const KC_NAME_HASH_PAD: usize = 32;
pub const KC_VALUE_HASH_PAD: usize = 115;
pub const AUD_VALUE_HASH_PAD: usize = 145;
pub const HEADER_HASH_PAD: usize = 248;
pub const SHA_PADDED_JWT_LEN: usize = 1600;
pub const IN_BASE_BYTES: u32 = 8;
pub const OUT_BASE_FIELD: u32 = 248;

#[derive(Debug, Clone)]
pub struct ZkInputRequest {
    pub jwt: String,
    pub salt: String,
    /// `"0x"` + 64 hex chars: a 32-byte Ed25519 ephemeral public key.
    pub ephemeral_public_key: String,
    pub max_epoch: String,
    pub randomness: String,
    pub jwks: JwksSet,
}

#[derive(Debug, Clone)]
pub struct ZkInputOutput {
    pub inputs: CircuitInputs,
    pub fields: SuiProofFields,
}

fn pad_ascii_reversed(s: &[u8], pad_len: usize) -> Vec<u8> {
    let mut padded = s.to_vec();
    padded.resize(pad_len, 0);
    padded.reverse();
    padded
}

pub(crate) fn field_hash_ascii(s: &[u8], pad_len: usize) -> Result<Fr, ZkInputError> {
    let reversed = pad_ascii_reversed(s, pad_len);
    let digits: Vec<u64> = reversed.iter().map(|b| *b as u64).collect();
    let frs = convert_base_to_fr(&digits, IN_BASE_BYTES, OUT_BASE_FIELD);
    Ok(poseidon_hash(&frs)?)
}

pub(crate) fn compute_eph_public_key(key_str: &str) -> Result<(BigUint, [String; 2]), ZkInputError> {
    let hex_part = key_str
        .strip_prefix("0x")
        .ok_or_else(|| ZkInputError::InvalidEphemeralKey("missing 0x prefix".into()))?;
    if hex_part.len() != 64 {
        return Err(ZkInputError::InvalidEphemeralKey(format!(
            "expected 64 hex chars, got {}",
            hex_part.len()
        )));
    }
    let key_bytes = hex::decode(hex_part)
        .map_err(|e| ZkInputError::InvalidEphemeralKey(e.to_string()))?;

    // Sui public key encoding: one scheme-flag byte (0x00 = Ed25519) followed
    // by the raw 32-byte key.
    let mut sui_bytes = Vec::with_capacity(33);
    sui_bytes.push(0u8);
    sui_bytes.extend_from_slice(&key_bytes);

    let k = BigUint::from_bytes_be(&sui_bytes);
    let low_mask = (BigUint::from(1u32) << 128u32) - BigUint::from(1u32);
    let low = &k & &low_mask;
    let high = &k >> 128u32;
    Ok((k, [high.to_string(), low.to_string()]))
}

fn bytes_to_decimal_strings(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| b.to_string()).collect()
}

fn locator_padded_decimal(locator: &ClaimLocator) -> Vec<String> {
    bytes_to_decimal_strings(&locator.padded_ascii)
}

/// Pure transformation from `(JWT, salt, ephemeral public key, max_epoch,
/// randomness, JWKS)` to the circuit's input signals and `SuiProofFields`.
pub fn generate_zk_input(req: &ZkInputRequest) -> Result<ZkInputOutput, ZkInputError> {
    let parts = jwt::dissect(&req.jwt)?;

    let jwks_entry = req
        .jwks
        .resolve(&parts.header.kid)
        .ok_or_else(|| ZkInputError::UnknownKid {
            kid: parts.header.kid.clone(),
        })?;

    let n_bytes = base64_url_decode(&jwks_entry.n)
        .map_err(|e| ZkInputError::InvalidRsaKey(e.to_string()))?;
    let modulus_int = BigUint::from_bytes_be(&n_bytes);
    let modulus_limbs = rsa::get_limbs(&modulus_int);

    let signature_bytes = jwt::decode_b64_segment(&parts.signature_b64)
        .map_err(ZkInputError::Jwt)?;
    let signature_int = BigUint::from_bytes_be(&signature_bytes);
    let signature_limbs = rsa::get_limbs(&signature_int);

    let unsigned_jwt = format!("{}.{}", parts.header_b64, parts.payload_b64);
    let (padded_unsigned_jwt, num_sha2_blocks) =
        sha_pad::sha256_pad(unsigned_jwt.as_bytes(), SHA_PADDED_JWT_LEN);
    let payload_len = parts.payload_b64.len();
    let payload_start_index = parts.header_b64.len() + 1;

    let locator_sub = jwt::extract_claim(&parts.payload_bin, parts.header_b64.len(), "sub", SUB_PAD_LEN)?;
    let locator_nonce44 =
        jwt::extract_claim(&parts.payload_bin, parts.header_b64.len(), "nonce", NONCE_PAD_LEN)?;
    let locator_nonce53 =
        jwt::extract_claim(&parts.payload_bin, parts.header_b64.len(), "nonce", EV_PAD_LEN)?;
    let locator_aud = jwt::extract_claim(&parts.payload_bin, parts.header_b64.len(), "aud", AUD_PAD_LEN)?;
    let locator_iss = jwt::extract_claim(&parts.payload_bin, parts.header_b64.len(), "iss", AUD_PAD_LEN)?;

    let (eph_key_int, eph_public_key) = compute_eph_public_key(&req.ephemeral_public_key)?;

    let iss_b64_start_abs = locator_iss.b64_start;
    let iss_b64_end_abs = iss_b64_start_abs + locator_iss.b64_size;
    let iss_slice = req
        .jwt
        .as_bytes()
        .get(iss_b64_start_abs..iss_b64_end_abs)
        .ok_or_else(|| ZkInputError::InvalidJwtSlice)?;

    let iss_field_f = field_hash_ascii(iss_slice, ISS_HASH_PAD)?;
    let kc_name_f = field_hash_ascii(b"sub", KC_NAME_HASH_PAD)?;
    let kc_value_f = field_hash_ascii(parts.payload.sub.as_bytes(), KC_VALUE_HASH_PAD)?;
    let aud_value_f = field_hash_ascii(parts.payload.aud.as_bytes(), AUD_VALUE_HASH_PAD)?;
    let header_f = field_hash_ascii(parts.header_b64.as_bytes(), HEADER_HASH_PAD)?;
    let modulus_frs = convert_base_to_fr(&modulus_limbs, 64, OUT_BASE_FIELD);
    let modulus_f = poseidon_hash(&modulus_frs)?;

    let salt_int = BigUint::from_bytes_be(req.salt.as_bytes());
    let salt_fr = Fr::from_be_bytes_mod_order(&salt_int.to_bytes_be());
    let salt_hash = poseidon_hash(&[salt_fr])?;

    let address_seed = poseidon_hash(&[kc_name_f, kc_value_f, aud_value_f, salt_hash])?;

    let iss_mod_4 = ((iss_b64_start_abs as i64 - payload_start_index as i64).rem_euclid(4)) as u8;

    let eph_key_high = Fr::from_be_bytes_mod_order(&(&eph_key_int >> 128u32).to_bytes_be());
    let eph_key_low_mask = (BigUint::from(1u32) << 128u32) - BigUint::from(1u32);
    let eph_key_low = Fr::from_be_bytes_mod_order(&(&eph_key_int & &eph_key_low_mask).to_bytes_be());
    let max_epoch_fr = Fr::from_str(&req.max_epoch)
        .map_err(|_| ZkInputError::InvalidEphemeralKey("max_epoch is not decimal".into()))?;
    let iss_mod_4_fr = Fr::from(iss_mod_4 as u64);

    let all_inputs_hash = poseidon_hash(&[
        eph_key_high,
        eph_key_low,
        address_seed,
        max_epoch_fr,
        iss_field_f,
        iss_mod_4_fr,
        header_f,
        modulus_f,
    ])?;

    let inputs = CircuitInputs {
        all_inputs_hash: fr_to_decimal(&all_inputs_hash),
        salt: req.salt.clone(),
        max_epoch: req.max_epoch.clone(),
        jwt_randomness: req.randomness.clone(),
        eph_public_key,

        modulus: rsa::limbs_to_decimal_strings(&modulus_limbs),
        signature: rsa::limbs_to_decimal_strings(&signature_limbs),

        padded_unsigned_jwt: bytes_to_decimal_strings(&padded_unsigned_jwt),
        payload_len: payload_len.to_string(),
        num_sha2_blocks: num_sha2_blocks.to_string(),
        payload_start_index: payload_start_index.to_string(),

        ext_kc: locator_padded_decimal(&locator_sub),
        ext_kc_length: locator_sub.final_val.len().to_string(),
        kc_index_b64: locator_sub.b64_start.to_string(),
        kc_length_b64: locator_sub.b64_size.to_string(),
        kc_name_length: locator_sub.name_len.to_string(),
        kc_colon_index: locator_sub.colon_index.to_string(),
        kc_value_index: locator_sub.value_index.to_string(),
        kc_value_length: locator_sub.value_length.to_string(),

        ext_nonce: locator_padded_decimal(&locator_nonce44),
        ext_nonce_length: locator_nonce44.final_val.len().to_string(),
        nonce_index_b64: locator_nonce44.b64_start.to_string(),
        nonce_length_b64: locator_nonce44.b64_size.to_string(),
        nonce_colon_index: locator_nonce44.colon_index.to_string(),
        nonce_value_index: locator_nonce44.value_index.to_string(),

        ext_ev: locator_padded_decimal(&locator_nonce53),
        ext_ev_length: locator_nonce53.final_val.len().to_string(),
        ev_index_b64: locator_nonce53.b64_start.to_string(),
        ev_length_b64: locator_nonce53.b64_size.to_string(),
        ev_name_length: locator_nonce53.name_len.to_string(),
        ev_colon_index: locator_nonce53.colon_index.to_string(),
        ev_value_index: locator_nonce53.value_index.to_string(),
        ev_value_length: locator_nonce53.value_length.to_string(),

        ext_aud: locator_padded_decimal(&locator_aud),
        ext_aud_length: locator_aud.final_val.len().to_string(),
        aud_index_b64: locator_aud.b64_start.to_string(),
        aud_length_b64: locator_aud.b64_size.to_string(),
        aud_colon_index: locator_aud.colon_index.to_string(),
        aud_value_index: locator_aud.value_index.to_string(),
        aud_value_length: locator_aud.value_length.to_string(),

        iss_index_b64: locator_iss.b64_start.to_string(),
        iss_length_b64: locator_iss.b64_size.to_string(),
    };

    let fields = SuiProofFields {
        address_seed: fr_to_decimal(&address_seed),
        header: fr_to_decimal(&header_f),
        iss_base64_details: IssBase64Details {
            value: fr_to_decimal(&iss_field_f),
            index_mod_4: iss_mod_4,
        },
    };

    Ok(ZkInputOutput { inputs, fields })
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    URL_SAFE_NO_PAD.decode(s.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use rand::rngs::OsRng;
    use ::rsa::pkcs1v15::SigningKey;
    use ::rsa::signature::{RandomizedSigner, SignatureEncoding};
    use ::rsa::traits::PublicKeyParts;
    use ::rsa::RsaPrivateKey;
    use sha2::Sha256;

    fn build_jwt_and_jwks() -> (String, JwksSet) {
        let header_json = r#"{"alg":"RS256","kid":"test-kid","typ":"JWT"}"#;
        let payload_json = r#"{"iss":"https://accounts.google.com","aud":"my-client-id.apps.googleusercontent.com","sub":"110169484474386276334","nonce":"abcDEF123hij"}"#;

        let header_b64 = URL_SAFE_NO_PAD.encode(header_json);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let unsigned = format!("{}.{}", header_b64, payload_b64);

        let mut rng = OsRng;
        let priv_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let signing_key = SigningKey::<Sha256>::new(priv_key.clone());
        let signature = signing_key.sign_with_rng(&mut rng, unsigned.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

        let jwt = format!("{}.{}", unsigned, sig_b64);

        let pub_key = priv_key.to_public_key();
        let n_bytes = pub_key.n().to_bytes_be();
        let n_b64 = URL_SAFE_NO_PAD.encode(n_bytes);

        let jwks = JwksSet {
            keys: vec![JwksEntry {
                kty: "RSA".into(),
                kid: "test-kid".into(),
                n: n_b64,
                e: "AQAB".into(),
                alg: Some("RS256".into()),
                use_: Some("sig".into()),
            }],
        };
        (jwt, jwks)
    }

    #[test]
    fn builder_succeeds_on_well_formed_jwt() {
        let (jwt, jwks) = build_jwt_and_jwks();
        let req = ZkInputRequest {
            jwt,
            salt: "25299916604528864863320632865981".into(),
            ephemeral_public_key: "0xfafd1d9e25a87e9652976a7bb06c2e4777c2e539d90f3ee7b6b12b9a45118a8"
                .into(),
            max_epoch: "1".into(),
            randomness: "29229108527107981601948220068988".into(),
            jwks,
        };
        let out = generate_zk_input(&req).unwrap();
        assert!(!out.inputs.all_inputs_hash.is_empty());
        assert!(out.fields.iss_base64_details.index_mod_4 <= 3);
        assert!(!out.fields.address_seed.is_empty());
        assert!(!out.fields.header.is_empty());
    }

    #[test]
    fn determinism() {
        let (jwt, jwks) = build_jwt_and_jwks();
        let req = ZkInputRequest {
            jwt,
            salt: "111".into(),
            ephemeral_public_key: "0xfafd1d9e25a87e9652976a7bb06c2e4777c2e539d90f3ee7b6b12b9a45118a8"
                .into(),
            max_epoch: "1".into(),
            randomness: "222".into(),
            jwks,
        };
        let a = generate_zk_input(&req).unwrap();
        let b = generate_zk_input(&req).unwrap();
        assert_eq!(a.fields.address_seed, b.fields.address_seed);
        assert_eq!(a.inputs.all_inputs_hash, b.inputs.all_inputs_hash);
    }

    #[test]
    fn address_seed_is_independent_of_epk_max_epoch_randomness() {
        let (jwt, jwks) = build_jwt_and_jwks();
        let base_req = ZkInputRequest {
            jwt,
            salt: "999".into(),
            ephemeral_public_key: "0xfafd1d9e25a87e9652976a7bb06c2e4777c2e539d90f3ee7b6b12b9a45118a8"
                .into(),
            max_epoch: "1".into(),
            randomness: "1".into(),
            jwks,
        };
        let out_a = generate_zk_input(&base_req).unwrap();

        let mut changed = base_req.clone();
        changed.max_epoch = "2".into();
        changed.randomness = "999999".into();
        changed.ephemeral_public_key =
            format!("0x{}", "0".repeat(64));
        let out_b = generate_zk_input(&changed).unwrap();

        assert_eq!(out_a.fields.address_seed, out_b.fields.address_seed);
    }

    #[test]
    fn unknown_kid_is_fatal() {
        let (jwt, _jwks) = build_jwt_and_jwks();
        let req = ZkInputRequest {
            jwt,
            salt: "1".into(),
            ephemeral_public_key: "0xfafd1d9e25a87e9652976a7bb06c2e4777c2e539d90f3ee7b6b12b9a45118a8"
                .into(),
            max_epoch: "1".into(),
            randomness: "1".into(),
            jwks: JwksSet { keys: vec![] },
        };
        let err = generate_zk_input(&req).unwrap_err();
        assert!(matches!(err, ZkInputError::UnknownKid { .. }));
    }
}
