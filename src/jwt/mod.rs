//! Parses a JWT's header/payload/signature, and locates claim substrings
//! so the ZK input builder can slice both the raw JSON bytes and the
//! base64 encoding of the JWT at matching offsets.
//!
//! The claim-locator arithmetic (`extract_claim`) is the part of this
//! system where an off-by-one silently invalidates every proof — it is
//! implemented step by step rather than simplified, and is covered by the
//! golden fixture in `zkinput::tests`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("JWT does not have exactly three dot-separated segments")]
    MalformedShape,

    #[error("invalid base64 in JWT segment: {0}")]
    InvalidBase64(String),

    #[error("invalid JSON in JWT segment: {0}")]
    InvalidJson(String),

    #[error("JWT header missing required field {field}")]
    MissingHeaderField { field: &'static str },

    #[error("header alg {alg:?} is not supported (only RS256)")]
    UnsupportedAlgorithm { alg: String },

    #[error("JWT payload missing required claim {claim}")]
    MissingClaim { claim: &'static str },

    #[error("claim {claim} value exceeds its padded signal width")]
    ClaimTooLong { claim: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub kid: String,
    #[serde(default)]
    pub typ: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JwtPayload {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub nonce: String,
}

#[derive(Debug, Clone)]
pub struct JwtParts {
    pub header_b64: String,
    pub payload_b64: String,
    pub signature_b64: String,
    pub payload_bin: Vec<u8>,
    pub header: JwtHeader,
    pub payload: JwtPayload,
}

/// The fields the claim-locator algorithm returns for a single claim, in
/// absolute-JWT-string coordinates for the base64 span.
#[derive(Debug, Clone)]
pub struct ClaimLocator {
    pub final_val: Vec<u8>,
    pub padded_ascii: Vec<u8>,
    pub b64_start: usize,
    pub b64_size: usize,
    pub name_len: usize,
    pub colon_index: usize,
    pub value_index: usize,
    pub value_length: usize,
}

/// Decode a single JWT segment as standard base64 with padding inferred.
/// Both the payload and the signature segment use this identical rule.
pub fn decode_b64_segment(segment: &str) -> Result<Vec<u8>, JwtError> {
    decode_b64_padded(segment)
}

fn decode_b64_padded(segment: &str) -> Result<Vec<u8>, JwtError> {
    let mut normalized = segment.replace('-', "+").replace('_', "/");
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    STANDARD
        .decode(normalized.as_bytes())
        .map_err(|e| JwtError::InvalidBase64(e.to_string()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn require_str<'a>(v: &'a Value, claim: &'static str) -> Result<&'a str, JwtError> {
    v.get(claim)
        .and_then(Value::as_str)
        .ok_or(JwtError::MissingClaim { claim })
}

pub fn dissect(jwt: &str) -> Result<JwtParts, JwtError> {
    let segments: Vec<&str> = jwt.split('.').collect();
    if segments.len() != 3 {
        return Err(JwtError::MalformedShape);
    }
    let (header_b64, payload_b64, signature_b64) = (segments[0], segments[1], segments[2]);

    let header_bin = decode_b64_padded(header_b64)?;
    let header_val: Value = serde_json::from_slice(&header_bin)
        .map_err(|e| JwtError::InvalidJson(e.to_string()))?;
    let header = JwtHeader {
        alg: require_str(&header_val, "alg")?.to_string(),
        kid: require_str(&header_val, "kid")?.to_string(),
        typ: header_val
            .get("typ")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    if header.alg != "RS256" {
        return Err(JwtError::UnsupportedAlgorithm { alg: header.alg });
    }

    let payload_bin = decode_b64_padded(payload_b64)?;
    let payload_val: Value = serde_json::from_slice(&payload_bin)
        .map_err(|e| JwtError::InvalidJson(e.to_string()))?;
    let payload = JwtPayload {
        iss: require_str(&payload_val, "iss")?.to_string(),
        aud: require_str(&payload_val, "aud")?.to_string(),
        sub: require_str(&payload_val, "sub")?.to_string(),
        nonce: require_str(&payload_val, "nonce")?.to_string(),
    };

    Ok(JwtParts {
        header_b64: header_b64.to_string(),
        payload_b64: payload_b64.to_string(),
        signature_b64: signature_b64.to_string(),
        payload_bin,
        header,
        payload,
    })
}

/// Locate the claim named `name` within `payload_bin`, padding its decoded
/// bytes to `pad_len` and translating its byte offsets into a base64 span
/// absolute within the full JWT string.
pub fn extract_claim(
    payload_bin: &[u8],
    header_b64_len: usize,
    name: &'static str,
    pad_len: usize,
) -> Result<ClaimLocator, JwtError> {
    let pos = find_subslice(payload_bin, name.as_bytes()).ok_or(JwtError::MissingClaim {
        claim: name,
    })?;
    if pos < 2 {
        return Err(JwtError::MissingClaim { claim: name });
    }
    let start = pos - 2;

    let rel_end =
        find_subslice(&payload_bin[pos + 1..], b",").ok_or(JwtError::MissingClaim { claim: name })?;
    let end = pos + rel_end + 2;

    let slice = &payload_bin[start..end];
    let final_val = slice[1..].to_vec();

    if final_val.len() > pad_len {
        return Err(JwtError::ClaimTooLong { claim: name });
    }
    let mut padded_ascii = final_val.clone();
    padded_ascii.resize(pad_len, 0);

    let o = start + 1;
    let l = final_val.len();
    let align = |x: usize| if x % 3 == 0 { 0 } else { 1 + (x % 3) };
    let b64_start = (o / 3) * 4 + (o % 3);
    let b64_end = ((o + l) / 3) * 4 + align(o + l);
    let b64_size = b64_end - b64_start;

    let colon_index =
        find_subslice(&final_val, b":").ok_or(JwtError::MissingClaim { claim: name })?;
    let value_index = colon_index + 1;
    let value_length = find_subslice(&final_val[value_index + 1..], b"\"")
        .ok_or(JwtError::MissingClaim { claim: name })?
        + 2;
    let name_len = name.len() + 2;

    Ok(ClaimLocator {
        final_val,
        padded_ascii,
        b64_start: b64_start + header_b64_len + 1,
        b64_size,
        name_len,
        colon_index,
        value_index,
        value_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jwt() -> String {
        let header = STANDARD.encode(r#"{"alg":"RS256","kid":"abc","typ":"JWT"}"#);
        let payload = STANDARD.encode(
            r#"{"iss":"https://accounts.google.com","aud":"client-id","sub":"1234567890","nonce":"abcDEF123"}"#,
        );
        format!("{}.{}.sig", header.trim_end_matches('='), payload.trim_end_matches('='))
    }

    #[test]
    fn dissects_well_formed_jwt() {
        let jwt = sample_jwt();
        let parts = dissect(&jwt).unwrap();
        assert_eq!(parts.header.alg, "RS256");
        assert_eq!(parts.payload.sub, "1234567890");
        assert_eq!(parts.payload.nonce, "abcDEF123");
    }

    #[test]
    fn malformed_shape_is_fatal() {
        assert_eq!(dissect("only.two").unwrap_err(), JwtError::MalformedShape);
    }

    #[test]
    fn extract_claim_locates_sub() {
        let jwt = sample_jwt();
        let parts = dissect(&jwt).unwrap();
        let locator = extract_claim(&parts.payload_bin, parts.header_b64.len(), "sub", 126).unwrap();
        assert_eq!(locator.final_val, b"\"sub\":\"1234567890\",");
        assert_eq!(locator.padded_ascii.len(), 126);
        assert_eq!(locator.name_len, 5);
    }

    #[test]
    fn missing_claim_is_fatal() {
        let header = STANDARD.encode(r#"{"alg":"RS256","kid":"abc"}"#);
        let payload = STANDARD.encode(r#"{"iss":"x","aud":"y","sub":"z"}"#);
        let jwt = format!("{}.{}.sig", header, payload);
        assert_eq!(
            dissect(&jwt).unwrap_err(),
            JwtError::MissingClaim { claim: "nonce" }
        );
    }
}
