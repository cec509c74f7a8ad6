//! Typed DTOs for the circuit's named input signals and the
//! `SuiProofFields` side-channel. One named field per signal closes the
//! whole class of key-spelling bugs a dynamic map invites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitInputs {
    pub all_inputs_hash: String,
    pub salt: String,
    pub max_epoch: String,
    pub jwt_randomness: String,
    pub eph_public_key: [String; 2],

    pub modulus: Vec<String>,
    pub signature: Vec<String>,

    pub padded_unsigned_jwt: Vec<String>,
    pub payload_len: String,
    pub num_sha2_blocks: String,
    pub payload_start_index: String,

    pub ext_kc: Vec<String>,
    pub ext_kc_length: String,
    pub kc_index_b64: String,
    pub kc_length_b64: String,
    pub kc_name_length: String,
    pub kc_colon_index: String,
    pub kc_value_index: String,
    pub kc_value_length: String,

    pub ext_nonce: Vec<String>,
    pub ext_nonce_length: String,
    pub nonce_index_b64: String,
    pub nonce_length_b64: String,
    pub nonce_colon_index: String,
    pub nonce_value_index: String,

    pub ext_ev: Vec<String>,
    pub ext_ev_length: String,
    pub ev_index_b64: String,
    pub ev_length_b64: String,
    pub ev_name_length: String,
    pub ev_colon_index: String,
    pub ev_value_index: String,
    pub ev_value_length: String,

    pub ext_aud: Vec<String>,
    pub ext_aud_length: String,
    pub aud_index_b64: String,
    pub aud_length_b64: String,
    pub aud_colon_index: String,
    pub aud_value_index: String,
    pub aud_value_length: String,

    pub iss_index_b64: String,
    pub iss_length_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssBase64Details {
    pub value: String,
    pub index_mod_4: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiProofFields {
    pub address_seed: String,
    pub header: String,
    pub iss_base64_details: IssBase64Details,
}
