//! RSA public-key and signature limb decomposition.
//!
//! The circuit consumes RSA values as fixed-width arrays of 64-bit limbs,
//! little-endian. A 2048-bit RSA modulus (the key size every supported
//! identity provider publishes) decomposes into exactly 32 limbs.

use num_bigint::BigUint;

pub const RSA_LIMB_BITS: u32 = 64;
pub const RSA_MODULUS_BITS: u32 = 2048;
pub const N_LIMBS: usize = (RSA_MODULUS_BITS / RSA_LIMB_BITS) as usize;

/// Decompose a big-endian-valued integer into `N_LIMBS` little-endian
/// 64-bit limbs, zero-padded on the high end if the value is shorter.
pub fn get_limbs(value: &BigUint) -> Vec<u64> {
    let mut bytes = value.to_bytes_le();
    bytes.resize(N_LIMBS * RSA_LIMB_BITS as usize / 8, 0);
    bytes
        .chunks(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            u64::from_le_bytes(buf)
        })
        .collect()
}

pub fn limbs_to_decimal_strings(limbs: &[u64]) -> Vec<String> {
    limbs.iter().map(|l| l.to_string()).collect()
}
