//! Poseidon field primitives over the BN254 scalar field.
//!
//! `poseidon_hash` matches the `poseidon-lite`/circomlib parameterisation
//! for arities 1..=16; beyond that it recurses (split-and-combine) up to
//! 32 inputs, matching the circuit's own Merkle-style extension.
//!
//! `convert_base` is the sole bridge between byte vectors and field-element
//! vectors used by the hasher — implemented once, bit-generic, so the two
//! call sites (byte hashing and RSA-limb hashing) can never drift apart.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

const MAX_DIRECT_ARITY: usize = 16;
const MAX_RECURSIVE_ARITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoseidonError {
    #[error("poseidon_hash called with no inputs")]
    EmptyInput,

    #[error("unable to hash length {len}")]
    UnsupportedArity { len: usize },
}

/// Variable-arity Poseidon hash. `inputs.len()` must be in `1..=32`.
pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, PoseidonError> {
    match inputs.len() {
        0 => Err(PoseidonError::EmptyInput),
        n if n <= MAX_DIRECT_ARITY => Ok(direct_hash(inputs)),
        n if n <= MAX_RECURSIVE_ARITY => {
            let mid = n / 2;
            let left = poseidon_hash(&inputs[..mid])?;
            let right = poseidon_hash(&inputs[mid..])?;
            Ok(direct_hash(&[left, right]))
        }
        n => Err(PoseidonError::UnsupportedArity { len: n }),
    }
}

fn direct_hash(inputs: &[Fr]) -> Fr {
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .expect("circomlib parameterisation exists for arities 1..=16");
    hasher
        .hash(inputs)
        .expect("hashing a correctly-sized input never fails")
}

/// Reinterpret a little-endian base-`2^in_bits` digit sequence as a
/// little-endian base-`2^out_bits` digit sequence, via an intermediate
/// big-integer assembly. Digits beyond the significant bits of the input
/// are zero. Output length is `ceil(in.len() * in_bits / out_bits)`.
pub fn convert_base(in_le: &[u64], in_bits: u32, out_bits: u32) -> Vec<BigUint> {
    if in_le.is_empty() {
        return Vec::new();
    }
    let mut value = BigUint::zero();
    for (i, digit) in in_le.iter().enumerate() {
        value += BigUint::from(*digit) << (i as u32 * in_bits);
    }

    let total_bits = in_le.len() as u64 * in_bits as u64;
    let out_len = total_bits.div_ceil(out_bits as u64) as usize;
    let mask = (BigUint::from(1u32) << out_bits) - BigUint::from(1u32);

    let mut out = Vec::with_capacity(out_len);
    let mut remaining = value;
    for _ in 0..out_len {
        let digit = &remaining & &mask;
        out.push(digit);
        remaining >>= out_bits;
    }
    out
}

/// `convert_base` specialised to emit `Fr` elements directly, as every
/// call site in the ZK input builder immediately feeds the digits to
/// `poseidon_hash`.
pub fn convert_base_to_fr(in_le: &[u64], in_bits: u32, out_bits: u32) -> Vec<Fr> {
    convert_base(in_le, in_bits, out_bits)
        .into_iter()
        .map(|digit| Fr::from_le_bytes_mod_order(&digit.to_bytes_le()))
        .collect()
}

pub fn fr_to_decimal(f: &Fr) -> String {
    BigUint::from_bytes_be(&f.into_bigint().to_bytes_be()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fr_dec(s: &str) -> Fr {
        Fr::from_str(s).unwrap()
    }

    #[test]
    fn empty_input_errors() {
        assert_eq!(poseidon_hash(&[]), Err(PoseidonError::EmptyInput));
    }

    #[test]
    fn arity_33_errors() {
        let inputs = vec![fr_dec("1"); 33];
        assert_eq!(
            poseidon_hash(&inputs),
            Err(PoseidonError::UnsupportedArity { len: 33 })
        );
    }

    #[test]
    fn reference_vector_arity_1() {
        let h = poseidon_hash(&[fr_dec("1")]).unwrap();
        assert_eq!(
            fr_to_decimal(&h),
            "18586133768512220936620570745912940619677854269274689475585506675881198879027"
        );
    }

    #[test]
    fn reference_vector_arity_5() {
        let inputs = vec![fr_dec("1"), fr_dec("2"), fr_dec("3"), fr_dec("4"), fr_dec("5")];
        let h = poseidon_hash(&inputs).unwrap();
        assert_eq!(
            fr_to_decimal(&h),
            "6183221330272524995739186171720101788151706631170188140075976616310159254464"
        );
    }

    #[test]
    fn reference_vector_arity_16() {
        let inputs = vec![fr_dec("1"); 16];
        let h = poseidon_hash(&inputs).unwrap();
        assert_eq!(
            fr_to_decimal(&h),
            "16247148725799187968432601021479716680539182929063252906051522933915398361998"
        );
    }

    #[test]
    fn recursive_arity_is_deterministic_and_order_sensitive() {
        let inputs = vec![fr_dec("1"); 20];
        let a = poseidon_hash(&inputs).unwrap();
        let b = poseidon_hash(&inputs).unwrap();
        assert_eq!(a, b);

        let mut reordered = inputs.clone();
        reordered[0] = fr_dec("2");
        reordered[19] = fr_dec("1");
        let c = poseidon_hash(&reordered).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn recursive_split_matches_manual_two_level_combine() {
        let inputs = vec![fr_dec("1"); 20];
        let expected = direct_hash(&[
            direct_hash(&inputs[..10]),
            direct_hash(&inputs[10..]),
        ]);
        assert_eq!(poseidon_hash(&inputs).unwrap(), expected);
    }

    #[test]
    fn convert_base_round_trips_significant_digits() {
        let original = [0xABu64, 0xCDu64, 0x12u64, 0x34u64];
        let packed = convert_base(&original, 8, 248);
        let packed_digits: Vec<u64> = packed
            .iter()
            .map(|d| d.to_u64_digits().first().copied().unwrap_or(0))
            .collect();
        let round_tripped = convert_base(&packed_digits, 248, 8);
        assert_eq!(&round_tripped[..original.len()], &original.map(BigUint::from)[..]);
    }

    #[test]
    fn convert_base_output_length_matches_ceiling_formula() {
        let bytes = vec![0u64; 160]; // AUD_PAD_LEN-sized byte vector
        let out = convert_base(&bytes, 8, 248);
        let expected_len = (bytes.len() as u64 * 8).div_ceil(248) as usize;
        assert_eq!(out.len(), expected_len);
    }
}
