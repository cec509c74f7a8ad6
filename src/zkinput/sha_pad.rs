//! SHA-256 padding of the unsigned JWT (`header_b64 "." payload_b64`),
//! right-padded to a fixed witness length. The circuit runs SHA-256
//! compression internally over this buffer; the host only needs to
//! reproduce the padding bytes exactly.

/// Pads `unsigned_jwt` per the standard SHA-256 message-padding scheme,
/// then right-pads the result with zero bytes to `target_len`. Returns
/// `(padded_bytes, num_sha2_blocks)`.
pub fn sha256_pad(unsigned_jwt: &[u8], target_len: usize) -> (Vec<u8>, usize) {
    let bit_len = (unsigned_jwt.len() as u64) * 8;

    let mut padded = unsigned_jwt.to_vec();
    padded.push(0x80);
    while (padded.len() * 8) % 512 != 448 {
        padded.push(0);
    }
    padded.extend_from_slice(&bit_len.to_be_bytes());

    let num_blocks = (padded.len() * 8) / 512;
    padded.resize(target_len, 0);
    (padded, num_blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_512_bit_boundary_before_truncation() {
        let (_padded, num_blocks) = sha256_pad(b"hello world", 1600);
        assert_eq!(num_blocks, 1);
    }

    #[test]
    fn result_is_right_padded_to_target_len() {
        let (padded, _) = sha256_pad(b"x", 1600);
        assert_eq!(padded.len(), 1600);
        assert!(padded[64..].iter().all(|&b| b == 0));
    }

    #[test]
    fn longer_input_needs_two_blocks() {
        let long_input = vec![b'a'; 60];
        let (_padded, num_blocks) = sha256_pad(&long_input, 1600);
        assert_eq!(num_blocks, 2);
    }
}
