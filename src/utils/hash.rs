//! Hashing utilities

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`, used to identify object files byte for byte.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hasher.finalize();

    hash.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hex_distinguishes_inputs() {
        assert_ne!(sha256_hex(b"\x94\x21\xff\xf0"), sha256_hex(b"\x94\x21\xff\xe0"));
        assert_eq!(sha256_hex(b"").len(), 64);
    }
}
