//! Content fingerprinting for upload dedup (§4.B).
//!
//! The fingerprint is computed over the raw uploaded bytes, never over
//! normalized or extracted text — two uploads of the same PDF fingerprint
//! identically even if text extraction later changes.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn differs_on_single_byte_change() {
        assert_ne!(fingerprint(b"report v1"), fingerprint(b"report v2"));
    }

    proptest! {
        #[test]
        fn deterministic_for_any_input(data: Vec<u8>) {
            prop_assert_eq!(fingerprint(&data), fingerprint(&data));
        }

        #[test]
        fn always_64_hex_chars(data: Vec<u8>) {
            let hash = fingerprint(&data);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
