//! SHA-256 content checksums

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lower-case hex SHA-256 of the exact bytes (64 characters)
pub fn checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Recompute and compare against an expected digest.
///
/// The expected value is trimmed and lower-cased first, so digests copied
/// from tools that print upper-case hex still match.
pub fn verify(content: &[u8], expected_hex: &str) -> bool {
    let expected = expected_hex.trim().to_ascii_lowercase();
    let actual = checksum(content);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Shape check only: 64 hex characters
pub fn is_checksum_format(value: &str) -> bool {
    let value = value.trim();
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
