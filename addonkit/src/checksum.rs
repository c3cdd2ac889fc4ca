//! SHA-256 checksums for downloaded payloads.
//!
//! Payloads are held in memory between download and install, so these work
//! on byte slices rather than files.

use sha2::{Digest, Sha256};

/// Calculate the lowercase hexadecimal SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compare `data` against an expected hex digest.
///
/// Returns the actual digest on mismatch so callers can report it.
/// Comparison ignores case and surrounding whitespace.
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<(), String> {
    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(actual)
    }
}
