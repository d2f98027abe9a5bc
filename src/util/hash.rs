//! Checksums for downloaded source archives.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

/// Compute the hex SHA-256 of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify downloaded bytes against an expected hex digest (case-insensitive).
pub fn verify_sha256(data: &[u8], expected: &str, what: &str) -> Result<()> {
    let actual = sha256_bytes(data);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "checksum mismatch for {}:\n  expected: {}\n  actual:   {}",
            what,
            expected,
            actual
        );
    }
    tracing::debug!("Checksum verified for {}: {}", what, &actual[..16]);
    Ok(())
}
