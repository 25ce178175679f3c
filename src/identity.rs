use sha2::{Digest, Sha256};

/// Stable identifier for a listing URL or a resolved search URL.
///
/// Lowercase hex SHA-256 of the UTF-8 bytes, so the value is the same on every
/// platform and across runs.
pub fn content_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
