use sha2::{Digest, Sha256};

/// Derive a deterministic search-document id from `(fingerprint, chunkId)`
/// so that at-least-once ingestion retries overwrite rather than duplicate
/// the indexed document (spec.md §9).
pub fn deterministic_id(fingerprint: &str, chunk_id: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_id.to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(deterministic_id("fp", 3), deterministic_id("fp", 3));
        assert_ne!(deterministic_id("fp", 3), deterministic_id("fp", 4));
        assert_ne!(deterministic_id("fp", 3), deterministic_id("fp2", 3));
    }
}
