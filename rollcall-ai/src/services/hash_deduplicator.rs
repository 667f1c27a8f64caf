//! Hash deduplication for uploads
//!
//! Calculates the SHA-256 hash of file content and detects uploads whose
//! bytes already exist in the working set. File name and modification time
//! play no part in the comparison.

use rollcall_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Hash deduplication result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashResult {
    /// Unique hash - continue processing
    Unique(String),
    /// Duplicate hash found - drop the upload
    Duplicate(String),
}

/// Lower-case hex SHA-256 of a byte slice
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Calculate the content hash on the blocking pool
///
/// Hashing a multi-megabyte PDF is CPU work; keep it off the async workers.
pub async fn calculate_hash(content: Arc<[u8]>) -> Result<String> {
    let size = content.len();
    let hash = tokio::task::spawn_blocking(move || content_hash(&content))
        .await
        .map_err(|e| Error::Internal(format!("Hash calculation task failed: {}", e)))?;

    tracing::debug!(size_bytes = size, hash = %hash, "Calculated hash");
    Ok(hash)
}

/// Hash Deduplicator
///
/// Seeded with the hashes already in the working set; every unique hash it
/// sees is registered so duplicates within the same batch are caught too.
#[derive(Debug, Default)]
pub struct HashDeduplicator {
    seen: HashSet<String>,
}

impl HashDeduplicator {
    pub fn new(existing: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: existing.into_iter().collect(),
        }
    }

    /// Check a hash, registering it when unique
    pub fn check(&mut self, hash: String) -> HashResult {
        if self.seen.contains(&hash) {
            tracing::info!(hash = %hash, "Duplicate hash detected");
            HashResult::Duplicate(hash)
        } else {
            self.seen.insert(hash.clone());
            HashResult::Unique(hash)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_identical_bytes_identical_hash() {
        let a = content_hash(b"attendance sheet");
        let b = content_hash(b"attendance sheet");
        let c = content_hash(b"attendance sheet!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_calculate_hash_matches_sync() {
        let content: Arc<[u8]> = Arc::from(&b"some pdf bytes"[..]);
        let hash = calculate_hash(Arc::clone(&content)).await.unwrap();
        assert_eq!(hash, content_hash(&content));
    }

    #[test]
    fn test_deduplicator_catches_existing_and_same_batch() {
        let existing = content_hash(b"one");
        let mut dedup = HashDeduplicator::new(vec![existing.clone()]);

        assert_eq!(dedup.check(existing.clone()), HashResult::Duplicate(existing));

        let fresh = content_hash(b"two");
        assert_eq!(dedup.check(fresh.clone()), HashResult::Unique(fresh.clone()));
        assert_eq!(dedup.check(fresh.clone()), HashResult::Duplicate(fresh));
    }
}
