use std::sync::Arc;

use hub_kv::{keys, KvStore};
use hub_primitives::ChunkRecord;
use hub_repository::ChunkRepository;

use crate::UploadError;

/// Deployment-constant chunk size. Not configurable per upload.
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

pub fn expected_chunk_count(total_size: u64) -> u64 {
    total_size.div_ceil(CHUNK_SIZE)
}

/// The two surfaces of the chunk ledger (spec.md §4.2): a KV-backed bitmap
/// and relational per-chunk metadata.
pub struct ChunkLedger<K: KvStore, C: ChunkRepository> {
    kv: Arc<K>,
    chunks: Arc<C>,
}

impl<K: KvStore, C: ChunkRepository> ChunkLedger<K, C> {
    pub fn new(kv: Arc<K>, chunks: Arc<C>) -> Self {
        Self { kv, chunks }
    }

    fn check_index(index: i64) -> Result<(), UploadError> {
        if index < 0 {
            return Err(UploadError::Validation(format!("chunk index {index} is negative")));
        }
        Ok(())
    }

    async fn load_bitmap(&self, user: i64, fingerprint: &str) -> Result<Vec<u8>, UploadError> {
        Ok(self
            .kv
            .get(&keys::upload_bitmap(user, fingerprint))
            .await?
            .unwrap_or_default())
    }

    pub async fn mark_uploaded(&self, user: i64, fingerprint: &str, index: i64) -> Result<(), UploadError> {
        Self::check_index(index)?;
        let mut bitmap = self.load_bitmap(user, fingerprint).await?;
        let byte = (index / 8) as usize;
        let bit = (index % 8) as u8;
        if bitmap.len() <= byte {
            bitmap.resize(byte + 1, 0);
        }
        bitmap[byte] |= 1 << bit;
        self.kv
            .set(&keys::upload_bitmap(user, fingerprint), &bitmap)
            .await?;
        Ok(())
    }

    pub async fn is_uploaded(&self, user: i64, fingerprint: &str, index: i64) -> Result<bool, UploadError> {
        Self::check_index(index)?;
        let bitmap = self.load_bitmap(user, fingerprint).await?;
        let byte = (index / 8) as usize;
        let bit = (index % 8) as u8;
        Ok(bitmap.get(byte).map(|b| b & (1 << bit) != 0).unwrap_or(false))
    }

    /// Single fetch of the raw bitmap, then a local scan over
    /// `[0, expected_chunks)` — O(1) network round trips regardless of the
    /// chunk count (spec.md §4.2 invariant).
    pub async fn list_uploaded(
        &self,
        user: i64,
        fingerprint: &str,
        total_size: u64,
    ) -> Result<Vec<i64>, UploadError> {
        let bitmap = self.load_bitmap(user, fingerprint).await?;
        let expected = expected_chunk_count(total_size) as i64;
        let mut out = Vec::new();
        for index in 0..expected {
            let byte = (index / 8) as usize;
            let bit = (index % 8) as u8;
            if bitmap.get(byte).map(|b| b & (1 << bit) != 0).unwrap_or(false) {
                out.push(index);
            }
        }
        Ok(out)
    }

    pub async fn save_chunk_meta(
        &self,
        fingerprint: &str,
        index: i64,
        chunk_fingerprint: &str,
        storage_path: &str,
    ) -> Result<(), UploadError> {
        Self::check_index(index)?;
        self.chunks
            .insert(ChunkRecord {
                fingerprint: fingerprint.to_string(),
                index,
                chunk_fingerprint: chunk_fingerprint.to_string(),
                storage_path: storage_path.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn has_chunk_meta(&self, fingerprint: &str, index: i64) -> Result<bool, UploadError> {
        let chunks = self.chunks.list_by_fingerprint(fingerprint).await?;
        Ok(chunks.iter().any(|c| c.index == index))
    }

    pub async fn delete_bitmap(&self, user: i64, fingerprint: &str) -> Result<(), UploadError> {
        self.kv.delete(&keys::upload_bitmap(user, fingerprint)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_kv::MemoryKvStore;
    use hub_repository::memory::InMemoryRepository;

    fn ledger() -> ChunkLedger<MemoryKvStore, InMemoryRepository> {
        ChunkLedger::new(Arc::new(MemoryKvStore::new()), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn mark_then_is_uploaded() {
        let ledger = ledger();
        ledger.mark_uploaded(1, "fp", 3).await.unwrap();
        assert!(ledger.is_uploaded(1, "fp", 3).await.unwrap());
        assert!(!ledger.is_uploaded(1, "fp", 4).await.unwrap());
    }

    #[tokio::test]
    async fn negative_index_is_rejected() {
        let ledger = ledger();
        assert!(matches!(
            ledger.mark_uploaded(1, "fp", -1).await,
            Err(UploadError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn list_uploaded_returns_marked_indices_in_range() {
        let ledger = ledger();
        ledger.mark_uploaded(1, "fp", 0).await.unwrap();
        ledger.mark_uploaded(1, "fp", 2).await.unwrap();
        // 12 MiB total => 3 expected chunks (indices 0,1,2)
        let listed = ledger.list_uploaded(1, "fp", 12 * 1024 * 1024).await.unwrap();
        assert_eq!(listed, vec![0, 2]);
    }

    #[test]
    fn expected_chunk_count_rounds_up() {
        assert_eq!(expected_chunk_count(12 * 1024 * 1024), 3);
        assert_eq!(expected_chunk_count(10 * 1024 * 1024), 2);
        assert_eq!(expected_chunk_count(1), 1);
    }
}
