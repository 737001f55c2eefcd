//! Embedder & Indexer (C5): batch-embeds passages for a merged document and
//! bulk-indexes the resulting vectors with their permission fields
//! (spec.md §4.5).

use std::sync::Arc;

use hub_primitives::SearchDocument;
use hub_repository::PassageRepository;
use hub_search::{deterministic_id, EmbeddingClient, SearchIndex};
use tracing::info;

use crate::error::IngestError;

/// Passages are embedded in batches of at most this many texts
/// (spec.md §4.5 step 2).
pub const EMBED_BATCH_SIZE: usize = 100;

pub struct Embedder<Repo, Emb, Idx> {
    passages: Arc<Repo>,
    embedder: Arc<Emb>,
    index: Arc<Idx>,
}

impl<Repo, Emb, Idx> Embedder<Repo, Emb, Idx>
where
    Repo: PassageRepository,
    Emb: EmbeddingClient,
    Idx: SearchIndex,
{
    pub fn new(passages: Arc<Repo>, embedder: Arc<Emb>, index: Arc<Idx>) -> Self {
        Self { passages, embedder, index }
    }

    /// Fetch every passage for `fingerprint`, embed in batches, and bulk
    /// index. An empty passage list is a no-op (spec.md §4.5 invariants).
    pub async fn embed_and_index(&self, fingerprint: &str) -> Result<usize, IngestError> {
        let passages = self.passages.list_by_fingerprint(fingerprint).await?;
        if passages.is_empty() {
            info!(fingerprint, "no passages to embed, skipping");
            return Ok(0);
        }

        let mut indexed = 0usize;
        for batch in passages.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            let docs: Vec<SearchDocument> = batch
                .iter()
                .zip(vectors)
                .map(|(passage, vector)| SearchDocument {
                    id: deterministic_id(&passage.fingerprint, passage.chunk_id),
                    fingerprint: passage.fingerprint.clone(),
                    chunk_id: passage.chunk_id,
                    text: passage.text.clone(),
                    vector,
                    model_tag: passage.model_tag.clone(),
                    owner: passage.owner,
                    scope_tag: passage.scope_tag.clone(),
                    is_public: passage.is_public,
                })
                .collect();

            indexed += docs.len();
            self.index.bulk_index(docs).await?;
        }

        info!(fingerprint, indexed, "embedded and indexed passages");
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use hub_primitives::Passage;
    use hub_repository::memory::InMemoryRepository;
    use hub_repository::PassageRepository;
    use hub_search::{InMemorySearchIndex, SearchError};

    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    #[tokio::test]
    async fn embeds_and_indexes_every_passage() {
        let repo = Arc::new(InMemoryRepository::new());
        for i in 1..=3 {
            PassageRepository::insert(
                &*repo,
                Passage {
                    fingerprint: "fp1".into(),
                    chunk_id: i,
                    text: format!("passage {i}"),
                    model_tag: "test-model".into(),
                    owner: 7,
                    scope_tag: "DEFAULT".into(),
                    is_public: true,
                },
            )
            .await
            .unwrap();
        }

        let index = Arc::new(InMemorySearchIndex::new());
        let embedder = Embedder::new(repo, Arc::new(FixedEmbedder), index.clone());
        let count = embedder.embed_and_index("fp1").await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn empty_passage_list_is_a_no_op() {
        let repo = Arc::new(InMemoryRepository::new());
        let index = Arc::new(InMemorySearchIndex::new());
        let embedder = Embedder::new(repo, Arc::new(FixedEmbedder), index);
        let count = embedder.embed_and_index("missing-fp").await.unwrap();
        assert_eq!(count, 0);
    }
}
