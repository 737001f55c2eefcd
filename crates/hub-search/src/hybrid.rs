use std::sync::Arc;

use hub_repository::FileRepository;
use tracing::warn;

use crate::embedding::EmbeddingClient;
use crate::index::{HybridQueryRequest, LexicalQueryRequest, ScoredHit, SearchIndex};
use crate::SearchError;

/// Documents below this lexical score are dropped once we've fallen back
/// off the vector branch (spec.md §4.6 step 5).
pub const LEXICAL_FALLBACK_MIN_SCORE: f32 = 0.3;
/// `numCandidates` multiplier applied to `top_k` for the kNN branch.
const KNN_CANDIDATE_MULTIPLIER: usize = 30;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub fingerprint: String,
    pub filename: String,
    pub chunk_id: i64,
    pub text: String,
    pub score: f32,
}

/// Orchestrates C6: resolves a query into permissioned, filename-enriched
/// hits, degrading from vector+lexical to lexical-only when the embedding
/// service or the search store misbehaves.
pub struct HybridSearch<Idx, Emb, F> {
    index: Arc<Idx>,
    embedder: Arc<Emb>,
    files: Arc<F>,
}

impl<Idx, Emb, F> HybridSearch<Idx, Emb, F>
where
    Idx: SearchIndex,
    Emb: EmbeddingClient,
    F: FileRepository,
{
    pub fn new(index: Arc<Idx>, embedder: Arc<Emb>, files: Arc<F>) -> Self {
        Self { index, embedder, files }
    }

    pub async fn search_with_permission(
        &self,
        query: &str,
        owner: i64,
        effective_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let hits = match self.embedder.embed_one(query).await {
            Ok(vector) => self.hybrid_then_fallback(query, vector, owner, effective_tags, top_k).await?,
            Err(e) => {
                warn!(error = %e, "embedding failed, degrading to lexical-only search");
                self.lexical_only(query, owner, effective_tags, top_k).await?
            }
        };

        self.enrich(hits).await
    }

    /// Internal-diagnostics variant with no owner/tag scoping — callers
    /// must already be trusted (spec.md §4.6 "unauthenticated" note).
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, SearchError> {
        let vector = self.embedder.embed_one(query).await?;
        let req = HybridQueryRequest {
            query_text: query.to_string(),
            query_vector: vector,
            k: top_k * KNN_CANDIDATE_MULTIPLIER,
            owner: -1,
            effective_tags: Vec::new(),
            size: top_k,
        };
        let hits = self.index.hybrid_query(&req).await?;
        self.enrich(hits).await
    }

    async fn hybrid_then_fallback(
        &self,
        query: &str,
        vector: Vec<f32>,
        owner: i64,
        effective_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<ScoredHit>, SearchError> {
        let req = HybridQueryRequest {
            query_text: query.to_string(),
            query_vector: vector,
            k: top_k * KNN_CANDIDATE_MULTIPLIER,
            owner,
            effective_tags: effective_tags.to_vec(),
            size: top_k,
        };

        // one retry before giving up on the vector branch entirely
        match self.index.hybrid_query(&req).await {
            Ok(hits) => Ok(hits),
            Err(first) => {
                warn!(error = %first, "search store error, retrying once");
                match self.index.hybrid_query(&req).await {
                    Ok(hits) => Ok(hits),
                    Err(second) => {
                        warn!(error = %second, "search store still failing, degrading to lexical-only");
                        self.lexical_only(query, owner, effective_tags, top_k).await
                    }
                }
            }
        }
    }

    async fn lexical_only(
        &self,
        query: &str,
        owner: i64,
        effective_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<ScoredHit>, SearchError> {
        let req = LexicalQueryRequest {
            query_text: query.to_string(),
            owner,
            effective_tags: effective_tags.to_vec(),
            min_score: LEXICAL_FALLBACK_MIN_SCORE,
            size: top_k,
        };
        self.index.lexical_query(&req).await
    }

    async fn enrich(&self, hits: Vec<ScoredHit>) -> Result<Vec<SearchHit>, SearchError> {
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        let fingerprints: Vec<String> = hits.iter().map(|h| h.fingerprint.clone()).collect();
        let filenames = self.files.filenames_for(&fingerprints).await?;
        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                filename: filenames.get(&h.fingerprint).cloned().unwrap_or_default(),
                fingerprint: h.fingerprint,
                chunk_id: h.chunk_id,
                text: h.text,
                score: h.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hub_primitives::{FileRecord, SearchDocument};
    use hub_repository::memory::InMemoryRepository;
    use hub_repository::FileRepository;

    use super::*;
    use crate::index::InMemorySearchIndex;

    struct StubEmbedder {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
            if self.fail {
                return Err(SearchError::Embedding("stub failure".into()));
            }
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    fn doc(id: &str, fingerprint: &str, chunk_id: i64, text: &str, owner: i64, scope: &str, public: bool) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            fingerprint: fingerprint.to_string(),
            chunk_id,
            text: text.to_string(),
            vector: vec![1.0, 0.0, 0.0],
            model_tag: "test-model".to_string(),
            owner,
            scope_tag: scope.to_string(),
            is_public: public,
        }
    }

    #[tokio::test]
    async fn hybrid_search_returns_enriched_hits() {
        let index = Arc::new(InMemorySearchIndex::new());
        index
            .bulk_index(vec![doc("1", "fp1", 0, "rust async runtime", 7, "DEFAULT", true)])
            .await
            .unwrap();

        let repo = Arc::new(InMemoryRepository::new());
        repo.insert_uploading(FileRecord::new_uploading(
            "fp1".into(),
            7,
            "runtime.md".into(),
            1024,
            "DEFAULT".into(),
            true,
        ))
        .await
        .unwrap();

        let embedder = Arc::new(StubEmbedder { vector: vec![1.0, 0.0, 0.0], fail: false });
        let search = HybridSearch::new(index, embedder, repo);

        let hits = search.search_with_permission("rust runtime", 7, &["DEFAULT".into()], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "runtime.md");
    }

    #[tokio::test]
    async fn embedding_failure_falls_back_to_lexical_only() {
        let index = Arc::new(InMemorySearchIndex::new());
        index
            .bulk_index(vec![doc("1", "fp1", 0, "rust async runtime", 7, "DEFAULT", true)])
            .await
            .unwrap();
        let repo = Arc::new(InMemoryRepository::new());
        repo.insert_uploading(FileRecord::new_uploading(
            "fp1".into(),
            7,
            "runtime.md".into(),
            1024,
            "DEFAULT".into(),
            true,
        ))
        .await
        .unwrap();

        let embedder = Arc::new(StubEmbedder { vector: vec![], fail: true });
        let search = HybridSearch::new(index, embedder, repo);

        let hits = search.search_with_permission("rust runtime", 7, &["DEFAULT".into()], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn private_scope_hidden_from_other_users() {
        let index = Arc::new(InMemorySearchIndex::new());
        index
            .bulk_index(vec![doc("1", "fp1", 0, "secret rust notes", 7, "PRIVATE_alice", false)])
            .await
            .unwrap();
        let repo = Arc::new(InMemoryRepository::new());

        let embedder = Arc::new(StubEmbedder { vector: vec![1.0, 0.0, 0.0], fail: false });
        let search = HybridSearch::new(index, embedder, repo);

        let hits = search.search_with_permission("secret rust", 99, &["DEFAULT".into()], 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
