//! A narrow seam over [`hub_search::HybridSearch`] so [`crate::orchestrator::ChatOrchestrator`]
//! doesn't have to carry `HybridSearch`'s three type parameters itself.

use async_trait::async_trait;
use hub_repository::FileRepository;
use hub_search::{EmbeddingClient, HybridSearch, SearchError, SearchHit, SearchIndex};

#[async_trait]
pub trait ChatSearch: Send + Sync + 'static {
    async fn search_with_permission(
        &self,
        query: &str,
        owner: i64,
        effective_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
impl<Idx, Emb, F> ChatSearch for HybridSearch<Idx, Emb, F>
where
    Idx: SearchIndex,
    Emb: EmbeddingClient,
    F: FileRepository,
{
    async fn search_with_permission(
        &self,
        query: &str,
        owner: i64,
        effective_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        HybridSearch::search_with_permission(self, query, owner, effective_tags, top_k).await
    }
}
