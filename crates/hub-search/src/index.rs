use std::collections::HashMap;

use async_trait::async_trait;
use hub_primitives::SearchDocument;
use parking_lot::RwLock;

use crate::SearchError;

#[derive(Debug, Clone)]
pub struct HybridQueryRequest {
    pub query_text: String,
    pub query_vector: Vec<f32>,
    /// `numCandidates` for the kNN branch, conventionally `30 * top_k`.
    pub k: usize,
    pub owner: i64,
    pub effective_tags: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct LexicalQueryRequest {
    pub query_text: String,
    pub owner: i64,
    pub effective_tags: Vec<String>,
    pub min_score: f32,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub fingerprint: String,
    pub chunk_id: i64,
    pub text: String,
    pub score: f32,
    pub owner: i64,
    pub scope_tag: String,
    pub is_public: bool,
}

#[async_trait]
pub trait SearchIndex: Send + Sync + 'static {
    /// Upsert by id — retries of an at-least-once ingestion overwrite
    /// rather than duplicate, since ids are derived deterministically
    /// (spec.md §9).
    async fn bulk_index(&self, docs: Vec<SearchDocument>) -> Result<(), SearchError>;

    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), SearchError>;

    /// kNN + lexical `must` + permission `filter` + AND rescore, per
    /// spec.md §4.6 step 3.
    async fn hybrid_query(&self, req: &HybridQueryRequest) -> Result<Vec<ScoredHit>, SearchError>;

    /// The degraded path: drop the kNN branch, keep the permission filter,
    /// apply `min_score` (spec.md §4.6 step 5).
    async fn lexical_query(&self, req: &LexicalQueryRequest) -> Result<Vec<ScoredHit>, SearchError>;
}

fn permission_matches(owner: i64, scope_tag: &str, is_public: bool, caller: i64, effective_tags: &[String]) -> bool {
    is_public || owner == caller || effective_tags.iter().any(|t| t == scope_tag)
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// `match` score approximation: the fraction of query tokens present in the
/// document text (an OR-style match).
fn lexical_match_score(text: &str, tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let matched = tokens.iter().filter(|t| lower.contains(t.as_str())).count();
    matched as f32 / tokens.len() as f32
}

/// `operator=AND` rescore score: 1.0 if every query token is present, else 0.
fn lexical_and_score(text: &str, tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    if tokens.iter().all(|t| lower.contains(t.as_str())) {
        1.0
    } else {
        0.0
    }
}

/// An in-process search index used in tests and as the default backend
/// before a real Elasticsearch/OpenSearch client is wired up (out of scope
/// per spec.md §1) — it implements the same kNN + lexical + rescore shape
/// the real index exposes, over a `RwLock<HashMap>` instead of a cluster.
#[derive(Default)]
pub struct InMemorySearchIndex {
    docs: RwLock<HashMap<String, SearchDocument>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn bulk_index(&self, docs: Vec<SearchDocument>) -> Result<(), SearchError> {
        let mut store = self.docs.write();
        for doc in docs {
            store.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<(), SearchError> {
        self.docs.write().retain(|_, d| d.fingerprint != fingerprint);
        Ok(())
    }

    async fn hybrid_query(&self, req: &HybridQueryRequest) -> Result<Vec<ScoredHit>, SearchError> {
        let tokens = query_tokens(&req.query_text);
        let store = self.docs.read();

        let mut candidates: Vec<(f32, &SearchDocument)> = store
            .values()
            .filter(|d| permission_matches(d.owner, &d.scope_tag, d.is_public, req.owner, &req.effective_tags))
            .filter_map(|d| {
                let lexical = lexical_match_score(&d.text, &tokens);
                if lexical <= 0.0 {
                    return None;
                }
                let vector_score = cosine(&req.query_vector, &d.vector);
                Some((vector_score + lexical, d))
            })
            .collect();

        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(req.k.max(1));

        let mut rescored: Vec<(f32, &SearchDocument)> = candidates
            .into_iter()
            .map(|(base, d)| {
                let and_score = lexical_and_score(&d.text, &tokens);
                (base * 0.2 + and_score * 1.0, d)
            })
            .collect();
        rescored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        rescored.truncate(req.size);

        Ok(rescored
            .into_iter()
            .map(|(score, d)| ScoredHit {
                fingerprint: d.fingerprint.clone(),
                chunk_id: d.chunk_id,
                text: d.text.clone(),
                score,
                owner: d.owner,
                scope_tag: d.scope_tag.clone(),
                is_public: d.is_public,
            })
            .collect())
    }

    async fn lexical_query(&self, req: &LexicalQueryRequest) -> Result<Vec<ScoredHit>, SearchError> {
        let tokens = query_tokens(&req.query_text);
        let store = self.docs.read();

        let mut hits: Vec<(f32, &SearchDocument)> = store
            .values()
            .filter(|d| permission_matches(d.owner, &d.scope_tag, d.is_public, req.owner, &req.effective_tags))
            .filter_map(|d| {
                let score = lexical_match_score(&d.text, &tokens);
                (score >= req.min_score).then_some((score, d))
            })
            .collect();

        hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(req.size);

        Ok(hits
            .into_iter()
            .map(|(score, d)| ScoredHit {
                fingerprint: d.fingerprint.clone(),
                chunk_id: d.chunk_id,
                text: d.text.clone(),
                score,
                owner: d.owner,
                scope_tag: d.scope_tag.clone(),
                is_public: d.is_public,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, fingerprint: &str, text: &str, owner: i64, scope: &str, public: bool, vector: Vec<f32>) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            fingerprint: fingerprint.to_string(),
            chunk_id: 0,
            text: text.to_string(),
            vector,
            model_tag: "test-model".to_string(),
            owner,
            scope_tag: scope.to_string(),
            is_public: public,
        }
    }

    #[tokio::test]
    async fn bulk_index_upserts_by_id() {
        let index = InMemorySearchIndex::new();
        index
            .bulk_index(vec![doc("1", "fp", "first version", 1, "DEFAULT", true, vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .bulk_index(vec![doc("1", "fp", "second version", 1, "DEFAULT", true, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(index.docs.read().len(), 1);
        assert_eq!(index.docs.read().get("1").unwrap().text, "second version");
    }

    #[tokio::test]
    async fn hybrid_query_respects_permission_filter() {
        let index = InMemorySearchIndex::new();
        index
            .bulk_index(vec![
                doc("1", "fp1", "rust async runtime", 1, "DEFAULT", true, vec![1.0, 0.0]),
                doc("2", "fp2", "rust async runtime", 2, "PRIVATE_bob", false, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let req = HybridQueryRequest {
            query_text: "rust runtime".to_string(),
            query_vector: vec![1.0, 0.0],
            k: 30,
            owner: 1,
            effective_tags: vec!["DEFAULT".to_string()],
            size: 10,
        };
        let hits = index.hybrid_query(&req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fingerprint, "fp1");
    }

    #[tokio::test]
    async fn lexical_query_drops_hits_below_min_score() {
        let index = InMemorySearchIndex::new();
        index
            .bulk_index(vec![doc("1", "fp1", "rust async runtime", 1, "DEFAULT", true, vec![])])
            .await
            .unwrap();

        let req = LexicalQueryRequest {
            query_text: "rust completely unrelated terms".to_string(),
            owner: 1,
            effective_tags: vec!["DEFAULT".to_string()],
            min_score: 0.5,
            size: 10,
        };
        let hits = index.lexical_query(&req).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_by_fingerprint_removes_all_chunks() {
        let index = InMemorySearchIndex::new();
        index
            .bulk_index(vec![
                doc("1", "fp1", "a", 1, "DEFAULT", true, vec![]),
                doc("2", "fp1", "b", 1, "DEFAULT", true, vec![]),
                doc("3", "fp2", "c", 1, "DEFAULT", true, vec![]),
            ])
            .await
            .unwrap();
        index.delete_by_fingerprint("fp1").await.unwrap();
        assert_eq!(index.docs.read().len(), 1);
    }
}
