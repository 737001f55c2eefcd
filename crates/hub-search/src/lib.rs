//! Hybrid (vector + lexical) permissioned search, C6 of the knowledge hub.
//!
//! [`index::SearchIndex`] is the storage seam (a real deployment points it
//! at Elasticsearch/OpenSearch; [`index::InMemorySearchIndex`] backs tests),
//! [`embedding::EmbeddingClient`] is the model-serving seam, and
//! [`hybrid::HybridSearch`] wires the two together with the permission
//! filter and degraded-mode fallback described in spec.md §4.6.

pub mod doc_id;
mod error;
pub mod embedding;
pub mod hybrid;
pub mod index;

pub use doc_id::deterministic_id;
pub use embedding::{EmbeddingClient, HttpEmbeddingClient};
pub use error::SearchError;
pub use hybrid::{HybridSearch, SearchHit};
pub use index::{HybridQueryRequest, InMemorySearchIndex, LexicalQueryRequest, ScoredHit, SearchIndex};
