//! Ingestion Worker (C4): consumes post-merge tasks, stream-parses the
//! merged object, runs the two-level splitter, and persists Passage rows.

use std::sync::{Arc, Mutex};

use hub_primitives::Passage;
use hub_repository::PassageRepository;
use hub_search::{EmbeddingClient, SearchIndex};
use hub_upload::{PostMergeTask, TaskConsumer, TaskQueue};
use tracing::{error, info, warn};

use crate::embedder::Embedder;
use crate::error::IngestError;
use crate::memory::{MemoryGuard, MemoryMonitor};
use crate::source::DocumentSource;
use crate::{parser, splitter};

/// Parent-buffer threshold before handing accumulated text to the child
/// splitter (spec.md §4.4 step 3).
pub const PARENT_BUFFER_MIN_SIZE: usize = 1024 * 1024;

/// Parses, splits and persists Passages for a merged document, then embeds
/// and indexes them in the same pass — the Embedder (C5) runs "immediately
/// after a successful parse within the same worker" (spec.md §4.5).
pub struct IngestionWorker<B, Src, Repo, Mon, Emb, Idx> {
    broker: Arc<B>,
    source: Arc<Src>,
    passages: Arc<Repo>,
    memory: MemoryGuard<Mon>,
    target_size: usize,
    model_tag: String,
    embedder: Embedder<Repo, Emb, Idx>,
}

impl<B, Src, Repo, Mon, Emb, Idx> IngestionWorker<B, Src, Repo, Mon, Emb, Idx>
where
    B: TaskConsumer + TaskQueue,
    Src: DocumentSource,
    Repo: PassageRepository,
    Mon: MemoryMonitor,
    Emb: EmbeddingClient,
    Idx: SearchIndex,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: Arc<B>,
        source: Arc<Src>,
        passages: Arc<Repo>,
        memory: MemoryGuard<Mon>,
        target_size: usize,
        model_tag: impl Into<String>,
        embedder: Embedder<Repo, Emb, Idx>,
    ) -> Self {
        Self {
            broker,
            source,
            passages,
            memory,
            target_size,
            model_tag: model_tag.into(),
            embedder,
        }
    }

    /// Runs until the broker's channel is closed. Any unhandled error is
    /// logged and the loop continues to the next task — broker redelivery
    /// (simulated here by re-enqueuing) is the recovery mechanism, not
    /// worker-level retry (spec.md §7).
    pub async fn run(&self) {
        while let Some(task) = self.broker.recv().await {
            match self.process(task.clone()).await {
                Ok(()) => {
                    if let Err(e) = self.embedder.embed_and_index(&task.fingerprint).await {
                        error!(error = %e, fingerprint = %task.fingerprint, "embed/index failed after parse");
                    }
                }
                Err(IngestError::MemoryPressure) => {
                    warn!(fingerprint = %task.fingerprint, "memory pressure, redelivering task");
                    if let Err(requeue_err) = self.broker.enqueue(task).await {
                        error!(error = %requeue_err, "failed to redeliver task after memory pressure");
                    }
                }
                Err(other) => {
                    error!(error = %other, fingerprint = %task.fingerprint, "ingestion task failed");
                }
            }
        }
        info!("ingestion worker stopped: broker channel closed");
    }

    pub async fn process(&self, task: PostMergeTask) -> Result<(), IngestError> {
        self.memory.check()?;

        let reader = self.source.open(&task.merged_url).await?;

        let parent_buffer = Mutex::new(String::new());
        let passages_text = Mutex::new(Vec::new());
        let target_size = self.target_size;

        parser::extract(
            reader,
            |chunk: &str| {
                let mut buf = parent_buffer.lock().unwrap();
                buf.push_str(chunk);
                if buf.len() >= PARENT_BUFFER_MIN_SIZE {
                    passages_text.lock().unwrap().extend(splitter::split(&buf, target_size));
                    buf.clear();
                }
            },
            || {
                let mut buf = parent_buffer.lock().unwrap();
                if !buf.is_empty() {
                    passages_text.lock().unwrap().extend(splitter::split(&buf, target_size));
                    buf.clear();
                }
            },
        )
        .await?;

        let texts = passages_text.into_inner().unwrap();
        info!(fingerprint = %task.fingerprint, passages = texts.len(), "parsed document into passages");

        for (offset, text) in texts.into_iter().enumerate() {
            let passage = Passage {
                fingerprint: task.fingerprint.clone(),
                chunk_id: offset as i64 + 1,
                text,
                model_tag: self.model_tag.clone(),
                owner: task.user_id,
                scope_tag: task.scope_tag.clone(),
                is_public: task.is_public,
            };
            self.passages.insert(passage).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use hub_objectstore::{LocalObjectStore, ObjectStore};
    use hub_repository::memory::InMemoryRepository;
    use hub_search::{InMemorySearchIndex, SearchError};
    use hub_upload::InMemoryBroker;

    use super::*;
    use crate::memory::ProcSelfStatmMonitor;
    use crate::source::ObjectStoreSource;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    #[tokio::test]
    async fn process_persists_one_passage_per_split() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost"));
        store
            .put("merged/doc.txt", b"Paragraph one.\n\nParagraph two.")
            .await
            .unwrap();

        let source = Arc::new(ObjectStoreSource::new(store));
        let passages = Arc::new(InMemoryRepository::new());
        let broker = InMemoryBroker::new();
        let memory = MemoryGuard::new(ProcSelfStatmMonitor::new(), u64::MAX);
        let embedder = Embedder::new(passages.clone(), Arc::new(FixedEmbedder), Arc::new(InMemorySearchIndex::new()));

        let worker = IngestionWorker::new(broker, source, passages.clone(), memory, 10_000, "test-model", embedder);

        let task = PostMergeTask {
            fingerprint: "fp1".into(),
            merged_url: "merged/doc.txt".into(),
            filename: "doc.txt".into(),
            user_id: 7,
            scope_tag: "DEFAULT".into(),
            is_public: true,
        };
        worker.process(task).await.unwrap();

        let stored = passages.list_by_fingerprint("fp1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].chunk_id, 1);
        assert!(stored[0].text.contains("Paragraph one."));
    }

    #[tokio::test]
    async fn memory_pressure_redelivers_via_the_broker() {
        struct AlwaysOverCap;
        impl MemoryMonitor for AlwaysOverCap {
            fn resident_bytes(&self) -> u64 {
                u64::MAX
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost"));
        store.put("merged/doc.txt", b"hello").await.unwrap();
        let source = Arc::new(ObjectStoreSource::new(store));
        let passages = Arc::new(InMemoryRepository::new());
        let broker = InMemoryBroker::new();
        let memory = MemoryGuard::new(AlwaysOverCap, 100);
        let embedder = Embedder::new(passages.clone(), Arc::new(FixedEmbedder), Arc::new(InMemorySearchIndex::new()));

        let worker = IngestionWorker::new(broker.clone(), source, passages, memory, 10_000, "test-model", embedder);

        let task = PostMergeTask {
            fingerprint: "fp1".into(),
            merged_url: "merged/doc.txt".into(),
            filename: "doc.txt".into(),
            user_id: 7,
            scope_tag: "DEFAULT".into(),
            is_public: true,
        };
        assert!(matches!(worker.process(task).await, Err(IngestError::MemoryPressure)));
    }
}
