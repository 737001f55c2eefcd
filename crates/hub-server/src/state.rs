//! Application state: every component wired together, the way
//! `calimero-auth::server::AppState` bundles its `AuthService`/`Storage`/
//! `KeyManager` trio. The in-memory/local-filesystem backends are this
//! workspace's reference backend (the only relational/KV implementations
//! shipped; see `hub-kv`'s `rocksdb-backend` feature for the deployment
//! alternative).

use std::sync::Arc;

use hub_auth::{SessionStore, TagResolver};
use hub_chat::ChatOrchestrator;
use hub_ingest::{Embedder, IngestionWorker, MemoryGuard, ObjectStoreSource, ProcSelfStatmMonitor};
use hub_kv::MemoryKvStore;
use hub_objectstore::LocalObjectStore;
use hub_repository::memory::InMemoryRepository;
use hub_search::{HttpEmbeddingClient, HybridSearch, InMemorySearchIndex};
use hub_upload::{InMemoryBroker, TaskQueue, UploadCoordinator};
use tracing::info;

use crate::config::HubConfig;

pub type Kv = MemoryKvStore;
pub type Repo = InMemoryRepository;
pub type Objects = LocalObjectStore;
pub type Idx = InMemorySearchIndex;
pub type Emb = HttpEmbeddingClient;
pub type Model = hub_chat::HttpChatModelClient;
pub type Search = HybridSearch<Idx, Emb, Repo>;

pub struct AppState {
    pub config: HubConfig,
    pub repo: Arc<Repo>,
    pub objects: Arc<Objects>,
    pub sessions: Arc<SessionStore<Kv>>,
    pub tag_resolver: Arc<TagResolver<Repo>>,
    pub upload: Arc<UploadCoordinator<Kv, Repo, Repo, Repo, Objects>>,
    pub index: Arc<Idx>,
    pub search: Arc<Search>,
    pub chat: Arc<ChatOrchestrator<Kv, Search, Model>>,
}

impl AppState {
    /// Wires every component and spawns the ingestion worker pool
    /// (spec.md §5: "parallel consumers bound to a single broker consumer
    /// group"). Each worker owns its own `IngestionWorker` but shares the
    /// broker, repository, object store, and search index.
    pub async fn build(config: HubConfig) -> eyre::Result<Arc<Self>> {
        let kv = Arc::new(MemoryKvStore::new());
        let repo = Arc::new(InMemoryRepository::new());
        let objects = Arc::new(LocalObjectStore::new(
            config.storage.local_dir.clone(),
            config.storage.public_base_url.clone(),
        ));
        let broker: Arc<InMemoryBroker> = InMemoryBroker::new();

        let sessions = Arc::new(SessionStore::new(Arc::clone(&kv)));
        let tag_resolver = Arc::new(TagResolver::new(Arc::clone(&repo)));

        let upload = Arc::new(UploadCoordinator::new(
            Arc::clone(&kv),
            Arc::clone(&repo),
            Arc::clone(&repo),
            Arc::clone(&repo),
            Arc::clone(&objects),
            Arc::clone(&broker) as Arc<dyn TaskQueue>,
        ));

        let index = Arc::new(InMemorySearchIndex::new());
        let embedding_client = Arc::new(HttpEmbeddingClient::new(
            config.embedding.endpoint.clone(),
            config.embedding.model.clone(),
            config.embedding.dimension,
        ));
        let search = Arc::new(HybridSearch::new(
            Arc::clone(&index),
            Arc::clone(&embedding_client),
            Arc::clone(&repo),
        ));

        let model = Arc::new(Model::new(config.chat.model_endpoint.clone(), config.chat.model.clone()));
        let chat = Arc::new(ChatOrchestrator::new(
            Arc::clone(&kv),
            Arc::clone(&search),
            model,
            config.chat.system_prompt.clone(),
            config.chat.no_references_line.clone(),
            config.chat.completion_message.clone(),
        ));

        for worker_id in 0..config.ingestion.worker_count.max(1) {
            let source = Arc::new(ObjectStoreSource::new(Arc::clone(&objects)));
            let memory = MemoryGuard::new(ProcSelfStatmMonitor::new(), config.ingestion.memory_cap_bytes);
            let embedder = Embedder::new(Arc::clone(&repo), Arc::clone(&embedding_client), Arc::clone(&index));
            let worker = IngestionWorker::new(
                Arc::clone(&broker),
                source,
                Arc::clone(&repo),
                memory,
                config.ingestion.splitter_target_size,
                config.ingestion.embedding_model_tag.clone(),
                embedder,
            );
            tokio::spawn(async move {
                info!(worker_id, "ingestion worker started");
                worker.run().await;
            });
        }

        Ok(Arc::new(Self {
            config,
            repo,
            objects,
            sessions,
            tag_resolver,
            upload,
            index,
            search,
            chat,
        }))
    }
}
