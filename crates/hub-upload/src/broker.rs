use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::UploadError;

/// The task handed from the Upload Coordinator to the Ingestion Worker on
/// a successful merge (spec.md §4.3 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMergeTask {
    pub fingerprint: String,
    pub merged_url: String,
    pub filename: String,
    pub user_id: i64,
    pub scope_tag: String,
    pub is_public: bool,
}

#[async_trait]
pub trait TaskQueue: Send + Sync + 'static {
    async fn enqueue(&self, task: PostMergeTask) -> Result<(), UploadError>;
}

#[async_trait]
pub trait TaskConsumer: Send + Sync + 'static {
    /// Pull the next task, or `None` if the queue has been closed.
    async fn recv(&self) -> Option<PostMergeTask>;
}

/// An in-process broker standing in for the "message-broker client" listed
/// as external in spec.md §1. Multiple consumers calling `recv` compete for
/// the same underlying channel, approximating a single consumer group.
pub struct InMemoryBroker {
    sender: mpsc::UnboundedSender<PostMergeTask>,
    receiver: Mutex<mpsc::UnboundedReceiver<PostMergeTask>>,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            sender,
            receiver: Mutex::new(receiver),
        })
    }
}

#[async_trait]
impl TaskQueue for InMemoryBroker {
    async fn enqueue(&self, task: PostMergeTask) -> Result<(), UploadError> {
        self.sender
            .send(task)
            .map_err(|e| UploadError::Queue(e.to_string()))
    }
}

#[async_trait]
impl TaskConsumer for InMemoryBroker {
    async fn recv(&self) -> Option<PostMergeTask> {
        self.receiver.lock().await.recv().await
    }
}
