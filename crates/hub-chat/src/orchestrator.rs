//! Chat Orchestrator (C8): one logical session per bidirectional stream,
//! grounding each turn in the hybrid search index and streaming the model
//! response back as wire frames (spec.md §4.8).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use hub_kv::KvStore;
use hub_primitives::Message;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::warn;

use crate::completion;
use crate::context::{build_reference_block, CONTEXT_TOP_K};
use crate::conversation::ConversationStore;
use crate::frames;
use crate::model::ChatModelClient;
use crate::request::{ChatRequest, GenerationParams};
use crate::search::ChatSearch;
use crate::session::SessionRegistry;

/// Delay before a cleared stop flag takes effect again (spec.md §4.8
/// cancellation note).
const STOP_FLAG_CLEAR_DELAY: Duration = Duration::from_secs(2);

pub struct ChatOrchestrator<K: KvStore, S, M> {
    conversations: ConversationStore<K>,
    search: Arc<S>,
    model: Arc<M>,
    sessions: Arc<SessionRegistry>,
    system_prompt: String,
    no_references_line: String,
    completion_message: String,
}

impl<K, S, M> ChatOrchestrator<K, S, M>
where
    K: KvStore,
    S: ChatSearch,
    M: ChatModelClient,
{
    pub fn new(
        kv: Arc<K>,
        search: Arc<S>,
        model: Arc<M>,
        system_prompt: impl Into<String>,
        no_references_line: impl Into<String>,
        completion_message: impl Into<String>,
    ) -> Self {
        Self {
            conversations: ConversationStore::new(kv),
            search,
            model,
            sessions: Arc::new(SessionRegistry::new()),
            system_prompt: system_prompt.into(),
            no_references_line: no_references_line.into(),
            completion_message: completion_message.into(),
        }
    }

    /// Returns the server-issued token the client must echo back in a stop
    /// control frame for `session_handle`.
    pub fn stop_token(&self, session_handle: &str) -> String {
        self.sessions.get_or_create(session_handle).stop_token.clone()
    }

    /// Spawns the turn and returns a channel the caller (the websocket
    /// handler in `hub-server`) forwards frames from.
    pub fn handle_message(
        self: &Arc<Self>,
        session_handle: String,
        user_id: i64,
        effective_tags: Vec<String>,
        message: String,
    ) -> mpsc::Receiver<Value>
    where
        K: 'static,
        S: 'static,
        M: 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run_turn(session_handle, user_id, effective_tags, message, tx).await;
        });
        rx
    }

    /// Handles an incoming `{"type":"stop",...}` control frame. Returns
    /// `None` if the session is unknown or the token doesn't match.
    pub fn request_stop(self: &Arc<Self>, session_handle: &str, token: &str) -> Option<Value> {
        let state = self.sessions.get(session_handle)?;
        if !state.verify_stop_token(token) {
            return None;
        }
        state.cancel.store(true, Ordering::SeqCst);

        let state_for_clear = state.clone();
        tokio::spawn(async move {
            sleep(STOP_FLAG_CLEAR_DELAY).await;
            state_for_clear.cancel.store(false, Ordering::SeqCst);
        });

        Some(frames::stop("generation stopped"))
    }

    async fn run_turn(
        &self,
        session_handle: String,
        user_id: i64,
        effective_tags: Vec<String>,
        message: String,
        tx: mpsc::Sender<Value>,
    ) {
        let state = self.sessions.get_or_create(&session_handle);

        let mut conversation = match self.conversations.load_or_create(user_id).await {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(frames::error(&e.to_string())).await;
                let _ = tx.send(frames::completion("failed to load conversation")).await;
                self.sessions.remove(&session_handle);
                return;
            }
        };

        let hits = self
            .search
            .search_with_permission(&message, user_id, &effective_tags, CONTEXT_TOP_K)
            .await
            .unwrap_or_default();
        let reference_block = build_reference_block(&hits, &self.no_references_line);

        let request = ChatRequest {
            system_prompt: self.system_prompt.clone(),
            reference_block,
            history: conversation.messages.clone(),
            user_message: message.clone(),
            params: GenerationParams::default(),
        };

        let mut stream = match self.model.stream(request).await {
            Ok(s) => s,
            Err(e) => {
                let _ = tx.send(frames::error(&e.to_string())).await;
                let _ = tx.send(frames::completion("chat model error")).await;
                self.sessions.remove(&session_handle);
                return;
            }
        };

        let stream_done = AtomicBool::new(false);

        let streaming = async {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(delta) if !delta.is_empty() => {
                        state.append(&delta);
                        if !state.is_cancelled() {
                            let _ = tx.send(frames::chunk(&delta)).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(frames::error(&e.to_string())).await;
                        break;
                    }
                }
            }
            stream_done.store(true, Ordering::SeqCst);
        };
        let waiting = completion::await_completion(&state, &stream_done);

        tokio::join!(streaming, waiting);

        let response_text = state.take_buffer();
        conversation.push_and_truncate(Message::user(message));
        conversation.push_and_truncate(Message::assistant(response_text));
        if let Err(e) = self.conversations.save(&conversation).await {
            warn!(error = %e, "failed to persist conversation after chat turn");
        }

        let _ = tx.send(frames::completion(&self.completion_message)).await;
        self.sessions.remove(&session_handle);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hub_kv::MemoryKvStore;
    use hub_search::SearchError;

    use super::*;
    use crate::model::ContentDeltaStream;

    struct EchoModel;

    #[async_trait]
    impl ChatModelClient for EchoModel {
        async fn stream(&self, request: ChatRequest) -> Result<ContentDeltaStream, ChatError> {
            let reply = format!("echo: {}", request.user_message);
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(reply)])))
        }
    }

    struct EmptySearch;

    #[async_trait]
    impl ChatSearch for EmptySearch {
        async fn search_with_permission(
            &self,
            _query: &str,
            _owner: i64,
            _effective_tags: &[String],
            _top_k: usize,
        ) -> Result<Vec<hub_search::SearchHit>, SearchError> {
            Ok(Vec::new())
        }
    }

    use crate::error::ChatError;

    #[tokio::test(start_paused = true)]
    async fn a_full_turn_streams_chunks_then_completes() {
        let kv = Arc::new(MemoryKvStore::new());
        let orchestrator = Arc::new(ChatOrchestrator::new(
            kv,
            Arc::new(EmptySearch),
            Arc::new(EchoModel),
            "system rules",
            "No references available.",
            "done",
        ));

        let mut rx = orchestrator.handle_message("sess-1".into(), 7, vec!["DEFAULT".into()], "hi".into());

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        assert!(frames.iter().any(|f| f.get("chunk").is_some()));
        assert!(frames.last().unwrap().get("type") == Some(&Value::String("completion".into())));
    }
}
