//! Per-chat-session state: a growing response buffer, a cancel flag, and
//! the server-issued token a stop control frame must present (spec.md §4.8).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::RngCore;

pub struct ChatSessionState {
    pub buffer: Mutex<String>,
    pub cancel: AtomicBool,
    pub stop_token: String,
}

impl ChatSessionState {
    pub(crate) fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            buffer: Mutex::new(String::new()),
            cancel: AtomicBool::new(false),
            stop_token: hex::encode(bytes),
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn append(&self, text: &str) {
        self.buffer.lock().push_str(text);
    }

    pub fn take_buffer(&self) -> String {
        std::mem::take(&mut self.buffer.lock())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn verify_stop_token(&self, token: &str) -> bool {
        self.stop_token == token
    }
}

/// Process-local registry of active chat sessions, matching the chat
/// orchestrator's single-process scheduling model (spec.md §5).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<ChatSessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, session_handle: &str) -> Arc<ChatSessionState> {
        self.sessions
            .entry(session_handle.to_string())
            .or_insert_with(|| Arc::new(ChatSessionState::new()))
            .clone()
    }

    pub fn get(&self, session_handle: &str) -> Option<Arc<ChatSessionState>> {
        self.sessions.get(session_handle).map(|e| e.clone())
    }

    pub fn remove(&self, session_handle: &str) {
        self.sessions.remove(session_handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_existing_state() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("s1");
        a.append("hello");
        let b = registry.get_or_create("s1");
        assert_eq!(b.buffer_len(), 5);
    }

    #[test]
    fn stop_token_is_unique_per_session() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("s1");
        let b = registry.get_or_create("s2");
        assert_ne!(a.stop_token, b.stop_token);
    }

    #[test]
    fn remove_drops_state() {
        let registry = SessionRegistry::new();
        registry.get_or_create("s1");
        registry.remove("s1");
        assert!(registry.get("s1").is_none());
    }
}
