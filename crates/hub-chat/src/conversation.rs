//! Loads and persists a user's current [`Conversation`] in the fast KV
//! store with a sliding 7-day expiration (spec.md §4.8 step 1, step 6).

use std::sync::Arc;

use chrono::Duration;
use hub_kv::{deserialize, keys, serialize, KvStore};
use hub_primitives::Conversation;
use uuid::Uuid;

use crate::error::ChatError;

pub const CONVERSATION_TTL: Duration = Duration::days(7);

pub struct ConversationStore<K: KvStore> {
    kv: Arc<K>,
}

impl<K: KvStore> ConversationStore<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Load the owner's current conversation, creating a fresh one if none
    /// exists yet.
    pub async fn load_or_create(&self, owner: i64) -> Result<Conversation, ChatError> {
        let key = keys::conversation(owner);
        match self.kv.get(&key).await? {
            Some(bytes) => Ok(deserialize(&bytes)?),
            None => Ok(Conversation::new(Uuid::new_v4(), owner)),
        }
    }

    /// Persist the conversation and renew its sliding TTL.
    pub async fn save(&self, conversation: &Conversation) -> Result<(), ChatError> {
        let key = keys::conversation(conversation.owner);
        let value = serialize(conversation)?;
        self.kv.set_with_ttl(&key, &value, CONVERSATION_TTL).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hub_kv::MemoryKvStore;
    use hub_primitives::Message;

    use super::*;

    #[tokio::test]
    async fn round_trips_a_conversation() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = ConversationStore::new(kv);

        let mut conv = store.load_or_create(7).await.unwrap();
        assert!(conv.messages.is_empty());

        conv.push_and_truncate(Message::user("hi"));
        store.save(&conv).await.unwrap();

        let reloaded = store.load_or_create(7).await.unwrap();
        assert_eq!(reloaded.messages.len(), 1);
        assert_eq!(reloaded.id, conv.id);
    }

    #[tokio::test]
    async fn missing_conversation_creates_a_fresh_one() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = ConversationStore::new(kv);
        let conv = store.load_or_create(42).await.unwrap();
        assert_eq!(conv.owner, 42);
        assert!(conv.messages.is_empty());
    }
}
