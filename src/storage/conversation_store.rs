use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::models::{Message, MessageRole};
use crate::storage::keys;
use crate::storage::kv_store::KeyValueStore;

/// Ordered, bounded conversation persisted as a single JSON array.
///
/// Truncation always drops from the oldest end.
#[derive(Debug, Clone)]
pub struct ConversationStore<S> {
    store: S,
    messages: Vec<Message>,
    max_saved: usize,
}

impl<S: KeyValueStore> ConversationStore<S> {
    pub fn new(store: S, max_saved: usize) -> Self {
        Self { store, messages: Vec::new(), max_saved }
    }

    /// Replaces the in-memory list with the persisted one and returns how many
    /// messages were restored.
    ///
    /// Anything unreadable restores nothing: a missing blob, invalid JSON, a
    /// non-array value, or entries that are not user/assistant text.
    pub fn load(&mut self) -> usize {
        self.messages.clear();

        let raw = match self.store.get(keys::MESSAGES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!("Failed to read saved conversation: {e}");
                return 0;
            }
        };

        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!("Saved conversation is not an array; ignoring it");
                return 0;
            }
            Err(e) => {
                warn!("Saved conversation is not valid JSON: {e}");
                return 0;
            }
        };

        let total = entries.len();
        let mut restored: Vec<Message> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<Message>(entry).ok())
            .filter(|m| m.role != MessageRole::System)
            .collect();
        self.truncate(&mut restored);

        debug!("Restored {} of {total} saved messages", restored.len());
        self.messages = restored;
        self.messages.len()
    }

    /// Drops the oldest messages beyond the cap and writes the list out.
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let mut messages = std::mem::take(&mut self.messages);
        self.truncate(&mut messages);
        self.messages = messages;

        let json = serde_json::to_string(&self.messages)?;
        self.store.set(keys::MESSAGES, &json)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The newest `count` messages, oldest first.
    pub fn recent(&self, count: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn truncate(&self, messages: &mut Vec<Message>) {
        if messages.len() > self.max_saved {
            let excess = messages.len() - self.max_saved;
            messages.drain(..excess);
        }
    }
}
