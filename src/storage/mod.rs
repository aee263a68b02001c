pub mod conversation_store;
pub mod kv_store;
pub mod settings_repository;

pub use conversation_store::ConversationStore;
pub use kv_store::{KeyValueStore, MemoryStore};
pub use settings_repository::SettingsRepository;

/// Keys under which the client persists its state.
pub mod keys {
    pub const API_KEY: &str = "ai_chat_api_key";
    pub const MODEL: &str = "ai_chat_model";
    pub const MESSAGES: &str = "ai_chat_messages";
}
