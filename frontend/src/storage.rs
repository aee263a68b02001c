use ai_chat::errors::StorageError;
use ai_chat::storage::{KeyValueStore, MemoryStore};

/// `window.localStorage`.
#[derive(Clone)]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable {
            message: "no window".to_string(),
        })?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable { message: format!("{e:?}") })?
            .ok_or_else(|| StorageError::Unavailable {
                message: "localStorage is disabled".to_string(),
            })?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::read_failed(key, format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::write_failed(key, format!("{e:?}")))
    }
}

/// Profile storage, or memory when the browser refuses it (private mode,
/// sandboxed iframes). Nothing survives a reload in the latter case.
#[derive(Clone)]
pub enum BrowserStore {
    Local(LocalStorageStore),
    Memory(MemoryStore),
}

impl BrowserStore {
    pub fn open() -> Self {
        match LocalStorageStore::open() {
            Ok(store) => BrowserStore::Local(store),
            Err(e) => {
                log::error!("{e}; falling back to in-memory storage");
                BrowserStore::Memory(MemoryStore::new())
            }
        }
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            BrowserStore::Local(store) => store.get(key),
            BrowserStore::Memory(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            BrowserStore::Local(store) => store.set(key, value),
            BrowserStore::Memory(store) => store.set(key, value),
        }
    }
}
