use tracing::warn;

use crate::errors::StorageError;
use crate::models::Settings;
use crate::storage::keys;
use crate::storage::kv_store::KeyValueStore;

#[derive(Debug, Clone)]
pub struct SettingsRepository<S> {
    store: S,
    default_model: String,
}

impl<S: KeyValueStore> SettingsRepository<S> {
    pub fn new(store: S, default_model: impl Into<String>) -> Self {
        Self { store, default_model: default_model.into() }
    }

    /// Reads the saved settings, falling back to an empty key and the default
    /// model for anything missing or unreadable.
    pub fn load(&self) -> Settings {
        let api_key = self.read(keys::API_KEY).unwrap_or_default();
        let model = self
            .read(keys::MODEL)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.default_model.clone());
        Settings { api_key, model }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), StorageError> {
        self.store.set(keys::API_KEY, settings.api_key.trim())?;
        self.store.set(keys::MODEL, &settings.model)
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|e| {
            warn!("Failed to read setting '{key}': {e}");
            None
        })
    }
}
