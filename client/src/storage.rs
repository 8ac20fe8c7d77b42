use gloo_storage::{LocalStorage, Storage};
use upbeat_shared::storage::{DraftStore, KeyValueStore};
use upbeat_shared::EngineConfig;

const SETTINGS_KEY: &str = "upbeat_settings";

/// Browser local storage holding plain strings (not JSON) so the keys stay
/// readable by other pages of the game.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if LocalStorage::raw().set_item(key, value).is_err() {
            web_sys::console::warn_1(&format!("local storage write failed for {key}").into());
        }
    }

    fn remove(&self, key: &str) {
        LocalStorage::raw().remove_item(key).ok();
    }

    fn keys(&self) -> Vec<String> {
        let raw = LocalStorage::raw();
        let len = raw.length().unwrap_or(0);
        (0..len)
            .filter_map(|index| raw.key(index).ok().flatten())
            .collect()
    }
}

pub fn drafts() -> DraftStore<LocalStore> {
    DraftStore::new(LocalStore)
}

/// Stored engine settings, falling back to defaults for missing or broken entries.
pub fn load_settings() -> EngineConfig {
    let mut config: EngineConfig = LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    config.sanitize();
    config
}

pub fn save_settings(config: &EngineConfig) {
    let _ = LocalStorage::set(SETTINGS_KEY, config);
}
