use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::SessionError;

pub const PLAYER_KEY: &str = "player";
pub const LAND_KEY: &str = "land";
pub const SERVER_KEY: &str = "server";
pub const DRAFT_PREFIX: &str = "constructionPlan_";

/// Placeholder shown when neither a local draft nor a server plan exists.
pub const DEFAULT_PLAN_TEXT: &str = "Please input your construction plan";

/// Durable string key/value store (browser local storage in the client).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

/// Identity and map reference the game view needs before it can load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub player: String,
    pub land: String,
}

/// Typed access to the session keys and per-player drafts.
#[derive(Debug, Default)]
pub struct DraftStore<S> {
    store: S,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn draft_key(player: &str) -> String {
        format!("{DRAFT_PREFIX}{player}")
    }

    pub fn current_player(&self) -> Option<String> {
        non_empty(self.store.get(PLAYER_KEY))
    }

    pub fn current_land(&self) -> Option<String> {
        non_empty(self.store.get(LAND_KEY))
    }

    pub fn server_base(&self) -> Option<String> {
        non_empty(self.store.get(SERVER_KEY))
    }

    pub fn draft(&self, player: &str) -> Option<String> {
        non_empty(self.store.get(&Self::draft_key(player)))
    }

    /// An empty draft removes the entry.
    pub fn save_draft(&self, player: &str, text: &str) {
        let key = Self::draft_key(player);
        if text.is_empty() {
            self.store.remove(&key);
        } else {
            self.store.set(&key, text);
        }
    }

    pub fn session(&self) -> Result<Session, SessionError> {
        let player = self.current_player().ok_or(SessionError::MissingPlayer)?;
        let land = self.current_land().ok_or(SessionError::MissingMap)?;
        Ok(Session { player, land })
    }

    /// Forget the identity, map reference and every stored draft.
    pub fn clear_session(&self) {
        self.store.remove(PLAYER_KEY);
        self.store.remove(LAND_KEY);
        for key in self.store.keys() {
            if key.starts_with(DRAFT_PREFIX) {
                self.store.remove(&key);
            }
        }
        tracing::info!("session cleared");
    }
}

/// Text the editor opens with: the local draft, else the server's plan,
/// else a placeholder.
pub fn initial_plan_text(draft: Option<&str>, server_plan: Option<&str>) -> String {
    draft
        .filter(|text| !text.is_empty())
        .or(server_plan.filter(|text| !text.is_empty()))
        .unwrap_or(DEFAULT_PLAN_TEXT)
        .to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::default();
        for (key, value) in entries {
            store.set(key, value);
        }
        store
    }

    #[test]
    fn session_requires_player_then_map() {
        let drafts = DraftStore::new(MemoryStore::default());
        assert_eq!(drafts.session(), Err(SessionError::MissingPlayer));

        let drafts = DraftStore::new(store_with(&[(PLAYER_KEY, "alice")]));
        assert_eq!(drafts.session(), Err(SessionError::MissingMap));

        let drafts = DraftStore::new(store_with(&[(PLAYER_KEY, "alice"), (LAND_KEY, "land-1")]));
        assert_eq!(
            drafts.session(),
            Ok(Session {
                player: "alice".into(),
                land: "land-1".into()
            })
        );
    }

    #[test]
    fn empty_identity_counts_as_missing() {
        let drafts = DraftStore::new(store_with(&[(PLAYER_KEY, ""), (LAND_KEY, "land-1")]));
        assert_eq!(drafts.session(), Err(SessionError::MissingPlayer));
    }

    #[test]
    fn drafts_are_kept_per_player() {
        let drafts = DraftStore::new(MemoryStore::default());
        drafts.save_draft("alice", "invest 10");
        drafts.save_draft("bob", "move up");
        assert_eq!(drafts.draft("alice").as_deref(), Some("invest 10"));
        assert_eq!(drafts.draft("bob").as_deref(), Some("move up"));
        assert_eq!(DraftStore::<MemoryStore>::draft_key("bob"), "constructionPlan_bob");

        drafts.save_draft("alice", "");
        assert_eq!(drafts.draft("alice"), None);
        assert_eq!(drafts.draft("bob").as_deref(), Some("move up"));
    }

    #[test]
    fn clear_session_keeps_unrelated_keys() {
        let drafts = DraftStore::new(store_with(&[
            (PLAYER_KEY, "alice"),
            (LAND_KEY, "land-1"),
            (SERVER_KEY, "http://localhost:8080"),
        ]));
        drafts.save_draft("alice", "a");
        drafts.save_draft("bob", "b");

        drafts.clear_session();
        assert_eq!(drafts.session(), Err(SessionError::MissingPlayer));
        assert_eq!(drafts.current_land(), None);
        assert_eq!(drafts.draft("alice"), None);
        assert_eq!(drafts.draft("bob"), None);
        assert_eq!(
            drafts.server_base().as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn initial_text_prefers_draft_then_server() {
        assert_eq!(initial_plan_text(Some("draft"), Some("server")), "draft");
        assert_eq!(initial_plan_text(Some(""), Some("server")), "server");
        assert_eq!(initial_plan_text(None, None), DEFAULT_PLAN_TEXT);
    }
}
