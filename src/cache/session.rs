use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::store::KeyValueStore;
use crate::error::StoreError;
use crate::types::{LanguageEntry, TermForm};

const LAST_BOOK_KEY: &str = "session:last_book_id";
const LAST_LANGUAGE_KEY: &str = "session:last_language";
const TERM_DRAFT_PREFIX: &str = "term_form:";

/// Reader state that outlives the process: the last opened book, the last
/// language seen and term forms that have not reached the server yet.
#[derive(Clone)]
pub struct SessionState {
    store: Arc<dyn KeyValueStore>,
}

impl SessionState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        SessionState { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!(key, error = %e, "ignoring unreadable session value"))
            .ok()
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.store.put(key, serde_json::to_string(value)?)
    }

    pub fn last_book_id(&self) -> Option<u64> {
        self.read(LAST_BOOK_KEY)
    }

    pub fn set_last_book_id(&self, book_id: u64) -> Result<(), StoreError> {
        self.write(LAST_BOOK_KEY, &book_id)
    }

    pub fn last_language(&self) -> Option<LanguageEntry> {
        self.read(LAST_LANGUAGE_KEY)
    }

    pub fn set_last_language(&self, language: &LanguageEntry) -> Result<(), StoreError> {
        self.write(LAST_LANGUAGE_KEY, language)
    }

    pub fn term_draft(&self, term_id: u64) -> Option<TermForm> {
        self.read(&format!("{TERM_DRAFT_PREFIX}{term_id}"))
    }

    pub fn save_term_draft(&self, form: &TermForm) -> Result<(), StoreError> {
        self.write(&format!("{TERM_DRAFT_PREFIX}{}", form.term_id), form)
    }

    pub fn clear_term_draft(&self, term_id: u64) -> Result<(), StoreError> {
        self.store.remove(&format!("{TERM_DRAFT_PREFIX}{term_id}"))
    }

    /// Ids of every term with an unsent draft, ascending.
    pub fn pending_drafts(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .store
            .keys()
            .iter()
            .filter_map(|k| k.strip_prefix(TERM_DRAFT_PREFIX)?.parse().ok())
            .collect();
        ids.sort_unstable();
        ids
    }
}
