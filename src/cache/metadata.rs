//! Book→language and language→name lookups over the shared `TtlCache`.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::store::KeyValueStore;
use super::ttl_cache::{Clock, Lookup, TtlCache};
use crate::client::ReaderServer;
use crate::config::CacheConfig;
use crate::error::ServerError;
use crate::parsing::{parse_book_edit_page, parse_language_index};

pub struct MetadataCache {
    server: Arc<dyn ReaderServer>,
    book_language: TtlCache<u64, u32>,
    language_names: TtlCache<u32, String>,
}

impl MetadataCache {
    pub fn new(
        server: Arc<dyn ReaderServer>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
    ) -> Self {
        MetadataCache {
            server,
            book_language: TtlCache::new(
                "book_language",
                Duration::from_secs(config.book_language_ttl_secs),
                store.clone(),
                clock.clone(),
            ),
            language_names: TtlCache::new(
                "language_name",
                Duration::from_secs(config.language_name_ttl_secs),
                store,
                clock,
            ),
        }
    }

    /// Language id of `book_id`, fetched from the book's edit page on a miss.
    pub async fn language_for_book(&self, book_id: u64) -> Lookup<u32> {
        let server = &self.server;
        self.book_language
            .get_or_fetch(&book_id, || async move {
                let markup = server.fetch_book_edit_page(book_id).await?;
                parse_book_edit_page(&markup)
                    .language_id
                    .ok_or_else(|| ServerError::Rejected {
                        status: 200,
                        message: format!("book {book_id} edit page names no language"),
                    })
            })
            .await
    }

    /// Display name for `language_id`. A miss fetches the whole language
    /// table and caches every row, not only the one asked for.
    pub async fn language_name(&self, language_id: u32) -> Lookup<String> {
        let server = &self.server;
        let names = &self.language_names;
        names
            .get_or_fetch(&language_id, || async move {
                let markup = server.fetch_language_index().await?;
                let entries = parse_language_index(&markup);
                debug!(count = entries.len(), "language index fetched");
                let mut wanted = None;
                for entry in entries {
                    if entry.id == language_id {
                        wanted = Some(entry.name.clone());
                    }
                    names.put(entry.id, entry.name);
                }
                wanted.ok_or_else(|| ServerError::Rejected {
                    status: 200,
                    message: format!("language {language_id} not in index"),
                })
            })
            .await
    }

    /// Records what a page told us, so later lookups skip the edit page.
    pub fn remember_book_language(&self, book_id: u64, language_id: u32) {
        if language_id > 0 {
            self.book_language.put(book_id, language_id);
        }
    }

    pub fn remember_language_name(&self, language_id: u32, name: &str) {
        if language_id > 0 && !name.trim().is_empty() {
            self.language_names.put(language_id, name.trim().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::cache::ttl_cache::{CacheSource, ManualClock};
    use crate::types::TermForm;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct IndexServer {
        index_calls: AtomicUsize,
        book_calls: AtomicUsize,
    }

    #[async_trait]
    impl ReaderServer for IndexServer {
        async fn fetch_page(&self, _: u64, _: u32) -> Result<String, ServerError> {
            unreachable!()
        }
        async fn open_current_page(&self, _: u64) -> Result<String, ServerError> {
            unreachable!()
        }
        async fn get_term_popup(&self, _: u64) -> Result<String, ServerError> {
            unreachable!()
        }
        async fn get_term_edit_page(&self, _: u64) -> Result<String, ServerError> {
            unreachable!()
        }
        async fn save_term(&self, _: u64, _: &TermForm) -> Result<(), ServerError> {
            unreachable!()
        }
        async fn mark_page_read(&self, _: u64, _: u32, _: bool) -> Result<(), ServerError> {
            unreachable!()
        }
        async fn fetch_language_index(&self) -> Result<String, ServerError> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"<a href="/language/edit/1">English</a><a href="/language/edit/3">Spanish</a>"#.into())
        }
        async fn fetch_book_edit_page(&self, book_id: u64) -> Result<String, ServerError> {
            self.book_calls.fetch_add(1, Ordering::SeqCst);
            match book_id {
                7 => Ok(r#"<input id="title" value="Niebla"><input name="language_id" value="3">"#.into()),
                _ => Err(ServerError::Network("connection refused".into())),
            }
        }
        async fn test_audio_availability(&self, _: u64) -> Result<bool, ServerError> {
            unreachable!()
        }
    }

    fn metadata() -> (MetadataCache, Arc<IndexServer>, Arc<ManualClock>) {
        let server = Arc::new(IndexServer::default());
        let clock = Arc::new(ManualClock::new(0));
        let cache = MetadataCache::new(server.clone(), Arc::new(MemoryStore::new()), clock.clone(), &CacheConfig::default());
        (cache, server, clock)
    }

    #[tokio::test]
    async fn one_index_fetch_fills_every_name() {
        let (cache, server, _) = metadata();
        assert_eq!(cache.language_name(3).await.value.as_deref(), Some("Spanish"));
        let english = cache.language_name(1).await;
        assert_eq!(english.value.as_deref(), Some("English"));
        assert_eq!(english.source, CacheSource::Memory);
        assert_eq!(server.index_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn book_language_ttl_is_five_minutes() {
        let (cache, server, clock) = metadata();
        assert_eq!(cache.language_for_book(7).await.value, Some(3));
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.language_for_book(7).await.source, CacheSource::Memory);
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.language_for_book(7).await.source, CacheSource::Network);
        assert_eq!(server.book_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_language_and_failed_book_are_unavailable() {
        let (cache, _, _) = metadata();
        assert_eq!(cache.language_name(42).await.source, CacheSource::Unavailable);
        assert_eq!(cache.language_for_book(8).await.value, None);
    }
}
