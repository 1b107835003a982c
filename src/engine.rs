//! The reading engine facade: one object the UI drives, one event stream
//! it listens to.
//!
//! All network work runs on spawned Tokio tasks or in `async` methods; no
//! method blocks its caller. `tap`, `refresh_highlights` and the popup
//! fetches spawn tasks, so they must be called from inside a runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{Clock, JsonFileStore, KeyValueStore, MetadataCache, SessionState, SystemClock};
use crate::client::{HttpReaderServer, ReaderServer};
use crate::config::ReaderConfig;
use crate::error::{SaveTermError, ServerError, SyncError};
use crate::events::{LanguageScope, ReaderEvent, ScrollPosition};
use crate::parsing::{parse_term_form, parse_term_popup, ContentParser, ParseDegradation};
use crate::reading::{group, styled_paragraph, InteractionIntent, StyledText, Tap, TermInteractionController};
use crate::sync::{AdvanceOutcome, PageCursor, PaginationSync, RetryPolicy};
use crate::types::{LanguageEntry, SentenceGroup, TermData, TermDetails, TermForm, TextContent};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct ReadingEngine {
    inner: Arc<Inner>,
}

struct Inner {
    server: Arc<dyn ReaderServer>,
    parser: ContentParser,
    pagination: PaginationSync,
    metadata: MetadataCache,
    session: SessionState,
    events: broadcast::Sender<ReaderEvent>,
    view: Mutex<ViewState>,
    language_timeout: Duration,
    batch_size: usize,
}

/// Everything the UI sees. Locked only for short synchronous sections,
/// never across an await.
struct ViewState {
    content: Option<Arc<TextContent>>,
    groups: Arc<Vec<SentenceGroup>>,
    revision: u64,
    controller: TermInteractionController,
    highlights_visible: bool,
    scroll: ScrollPosition,
    refresh_task: Option<AbortHandle>,
    expiry_task: Option<AbortHandle>,
}

impl ViewState {
    fn abort_tasks(&mut self) {
        for task in [self.refresh_task.take(), self.expiry_task.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl ReadingEngine {
    pub fn new(
        server: Arc<dyn ReaderServer>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &ReaderConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            parser: ContentParser::new(),
            pagination: PaginationSync::new(server.clone(), RetryPolicy::from(&config.mark_done)),
            metadata: MetadataCache::new(server.clone(), store.clone(), clock, &config.cache),
            session: SessionState::new(store),
            server,
            events,
            view: Mutex::new(ViewState {
                content: None,
                groups: Arc::new(Vec::new()),
                revision: 0,
                controller: TermInteractionController::new(config.double_tap_window()),
                highlights_visible: config.highlights_visible,
                scroll: ScrollPosition::default(),
                refresh_task: None,
                expiry_task: None,
            }),
            language_timeout: config.language_detect_timeout(),
            batch_size: config.enrichment_batch_size.max(1),
        };
        ReadingEngine { inner: Arc::new(inner) }
    }

    /// HTTP server at `config.server_url`, state in `config.state_file`.
    pub fn from_config(config: &ReaderConfig) -> Self {
        let server = Arc::new(HttpReaderServer::new(&config.server_url));
        let store = Arc::new(JsonFileStore::open(&config.state_file));
        Self::new(server, store, Arc::new(SystemClock), config)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: ReaderEvent) {
        // No subscribers is fine; the UI may not be listening yet.
        let _ = self.inner.events.send(event);
    }

    fn fail(&self, operation: &'static str, message: impl ToString) {
        self.emit(ReaderEvent::Failure { operation, message: message.to_string() });
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn pagination(&self) -> &PaginationSync {
        &self.inner.pagination
    }

    pub fn current_content(&self) -> Option<Arc<TextContent>> {
        self.inner.view.lock().content.clone()
    }

    pub fn sentence_groups(&self) -> Arc<Vec<SentenceGroup>> {
        self.inner.view.lock().groups.clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.view.lock().revision
    }

    pub fn highlights_visible(&self) -> bool {
        self.inner.view.lock().highlights_visible
    }

    pub fn scroll_position(&self) -> ScrollPosition {
        self.inner.view.lock().scroll
    }

    pub fn set_scroll_position(&self, scroll: ScrollPosition) {
        self.inner.view.lock().scroll = scroll;
    }

    /// One styled run per paragraph of the current page, painted with the
    /// current highlight visibility.
    pub fn styled_paragraphs(&self) -> Vec<StyledText> {
        let view = self.inner.view.lock();
        let Some(content) = &view.content else { return Vec::new() };
        content
            .paragraphs
            .iter()
            .map(|p| styled_paragraph(&p.segments, view.highlights_visible))
            .collect()
    }

    // ---- page loading ------------------------------------------------------

    /// Opens `book_id` at the page the server has as current.
    pub async fn open_book(&self, book_id: u64) -> Result<Arc<TextContent>, ServerError> {
        let markup = self.inner.server.open_current_page(book_id).await.inspect_err(|e| {
            self.fail("open_book", e);
        })?;
        if let Err(e) = self.inner.session.set_last_book_id(book_id) {
            warn!(book_id, error = %e, "could not remember last book");
        }
        Ok(self.install_page(book_id, &markup, 1))
    }

    /// Loads `page_num` of the open book.
    pub async fn load_page(&self, page_num: u32) -> Result<Arc<TextContent>, ServerError> {
        let book_id = self.inner.pagination.book_id();
        let markup = self.inner.server.fetch_page(book_id, page_num).await.inspect_err(|e| {
            self.fail("load_page", e);
        })?;
        Ok(self.install_page(book_id, &markup, page_num))
    }

    fn install_page(&self, book_id: u64, markup: &str, fallback_page_num: u32) -> Arc<TextContent> {
        let report = self.inner.parser.parse_with_diagnostics(markup, book_id, fallback_page_num);
        for degradation in &report.degradations {
            debug!(book_id, ?degradation, "page parse degraded");
        }
        let language_defaulted = report
            .degradations
            .iter()
            .any(|d| matches!(d, ParseDegradation::Defaulted { field: "language_id", .. }));
        let content = Arc::new(report.content);
        let meta = &content.metadata;

        self.inner.pagination.sync_with(meta);
        if !language_defaulted {
            self.inner.metadata.remember_book_language(book_id, meta.language_id);
            self.inner.metadata.remember_language_name(meta.language_id, &meta.language_name);
        }
        if !language_defaulted && !meta.language_name.trim().is_empty() {
            let entry = LanguageEntry { id: meta.language_id, name: meta.language_name.trim().to_string() };
            if let Err(e) = self.inner.session.set_last_language(&entry) {
                warn!(error = %e, "could not remember last language");
            }
        }

        let groups = Arc::new(group(&content));
        let revision = {
            let mut view = self.inner.view.lock();
            view.abort_tasks();
            view.controller.reset();
            view.revision += 1;
            view.content = Some(content.clone());
            view.groups = groups.clone();
            view.scroll = ScrollPosition::default();
            view.revision
        };
        info!(book_id, page = meta.page_num, of = meta.page_count, revision, "page loaded");
        self.emit(ReaderEvent::PageLoaded { revision, content: content.clone(), groups });
        content
    }

    // ---- pagination --------------------------------------------------------

    /// `Ok(false)` when already on the last page.
    pub async fn go_to_next(&self) -> Result<bool, ServerError> {
        let previous = self.inner.pagination.cursor();
        if !self.inner.pagination.go_to_next() {
            self.emit(ReaderEvent::NavigationBlocked { page_num: previous.page_num });
            return Ok(false);
        }
        self.load_moved_cursor(previous).await.map(|_| true)
    }

    /// `Ok(false)` when already on the first page.
    pub async fn go_to_previous(&self) -> Result<bool, ServerError> {
        let previous = self.inner.pagination.cursor();
        if !self.inner.pagination.go_to_previous() {
            self.emit(ReaderEvent::NavigationBlocked { page_num: previous.page_num });
            return Ok(false);
        }
        self.load_moved_cursor(previous).await.map(|_| true)
    }

    /// Loads the page the cursor was just moved to. If that fails, the
    /// cursor goes back to `previous`, the page still on screen.
    async fn load_moved_cursor(&self, previous: PageCursor) -> Result<Arc<TextContent>, ServerError> {
        let moved_to = self.inner.pagination.cursor();
        let loaded = self.load_page(moved_to.page_num).await;
        if loaded.is_err() && self.inner.pagination.restore(moved_to, previous) {
            debug!(page = moved_to.page_num, back_to = previous.page_num, "page load failed; cursor restored");
        }
        loaded
    }

    /// Marks the current page read and moves on. The page stays put on
    /// failure and the reason is both returned and broadcast.
    pub async fn mark_done_and_advance(&self, rest_known: bool) -> Result<AdvanceOutcome, SyncError> {
        let cursor = self.inner.pagination.cursor();
        let outcome = match self.inner.pagination.mark_done_and_advance(rest_known).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail("mark_done", &e);
                return Err(e);
            }
        };

        match outcome {
            AdvanceOutcome::Advanced { page_num } => {
                self.emit(ReaderEvent::PageMarkedDone {
                    book_id: cursor.book_id,
                    page_num: cursor.page_num,
                    next_page: page_num,
                });
                // Failure is already broadcast by load_page; the mark itself stuck.
                let _ = self.load_moved_cursor(cursor).await;
            }
            AdvanceOutcome::BookFinished => {
                if rest_known {
                    // The page's remaining terms just became known.
                    self.refresh_highlights();
                }
                self.emit(ReaderEvent::BookFinished { book_id: cursor.book_id });
            }
            AdvanceOutcome::Superseded => {
                debug!(book_id = cursor.book_id, page = cursor.page_num, "mark done outlived its page");
            }
        }
        Ok(outcome)
    }

    // ---- taps --------------------------------------------------------------

    /// Feeds a tap into the single/double tap state machine.
    pub fn tap(&self, tap: Tap) {
        let (intents, revision) = {
            let mut view = self.inner.view.lock();
            let Some(content) = view.content.clone() else { return };
            let intents = view.controller.on_tap(&content.paragraphs, tap, Instant::now());
            if let Some(task) = view.expiry_task.take() {
                task.abort();
            }
            let revision = view.revision;
            if let Some(deadline) = view.controller.pending_deadline() {
                let engine = self.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    engine.expire_tap(revision);
                });
                view.expiry_task = Some(handle.abort_handle());
            }
            (intents, revision)
        };
        for intent in intents {
            self.dispatch(intent, revision);
        }
    }

    fn expire_tap(&self, revision: u64) {
        let intent = {
            let mut view = self.inner.view.lock();
            if view.revision != revision {
                return;
            }
            view.expiry_task = None;
            view.controller.expire(Instant::now())
        };
        if let Some(intent) = intent {
            self.dispatch(intent, revision);
        }
    }

    fn is_current(&self, revision: u64) -> bool {
        self.inner.view.lock().revision == revision
    }

    fn dispatch(&self, intent: InteractionIntent, revision: u64) {
        match intent {
            InteractionIntent::ShowPopup(term) if term.term_id == 0 => {
                self.emit(ReaderEvent::ShowPopup { term, details: None });
            }
            InteractionIntent::ShowPopup(term) => {
                let engine = self.clone();
                tokio::spawn(async move { engine.show_popup(term, revision).await });
            }
            InteractionIntent::OpenEditor(term) => {
                let engine = self.clone();
                tokio::spawn(async move { engine.open_editor(term, revision).await });
            }
        }
    }

    async fn show_popup(&self, term: TermData, revision: u64) {
        let details = match self.inner.server.get_term_popup(term.term_id).await {
            Ok(markup) => parse_term_popup(&markup),
            Err(e) => {
                warn!(term_id = term.term_id, error = %e, "term popup fetch failed");
                return;
            }
        };
        let Some(details) = details else {
            warn!(term_id = term.term_id, "term popup had nothing to show");
            return;
        };
        if !self.is_current(revision) {
            debug!(term_id = term.term_id, "popup for a replaced page dropped");
            return;
        }
        self.emit(ReaderEvent::ShowPopup { term, details: Some(details) });
    }

    async fn open_editor(&self, term: TermData, revision: u64) {
        let form = if let Some(draft) = self.inner.session.term_draft(term.term_id).filter(|_| term.term_id > 0) {
            debug!(term_id = term.term_id, "editing unsent draft");
            draft
        } else if term.term_id == 0 {
            TermForm { text: term.term.clone(), translation: term.translation.clone(), ..Default::default() }
        } else {
            match self.inner.server.get_term_edit_page(term.term_id).await {
                Ok(markup) => parse_term_form(&markup, term.term_id),
                Err(e) => {
                    warn!(term_id = term.term_id, error = %e, "term edit page fetch failed");
                    return;
                }
            }
        };
        if !self.is_current(revision) {
            debug!(term_id = term.term_id, "editor for a replaced page dropped");
            return;
        }
        self.emit(ReaderEvent::OpenEditor { term, form });
    }

    // ---- highlights --------------------------------------------------------

    pub fn set_highlights_visible(&self, visible: bool) {
        self.inner.view.lock().highlights_visible = visible;
        self.emit(ReaderEvent::HighlightsToggled { visible });
    }

    /// Re-fetches the current page and patches term statuses in place.
    /// A refresh already in flight is aborted, and the result is dropped if
    /// the page changes before it lands.
    pub fn refresh_highlights(&self) -> JoinHandle<()> {
        let mut view = self.inner.view.lock();
        if let Some(task) = view.refresh_task.take() {
            task.abort();
        }
        let revision = view.revision;
        let scroll = view.scroll;
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = engine.run_highlight_refresh(revision, scroll).await {
                warn!(revision, error = %e, "highlight refresh failed");
            }
        });
        view.refresh_task = Some(handle.abort_handle());
        handle
    }

    async fn run_highlight_refresh(&self, revision: u64, scroll: ScrollPosition) -> Result<(), ServerError> {
        let Some(current) = self.current_content() else { return Ok(()) };
        let book_id = current.metadata.book_id;
        let page_num = current.metadata.page_num;
        let markup = self.inner.server.fetch_page(book_id, page_num).await?;
        let fresh = self.inner.parser.parse(&markup, book_id, page_num);

        let (content, changed) = {
            let mut view = self.inner.view.lock();
            let Some(shown) = view.content.clone() else { return Ok(()) };
            if view.revision != revision {
                debug!(revision, current = view.revision, "stale highlight refresh dropped");
                return Ok(());
            }
            let mut patched = (*shown).clone();
            let changed = patched.apply_term_updates(&shown.term_updates_from(&fresh));
            let patched = Arc::new(patched);
            view.groups = Arc::new(group(&patched));
            view.content = Some(patched.clone());
            view.scroll = scroll;
            view.refresh_task = None;
            (patched, changed)
        };
        debug!(revision, changed, "highlights refreshed");
        self.emit(ReaderEvent::HighlightsRefreshed { revision, content, changed, scroll });
        Ok(())
    }

    // ---- terms -------------------------------------------------------------

    /// Fetches popup details for `term_ids`, at most `enrichment_batch_size`
    /// requests at a time. Terms whose fetch or parse fails are left out.
    pub async fn enrich_terms(&self, term_ids: &[u64]) -> HashMap<u64, TermDetails> {
        let mut enriched = HashMap::new();
        for batch in term_ids.chunks(self.inner.batch_size) {
            let mut tasks = JoinSet::new();
            for &term_id in batch {
                let server = self.inner.server.clone();
                tasks.spawn(async move { (term_id, server.get_term_popup(term_id).await) });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((term_id, Ok(markup))) => {
                        if let Some(details) = parse_term_popup(&markup) {
                            enriched.insert(term_id, details);
                        }
                    }
                    Ok((term_id, Err(e))) => warn!(term_id, error = %e, "term enrichment failed"),
                    Err(e) => warn!(error = %e, "term enrichment task died"),
                }
            }
        }
        enriched
    }

    /// Saves `form` locally, then posts it. The local draft is dropped only
    /// once the server has accepted it.
    pub async fn save_term(&self, form: &TermForm) -> Result<(), SaveTermError> {
        if form.term_id == 0 {
            return Err(SaveTermError::MissingTermId(form.term_id));
        }
        if let Err(e) = self.inner.session.save_term_draft(form) {
            warn!(term_id = form.term_id, error = %e, "could not store term draft");
        }
        if let Err(source) = self.inner.server.save_term(form.term_id, form).await {
            self.fail("save_term", &source);
            return Err(SaveTermError::Server { term_id: form.term_id, source });
        }
        if let Err(e) = self.inner.session.clear_term_draft(form.term_id) {
            warn!(term_id = form.term_id, error = %e, "could not clear term draft");
        }
        self.emit(ReaderEvent::TermSaved { term_id: form.term_id });
        if self.current_content().is_some() {
            self.refresh_highlights();
        }
        Ok(())
    }

    /// Sends every stored draft again. Returns the ids that still failed.
    pub async fn retry_term_drafts(&self) -> Vec<u64> {
        let mut failed = Vec::new();
        for term_id in self.inner.session.pending_drafts() {
            let Some(form) = self.inner.session.term_draft(term_id) else { continue };
            if self.save_term(&form).await.is_err() {
                failed.push(term_id);
            }
        }
        failed
    }

    // ---- audio and language ------------------------------------------------

    /// Confirms the page's audio marker with the server. A network failure
    /// keeps whatever the page said.
    pub async fn check_audio(&self) -> bool {
        let Some(content) = self.current_content() else { return false };
        let book_id = content.metadata.book_id;
        let has_audio = match self.inner.server.test_audio_availability(book_id).await {
            Ok(available) => available,
            Err(e) => {
                debug!(book_id, error = %e, "audio check failed; keeping page marker");
                content.metadata.has_audio
            }
        };
        {
            let mut view = self.inner.view.lock();
            if let Some(shown) = view.content.as_mut() {
                if shown.metadata.book_id == book_id && shown.metadata.has_audio != has_audio {
                    Arc::make_mut(shown).metadata.has_audio = has_audio;
                }
            }
        }
        self.emit(ReaderEvent::AudioChecked { book_id, has_audio });
        has_audio
    }

    /// Language to scope word-count style queries to: the open book's, else
    /// the last opened book's, else all languages. Lookups that take longer
    /// than the configured timeout also give `All`.
    pub async fn effective_language(&self) -> LanguageScope {
        match tokio::time::timeout(self.inner.language_timeout, self.resolve_language()).await {
            Ok(scope) => scope,
            Err(_) => {
                warn!(timeout = ?self.inner.language_timeout, "language detection timed out");
                LanguageScope::All
            }
        }
    }

    async fn resolve_language(&self) -> LanguageScope {
        let open_book = self.current_content().map(|c| c.metadata.book_id);
        let candidates = open_book.into_iter().chain(self.inner.session.last_book_id());
        for book_id in candidates.filter(|&id| id > 0) {
            if let Some(id) = self.inner.metadata.language_for_book(book_id).await.value {
                let name = self.inner.metadata.language_name(id).await.value;
                return LanguageScope::Language { id, name };
            }
        }
        match self.inner.session.last_language() {
            Some(entry) if entry.id > 0 => LanguageScope::Language { id: entry.id, name: Some(entry.name) },
            _ => LanguageScope::All,
        }
    }

    /// Runs `query` once the effective language is known.
    pub async fn with_effective_language<F, Fut, T>(&self, query: F) -> T
    where
        F: FnOnce(LanguageScope) -> Fut,
        Fut: Future<Output = T>,
    {
        let scope = self.effective_language().await;
        query(scope).await
    }
}

