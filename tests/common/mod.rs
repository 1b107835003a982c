#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use readweave::cache::{ManualClock, MemoryStore};
use readweave::client::ReaderServer;
use readweave::error::ServerError;
use readweave::types::TermForm;
use readweave::{ReaderConfig, ReaderEvent, ReadingEngine};

/// In-memory server whose answers, delays and failures are set per test.
#[derive(Default)]
pub struct ScriptedServer {
    pub pages: Mutex<HashMap<(u64, u32), String>>,
    pub page_delays: Mutex<HashMap<(u64, u32), Duration>>,
    pub current_page: Mutex<HashMap<u64, u32>>,
    pub popups: Mutex<HashMap<u64, String>>,
    pub popup_delay: Mutex<Duration>,
    pub edit_pages: Mutex<HashMap<u64, String>>,
    pub book_edit_pages: Mutex<HashMap<u64, String>>,
    pub book_edit_delay: Mutex<Duration>,
    pub language_index: Mutex<String>,
    pub mark_failures: Mutex<VecDeque<ServerError>>,
    pub save_failures: Mutex<VecDeque<ServerError>>,
    pub audio: Mutex<Option<Result<bool, ServerError>>>,

    pub marked: Mutex<Vec<(u64, u32, bool)>>,
    pub saved: Mutex<Vec<TermForm>>,
    pub popup_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_book(book_id: u64, pages: Vec<String>, current: u32) -> Arc<Self> {
        let server = Self::default();
        for (i, markup) in pages.into_iter().enumerate() {
            server.pages.lock().insert((book_id, i as u32 + 1), markup);
        }
        server.current_page.lock().insert(book_id, current);
        Arc::new(server)
    }

    fn page(&self, book_id: u64, page_num: u32) -> Result<String, ServerError> {
        self.pages
            .lock()
            .get(&(book_id, page_num))
            .cloned()
            .ok_or(ServerError::Rejected { status: 404, message: "no such page".into() })
    }
}

#[async_trait]
impl ReaderServer for ScriptedServer {
    async fn fetch_page(&self, book_id: u64, page_num: u32) -> Result<String, ServerError> {
        let delay = self.page_delays.lock().get(&(book_id, page_num)).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.page(book_id, page_num)
    }

    async fn open_current_page(&self, book_id: u64) -> Result<String, ServerError> {
        let page_num = self.current_page.lock().get(&book_id).copied().unwrap_or(1);
        self.page(book_id, page_num)
    }

    async fn get_term_popup(&self, term_id: u64) -> Result<String, ServerError> {
        self.popup_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.popup_delay.lock();
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.popups
            .lock()
            .get(&term_id)
            .cloned()
            .ok_or(ServerError::Network("popup unavailable".into()))
    }

    async fn get_term_edit_page(&self, term_id: u64) -> Result<String, ServerError> {
        self.edit_pages
            .lock()
            .get(&term_id)
            .cloned()
            .ok_or(ServerError::Rejected { status: 404, message: "no such term".into() })
    }

    async fn save_term(&self, _term_id: u64, form: &TermForm) -> Result<(), ServerError> {
        if let Some(err) = self.save_failures.lock().pop_front() {
            return Err(err);
        }
        self.saved.lock().push(form.clone());
        Ok(())
    }

    async fn mark_page_read(&self, book_id: u64, page_num: u32, rest_known: bool) -> Result<(), ServerError> {
        self.marked.lock().push((book_id, page_num, rest_known));
        match self.mark_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_language_index(&self) -> Result<String, ServerError> {
        Ok(self.language_index.lock().clone())
    }

    async fn fetch_book_edit_page(&self, book_id: u64) -> Result<String, ServerError> {
        let delay = *self.book_edit_delay.lock();
        tokio::time::sleep(delay).await;
        self.book_edit_pages
            .lock()
            .get(&book_id)
            .cloned()
            .ok_or(ServerError::Network("book page unavailable".into()))
    }

    async fn test_audio_availability(&self, _book_id: u64) -> Result<bool, ServerError> {
        self.audio.lock().clone().unwrap_or(Ok(false))
    }
}

/// A reading page in the server's current template. `words` are
/// `(text, term_id, status)`, separated by spaces and closed with a period.
pub fn page_markup(page_num: u32, page_count: u32, words: &[(&str, u64, u16)]) -> String {
    let mut body = String::new();
    for (i, (text, term_id, status)) in words.iter().enumerate() {
        if i > 0 {
            body.push_str(r#"<span class="textitem"> </span>"#);
        }
        body.push_str(&format!(
            r#"<span class="textitem click word status{status}" data_wid="{term_id}">{text}</span>"#
        ));
    }
    format!(
        r#"<html><body><input type="hidden" id="page_num" value="{page_num}"/><input type="hidden" id="page_count" value="{page_count}"/><input type="hidden" id="lang_id" value="3"/><input type="hidden" id="lang_name" value="Spanish"/><div id="thetext"><p>{body}<span class="textitem">.</span></p></div></body></html>"#
    )
}

pub fn sample_words() -> Vec<(&'static str, u64, u16)> {
    vec![("El", 11, 5), ("gato", 12, 1), ("duerme", 0, 0)]
}

pub fn book(book_id: u64, page_count: u32) -> Arc<ScriptedServer> {
    let pages = (1..=page_count).map(|n| page_markup(n, page_count, &sample_words())).collect();
    ScriptedServer::with_book(book_id, pages, 1)
}

pub fn engine(server: Arc<ScriptedServer>) -> ReadingEngine {
    ReadingEngine::new(server, Arc::new(MemoryStore::new()), Arc::new(ManualClock::new(0)), &ReaderConfig::default())
}

pub fn drain(rx: &mut broadcast::Receiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
