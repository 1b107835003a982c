//! The reading server as the engine sees it.

pub mod http;

use async_trait::async_trait;

use crate::error::ServerError;
use crate::types::TermForm;

pub use http::HttpReaderServer;

/// Logical operations of the reading server. Every call returns the raw
/// page markup; parsing is the caller's job. The wire format belongs to
/// the server, so implementations only move bytes and classify failures.
#[async_trait]
pub trait ReaderServer: Send + Sync {
    async fn fetch_page(&self, book_id: u64, page_num: u32) -> Result<String, ServerError>;

    /// The page the server thinks the reader is on.
    async fn open_current_page(&self, book_id: u64) -> Result<String, ServerError>;

    async fn get_term_popup(&self, term_id: u64) -> Result<String, ServerError>;
    async fn get_term_edit_page(&self, term_id: u64) -> Result<String, ServerError>;
    async fn save_term(&self, term_id: u64, form: &TermForm) -> Result<(), ServerError>;

    async fn mark_page_read(&self, book_id: u64, page_num: u32, rest_known: bool) -> Result<(), ServerError>;

    async fn fetch_language_index(&self) -> Result<String, ServerError>;
    async fn fetch_book_edit_page(&self, book_id: u64) -> Result<String, ServerError>;

    /// `Ok(false)` when the server has no audio for the book.
    async fn test_audio_availability(&self, book_id: u64) -> Result<bool, ServerError>;
}
