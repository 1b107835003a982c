//! Typed events every presentation surface subscribes to.

use std::sync::Arc;

use crate::types::{SentenceGroup, TermData, TermDetails, TermForm, TextContent};

/// Scroll state the UI reports, restored after a highlight refresh.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollPosition {
    pub paragraph: usize,
    pub offset: f32,
}

/// Which language a word-count style query should be scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageScope {
    Language { id: u32, name: Option<String> },
    All,
}

#[derive(Debug, Clone)]
pub enum ReaderEvent {
    /// A new page replaced the previous one. `revision` increases with
    /// every page load.
    PageLoaded {
        revision: u64,
        content: Arc<TextContent>,
        groups: Arc<Vec<SentenceGroup>>,
    },
    /// Term statuses on the current page were patched in place.
    HighlightsRefreshed {
        revision: u64,
        content: Arc<TextContent>,
        changed: usize,
        scroll: ScrollPosition,
    },
    HighlightsToggled { visible: bool },
    /// `details` is `None` for words the server does not track yet.
    ShowPopup { term: TermData, details: Option<TermDetails> },
    OpenEditor { term: TermData, form: TermForm },
    PageMarkedDone { book_id: u64, page_num: u32, next_page: u32 },
    BookFinished { book_id: u64 },
    /// Navigation hit the first or last page.
    NavigationBlocked { page_num: u32 },
    AudioChecked { book_id: u64, has_audio: bool },
    TermSaved { term_id: u64 },
    Failure { operation: &'static str, message: String },
}
