use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use super::retry::RetryPolicy;
use crate::client::ReaderServer;
use crate::error::SyncError;
use crate::types::PageMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub book_id: u64,
    pub page_num: u32,   // 1..=page_count
    pub page_count: u32, // >= 1
}

impl PageCursor {
    pub fn new(book_id: u64, page_num: u32, page_count: u32) -> Self {
        let page_count = page_count.max(1);
        PageCursor { book_id, page_num: page_num.clamp(1, page_count), page_count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced { page_num: u32 },
    /// The last page was marked; the cursor stays where it is.
    BookFinished,
    /// Another page replaced the marked one while the call was in flight.
    /// The mark stuck on the server; the cursor was left alone.
    Superseded,
}

/// Page cursor of the open book plus the mark-done round trip. Moving the
/// cursor is local and synchronous; only `mark_done_and_advance` talks to
/// the server, and it moves the cursor only once the server has agreed.
pub struct PaginationSync {
    server: Arc<dyn ReaderServer>,
    retry: RetryPolicy,
    cursor: Mutex<PageCursor>,
}

impl PaginationSync {
    pub fn new(server: Arc<dyn ReaderServer>, retry: RetryPolicy) -> Self {
        PaginationSync { server, retry, cursor: Mutex::new(PageCursor::new(0, 1, 1)) }
    }

    pub fn reset(&self, cursor: PageCursor) {
        *self.cursor.lock() = cursor;
    }

    /// Syncs the cursor with a freshly parsed page.
    pub fn sync_with(&self, metadata: &PageMetadata) {
        self.reset(PageCursor::new(metadata.book_id, metadata.page_num, metadata.page_count));
    }

    pub fn cursor(&self) -> PageCursor {
        *self.cursor.lock()
    }

    pub fn book_id(&self) -> u64 {
        self.cursor.lock().book_id
    }

    pub fn page_num(&self) -> u32 {
        self.cursor.lock().page_num
    }

    pub fn page_count(&self) -> u32 {
        self.cursor.lock().page_count
    }

    /// Moves one page forward. `false` (and no change) on the last page.
    pub fn go_to_next(&self) -> bool {
        let mut cursor = self.cursor.lock();
        if cursor.page_num >= cursor.page_count {
            info!(page = cursor.page_num, "already on the last page");
            return false;
        }
        cursor.page_num += 1;
        true
    }

    /// Puts the cursor back on `previous` if it still sits on `moved_to`.
    /// Used when the page a move pointed at failed to load.
    pub fn restore(&self, moved_to: PageCursor, previous: PageCursor) -> bool {
        let mut cursor = self.cursor.lock();
        if *cursor != moved_to {
            return false;
        }
        *cursor = previous;
        true
    }

    /// Moves one page back. `false` (and no change) on the first page.
    pub fn go_to_previous(&self) -> bool {
        let mut cursor = self.cursor.lock();
        if cursor.page_num <= 1 {
            info!("already on the first page");
            return false;
        }
        cursor.page_num -= 1;
        true
    }

    /// Marks the current page read on the server, retrying network
    /// failures, and then advances. On error the cursor is untouched.
    pub async fn mark_done_and_advance(&self, rest_known: bool) -> Result<AdvanceOutcome, SyncError> {
        let PageCursor { book_id, page_num, .. } = self.cursor();
        let server = &self.server;
        let attempted = self
            .retry
            .run("mark_page_read", || server.mark_page_read(book_id, page_num, rest_known))
            .await;

        if let Err(source) = attempted.result {
            warn!(book_id, page_num, attempts = attempted.attempts, error = %source, "mark done failed");
            return Err(SyncError { page_num, attempts: attempted.attempts, source });
        }

        let mut cursor = self.cursor.lock();
        if cursor.book_id != book_id || cursor.page_num != page_num {
            info!(
                book_id,
                page_num,
                now_book = cursor.book_id,
                now_page = cursor.page_num,
                "page changed while marking done; not advancing"
            );
            return Ok(AdvanceOutcome::Superseded);
        }
        if page_num >= cursor.page_count {
            info!(book_id, page_num, "book finished");
            return Ok(AdvanceOutcome::BookFinished);
        }
        cursor.page_num = page_num + 1;
        Ok(AdvanceOutcome::Advanced { page_num: cursor.page_num })
    }
}
