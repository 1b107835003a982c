pub mod pagination;
pub mod retry;

pub use pagination::{AdvanceOutcome, PageCursor, PaginationSync};
pub use retry::{Attempted, RetryPolicy};
