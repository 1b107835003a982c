// Reading engine for a language-learning reader: parses server pages into
// interactive text, tracks taps and pagination, caches slow-moving metadata.
pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod parsing;
pub mod reading;
pub mod sync;
pub mod types;

pub use config::ReaderConfig;
pub use engine::ReadingEngine;
pub use events::{LanguageScope, ReaderEvent, ScrollPosition};
