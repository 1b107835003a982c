pub mod field_resolver;
pub mod library_pages;
pub mod markup;
pub mod page_parser;
pub mod term_pages;

// Re-export the entry points the engine uses
pub use field_resolver::{FieldResolver, MatcherSpec, Resolved};
pub use library_pages::{parse_book_edit_page, parse_language_index};
pub use markup::visible_text;
pub use page_parser::{parse_page, parse_page_with_diagnostics, ContentParser, ParseDegradation, ParseReport};
pub use term_pages::{parse_term_form, parse_term_popup};
