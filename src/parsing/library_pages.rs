//! Language table and book edit page: the two pages the metadata caches
//! fall back to on a miss.

use once_cell::sync::Lazy;
use regex::Regex;

use super::field_resolver::{extract_markup_text, extract_u32, FieldResolver, MatcherSpec};
use super::markup::visible_text;
use crate::types::{BookInfo, LanguageEntry};

/// Each row yields `(id, name)` pairs via groups 1 and 2.
const LANGUAGE_ROW_PATTERNS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "language-edit-link",
        pattern: r#"(?s)<a\b[^>]*href\s*=\s*["'][^"']*/language/edit/(\d+)["'][^>]*>(.*?)</a>"#,
    },
    MatcherSpec {
        name: "language-option",
        pattern: r#"(?s)<option\b[^>]*value\s*=\s*["'](\d+)["'][^>]*>(.*?)</option>"#,
    },
    MatcherSpec {
        name: "language-data-row",
        pattern: r#"(?s)<tr\b[^>]*data[-_]lang(?:uage)?[-_]id\s*=\s*["'](\d+)["'][^>]*>\s*<td[^>]*>(.*?)</td>"#,
    },
];

static LANGUAGE_ROWS: Lazy<Vec<Regex>> = Lazy::new(|| {
    LANGUAGE_ROW_PATTERNS
        .iter()
        .filter_map(|spec| Regex::new(spec.pattern).ok())
        .collect()
});

const BOOK_TITLE: &[MatcherSpec] = &[
    MatcherSpec {
        name: "title-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["']title["'][^>]*\bvalue\s*=\s*["']([^"']*)["']"#,
    },
    MatcherSpec {
        name: "title-input-value-first",
        pattern: r#"<input\b[^>]*\bvalue\s*=\s*["']([^"']*)["'][^>]*\b(?:id|name)\s*=\s*["']title["']"#,
    },
    MatcherSpec { name: "title-heading", pattern: r#"(?s)<h[12]\b[^>]*>(.*?)</h[12]>"# },
];

const BOOK_LANGUAGE: &[MatcherSpec] = &[
    MatcherSpec {
        name: "language-select-selected",
        pattern: r#"(?s)<select\b[^>]*\b(?:id|name)\s*=\s*["'](?:language_id|lang_id|BkLgID)["'][^>]*>.*?<option\b[^>]*\bvalue\s*=\s*["'](\d+)["'][^>]*\bselected"#,
    },
    MatcherSpec {
        name: "language-select-selected-first",
        pattern: r#"(?s)<select\b[^>]*\b(?:id|name)\s*=\s*["'](?:language_id|lang_id|BkLgID)["'][^>]*>.*?<option\b[^>]*\bselected[^>]*\bvalue\s*=\s*["'](\d+)["']"#,
    },
    MatcherSpec {
        name: "language-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["'](?:language_id|lang_id)["'][^>]*\bvalue\s*=\s*["'](\d+)["']"#,
    },
    MatcherSpec { name: "language-data-attr", pattern: r#"\bdata[-_]lang(?:uage)?[-_]id\s*=\s*["']?(\d+)"# },
];

struct BookPageParser {
    title: FieldResolver<String>,
    language_id: FieldResolver<u32>,
}

static BOOK_PAGE_PARSER: Lazy<BookPageParser> = Lazy::new(|| BookPageParser {
    title: FieldResolver::new("book_title", BOOK_TITLE, extract_markup_text),
    language_id: FieldResolver::new("book_language_id", BOOK_LANGUAGE, |raw| extract_u32(raw).filter(|&id| id > 0)),
});

/// Reads the server's language table. Rows come back in page order with
/// duplicates removed; the first matcher that yields any row wins.
pub fn parse_language_index(raw_markup: &str) -> Vec<LanguageEntry> {
    for re in LANGUAGE_ROWS.iter() {
        let mut entries: Vec<LanguageEntry> = Vec::new();
        for caps in re.captures_iter(raw_markup) {
            let (Some(id), Some(name)) = (caps.get(1), caps.get(2)) else { continue };
            let Ok(id) = id.as_str().parse::<u32>() else { continue };
            let name = visible_text(name.as_str()).trim().to_string();
            if id == 0 || name.is_empty() || entries.iter().any(|e| e.id == id) {
                continue;
            }
            entries.push(LanguageEntry { id, name });
        }
        if !entries.is_empty() {
            return entries;
        }
    }
    Vec::new()
}

pub fn parse_book_edit_page(raw_markup: &str) -> BookInfo {
    let p = &*BOOK_PAGE_PARSER;
    BookInfo {
        title: p.title.resolve(raw_markup).map(|r| r.value).unwrap_or_default(),
        language_id: p.language_id.resolve(raw_markup).map(|r| r.value),
    }
}
