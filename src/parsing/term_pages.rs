//! Parsers for the term popup and the term edit form.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::field_resolver::{extract_markup_text, FieldResolver, MatcherSpec};
use super::markup::{tokenize, Attributes, Token};
use crate::types::{ParentDetails, TermDetails, TermForm, TermStatus};

const POPUP_TERM: &[MatcherSpec] = &[
    MatcherSpec {
        name: "popup-term-class",
        pattern: r#"(?s)<[a-z]+\b[^>]*class\s*=\s*["'][^"']*\bpopup-term\b[^"']*["'][^>]*>(.*?)</"#,
    },
    MatcherSpec { name: "popup-first-bold", pattern: r#"(?s)<b>(.*?)</b>"# },
];

const POPUP_TRANSLATION: &[MatcherSpec] = &[
    MatcherSpec {
        name: "popup-translation-class",
        pattern: r#"(?s)<[a-z]+\b[^>]*class\s*=\s*["'][^"']*\bpopup-translation\b[^"']*["'][^>]*>(.*?)</(?:p|div|span)>"#,
    },
    // Older popups: the paragraph right after the term's heading paragraph.
    MatcherSpec {
        name: "popup-second-paragraph",
        pattern: r#"(?s)<p>\s*<b>.*?</p>\s*<p>(.*?)</p>"#,
    },
];

const POPUP_ROMANIZATION: &[MatcherSpec] = &[
    MatcherSpec {
        name: "popup-romanization-class",
        pattern: r#"(?s)<[a-z]+\b[^>]*class\s*=\s*["'][^"']*\bpopup-romanization\b[^"']*["'][^>]*>(.*?)</"#,
    },
    MatcherSpec { name: "popup-italic-after-term", pattern: r#"(?s)<p>\s*<b>.*?</b>\s*<i>\(?(.*?)\)?</i>"# },
];

const POPUP_TAGS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "popup-tags-class",
        pattern: r#"(?s)<[a-z]+\b[^>]*class\s*=\s*["'][^"']*\bpopup-tags\b[^"']*["'][^>]*>(.*?)</(?:p|div|span)>"#,
    },
    MatcherSpec { name: "popup-tags-label", pattern: r#"(?i)tags:\s*([^<]+)"# },
];

static PARENT_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<(p|div|li)\b[^>]*class\s*=\s*["'][^"']*\bpopup-parent\b[^"']*["'][^>]*>(.*?)</(?:p|div|li)>"#)
        .expect("parent block regex")
});

static PARENT_PARTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<b>(.*?)</b>(.*)"#).expect("parent parts regex"));

struct PopupParser {
    term: FieldResolver<String>,
    translation: FieldResolver<String>,
    romanization: FieldResolver<String>,
    tags: FieldResolver<String>,
}

static POPUP_PARSER: Lazy<PopupParser> = Lazy::new(|| PopupParser {
    term: FieldResolver::new("popup_term", POPUP_TERM, extract_markup_text),
    translation: FieldResolver::new("popup_translation", POPUP_TRANSLATION, extract_markup_text),
    romanization: FieldResolver::new("popup_romanization", POPUP_ROMANIZATION, extract_markup_text),
    tags: FieldResolver::new("popup_tags", POPUP_TAGS, extract_markup_text),
});

/// Reads a term popup. `None` when the markup holds neither a term nor a
/// translation, in which case no popup should be shown.
pub fn parse_term_popup(raw_markup: &str) -> Option<TermDetails> {
    let p = &*POPUP_PARSER;
    let resolve = |r: &FieldResolver<String>| r.resolve(raw_markup).map(|r| r.value).unwrap_or_default();

    let term = resolve(&p.term);
    let translation = resolve(&p.translation);
    if term.is_empty() && translation.is_empty() {
        debug!("term popup markup had no term or translation");
        return None;
    }

    let tags = split_list(&resolve(&p.tags));
    let parents = PARENT_BLOCK_RE
        .captures_iter(raw_markup)
        .filter_map(|caps| {
            let inner = caps.get(2)?.as_str();
            let parts = PARENT_PARTS_RE.captures(inner)?;
            Some(ParentDetails {
                term: extract_markup_text(parts.get(1)?.as_str())?,
                translation: extract_markup_text(parts.get(2).map_or("", |m| m.as_str())).unwrap_or_default(),
            })
        })
        .collect();

    Some(TermDetails {
        term,
        translation,
        romanization: resolve(&p.romanization),
        tags,
        parents,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn names_field(attrs: &Attributes, field: &str) -> bool {
    attrs.first_of(&["name", "id"]) == Some(field)
}

/// Value of the `<input name=...>` with the given name.
fn input_value(tokens: &[Token], field: &str) -> Option<String> {
    tokens.iter().find_map(|t| match t {
        Token::Open { name, attrs, .. } if name == "input" && names_field(attrs, field) => {
            Some(attrs.get("value").unwrap_or("").trim().to_string())
        }
        _ => None,
    })
}

fn textarea_value(tokens: &[Token], field: &str) -> Option<String> {
    let start = tokens.iter().position(
        |t| matches!(t, Token::Open { name, attrs, .. } if name == "textarea" && names_field(attrs, field)),
    )?;
    let value: String = tokens[start + 1..]
        .iter()
        .map_while(|t| match t {
            Token::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    Some(value.trim().to_string())
}

fn selected_option(tokens: &[Token], field: &str) -> Option<String> {
    // <select name=field><option value=.. selected>
    let mut in_select = false;
    for token in tokens {
        match token {
            Token::Open { name, attrs, .. } if name == "select" => in_select = names_field(attrs, field),
            Token::Close { name } if name == "select" => in_select = false,
            Token::Open { name, attrs, .. } if in_select && name == "option" && attrs.get("selected").is_some() => {
                if let Some(value) = attrs.get("value") {
                    return Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    // <input type=radio name=field value=.. checked>
    tokens.iter().find_map(|t| match t {
        Token::Open { name, attrs, .. }
            if name == "input" && attrs.get("name") == Some(field) && attrs.get("checked").is_some() =>
        {
            attrs.get("value").map(str::to_string)
        }
        _ => None,
    })
}

/// Reads the editable fields of a term edit page into a form. Fields that
/// are missing stay empty; this never fails.
pub fn parse_term_form(raw_markup: &str, term_id: u64) -> TermForm {
    let tokens = tokenize(raw_markup);
    let field = |name: &str| {
        textarea_value(&tokens, name)
            .or_else(|| input_value(&tokens, name))
            .unwrap_or_default()
    };
    let status = selected_option(&tokens, "status")
        .and_then(|v| v.trim().parse::<u16>().ok())
        .map(TermStatus::from_code)
        .unwrap_or_default();

    TermForm {
        term_id,
        text: field("text"),
        translation: field("translation"),
        romanization: field("romanization"),
        status,
        parents: parse_tag_list(&field("parentslist")),
        tags: parse_tag_list(&field("termtagslist")),
    }
}

/// Lists on the edit page are either comma separated or a JSON array of
/// `{"value": ...}` objects, depending on the widget the server renders.
fn parse_tag_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            return items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Object(map) => map.get("value")?.as_str().map(str::to_string),
                    _ => None,
                })
                .filter(|s| !s.trim().is_empty())
                .collect();
        }
    }
    split_list(trimmed)
}
