//! Turns one page of server markup into a [`TextContent`].
//!
//! Metadata fields come from ordered matcher chains (see
//! [`FieldResolver`]); text comes from walking the inline term markers of
//! the reading pane in document order. Nothing here fails: a field that
//! cannot be found gets its documented default and a [`ParseDegradation`]
//! entry in the report.

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::field_resolver::{extract_text, extract_u32, FieldResolver, MatcherSpec};
use super::markup::{tokenize, Attributes, Token};
use crate::types::{
    PageMetadata, Paragraph, Segment, TermStatus, TextContent, DEFAULT_LANGUAGE_ID, DEFAULT_PAGE_COUNT,
};

pub const PAGE_NUM_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "page-num-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["']page_?num["'][^>]*\bvalue\s*=\s*["'](\d+)["']"#,
    },
    MatcherSpec {
        name: "page-num-input-value-first",
        pattern: r#"<input\b[^>]*\bvalue\s*=\s*["'](\d+)["'][^>]*\b(?:id|name)\s*=\s*["']page_?num["']"#,
    },
    MatcherSpec {
        name: "page-num-data-attr",
        pattern: r#"\bdata[-_]page[-_]?num\s*=\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "page-num-script-var",
        pattern: r#"\b(?:pageNum|page_num|PAGE_NUM|pagenum)\s*[:=]\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "page-num-caption",
        pattern: r#"\b[Pp]age\s+(\d+)\s*(?:/|of)\s*\d+"#,
    },
];

pub const PAGE_COUNT_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "page-count-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["']page_?count["'][^>]*\bvalue\s*=\s*["'](\d+)["']"#,
    },
    MatcherSpec {
        name: "page-count-input-value-first",
        pattern: r#"<input\b[^>]*\bvalue\s*=\s*["'](\d+)["'][^>]*\b(?:id|name)\s*=\s*["']page_?count["']"#,
    },
    MatcherSpec {
        name: "page-count-data-attr",
        pattern: r#"\bdata[-_]page[-_]?count\s*=\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "page-count-script-var",
        pattern: r#"\b(?:pageCount|page_count|PAGE_COUNT|pagecount)\s*[:=]\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "page-count-caption",
        pattern: r#"\b[Pp]age\s+\d+\s*(?:/|of)\s*(\d+)"#,
    },
];

pub const LANGUAGE_ID_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "lang-id-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["'](?:lang_id|language_id)["'][^>]*\bvalue\s*=\s*["'](\d+)["']"#,
    },
    MatcherSpec {
        name: "lang-id-input-value-first",
        pattern: r#"<input\b[^>]*\bvalue\s*=\s*["'](\d+)["'][^>]*\b(?:id|name)\s*=\s*["'](?:lang_id|language_id)["']"#,
    },
    MatcherSpec {
        name: "lang-id-script-var",
        pattern: r#"\b(?:LANG_ID|langId|lang_id|languageId|LANGUAGE_ID)\s*=\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "lang-id-data-attr",
        pattern: r#"\bdata[-_]lang(?:uage)?[-_]id\s*=\s*["']?(\d+)"#,
    },
    MatcherSpec {
        name: "lang-id-form-action",
        pattern: r#"\baction\s*=\s*["'][^"']*[?&](?:lang_id|langid|language_id)=(\d+)"#,
    },
    MatcherSpec {
        name: "lang-id-key-value",
        pattern: r#"["']?\b(?:language_id|languageId|lang_id|langid)["']?\s*:\s*["']?(\d+)"#,
    },
];

pub const LANGUAGE_NAME_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec {
        name: "lang-name-input",
        pattern: r#"<input\b[^>]*\b(?:id|name)\s*=\s*["'](?:lang_name|language_name)["'][^>]*\bvalue\s*=\s*["']([^"']+)["']"#,
    },
    MatcherSpec {
        name: "lang-name-input-value-first",
        pattern: r#"<input\b[^>]*\bvalue\s*=\s*["']([^"']+)["'][^>]*\b(?:id|name)\s*=\s*["'](?:lang_name|language_name)["']"#,
    },
];

pub const AUDIO_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec { name: "audio-file-input", pattern: r#"\bid\s*=\s*["']book_audio_file["']"# },
    MatcherSpec { name: "audio-element", pattern: r#"(?i)<audio\b"# },
    MatcherSpec { name: "audio-data-attr", pattern: r#"\bdata[-_]has[-_]audio\s*=\s*["']?(?:true|1)\b"# },
];

pub const RTL_MATCHERS: &[MatcherSpec] = &[
    MatcherSpec { name: "rtl-dir-attr", pattern: r#"\bdir\s*=\s*["']rtl["']"# },
    MatcherSpec { name: "rtl-data-attr", pattern: r#"\bdata[-_](?:is[-_])?rtl\s*=\s*["']?(?:true|1)\b"# },
    MatcherSpec { name: "rtl-script-var", pattern: r#"\b(?:isRTL|is_rtl|IS_RTL)\s*[:=]\s*["']?(?:true|1)\b"# },
    MatcherSpec { name: "rtl-css", pattern: r#"\bdirection\s*:\s*rtl\b"# },
];

/// Ids of the element that wraps the readable text, newest template first.
const CONTAINER_IDS: &[&str] = &["thetext", "reading-text", "reading_text", "readingtext"];

/// Something the parser had to make up.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseDegradation {
    Defaulted { field: &'static str, value: String },
    PageCountRaised { parsed: u32, page_num: u32 },
    NoSegments,
}

#[derive(Debug, Clone)]
pub struct ParseReport {
    pub content: TextContent,
    pub degradations: Vec<ParseDegradation>,
    /// `(field, matcher)` for every field a chain resolved.
    pub matched: Vec<(&'static str, &'static str)>,
}

pub struct ContentParser {
    page_num: FieldResolver<u32>,
    page_count: FieldResolver<u32>,
    language_id: FieldResolver<u32>,
    language_name: FieldResolver<String>,
    has_audio: FieldResolver<bool>,
    is_rtl: FieldResolver<bool>,
}

static SHARED_PARSER: Lazy<ContentParser> = Lazy::new(ContentParser::new);

/// Parses with a shared, lazily built [`ContentParser`].
pub fn parse_page(raw_markup: &str, book_id: u64, fallback_page_num: u32) -> TextContent {
    SHARED_PARSER.parse(raw_markup, book_id, fallback_page_num)
}

pub fn parse_page_with_diagnostics(raw_markup: &str, book_id: u64, fallback_page_num: u32) -> ParseReport {
    SHARED_PARSER.parse_with_diagnostics(raw_markup, book_id, fallback_page_num)
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentParser {
    pub fn new() -> Self {
        ContentParser {
            page_num: FieldResolver::new("page_num", PAGE_NUM_MATCHERS, positive_u32),
            page_count: FieldResolver::new("page_count", PAGE_COUNT_MATCHERS, positive_u32),
            language_id: FieldResolver::new("language_id", LANGUAGE_ID_MATCHERS, extract_u32),
            language_name: FieldResolver::new("language_name", LANGUAGE_NAME_MATCHERS, extract_text),
            has_audio: FieldResolver::presence("has_audio", AUDIO_MATCHERS),
            is_rtl: FieldResolver::presence("is_right_to_left", RTL_MATCHERS),
        }
    }

    pub fn parse(&self, raw_markup: &str, book_id: u64, fallback_page_num: u32) -> TextContent {
        self.parse_with_diagnostics(raw_markup, book_id, fallback_page_num).content
    }

    pub fn parse_with_diagnostics(&self, raw_markup: &str, book_id: u64, fallback_page_num: u32) -> ParseReport {
        let mut degradations = Vec::new();
        let mut matched = Vec::new();

        let mut resolve_or = |resolver: &FieldResolver<u32>, default: u32| -> u32 {
            match resolver.resolve(raw_markup) {
                Some(r) => {
                    matched.push((resolver.field(), r.matcher));
                    r.value
                }
                None => {
                    degradations.push(ParseDegradation::Defaulted {
                        field: resolver.field(),
                        value: default.to_string(),
                    });
                    default
                }
            }
        };

        let page_num = resolve_or(&self.page_num, fallback_page_num.max(1));
        let mut page_count = resolve_or(&self.page_count, DEFAULT_PAGE_COUNT);
        let language_id = resolve_or(&self.language_id, DEFAULT_LANGUAGE_ID);

        if page_num > page_count {
            warn!(page_num, page_count, "page number beyond page count, raising page count");
            degradations.push(ParseDegradation::PageCountRaised { parsed: page_count, page_num });
            page_count = page_num;
        }

        let language_name = match self.language_name.resolve(raw_markup) {
            Some(r) => {
                matched.push(("language_name", r.matcher));
                r.value
            }
            None => String::new(),
        };
        let has_audio = self.has_audio.resolve(raw_markup).is_some();
        let is_right_to_left = self.is_rtl.resolve(raw_markup).is_some();

        let metadata = PageMetadata {
            book_id,
            page_num,
            page_count,
            has_audio,
            is_right_to_left,
            language_id,
            language_name,
        };

        let paragraphs = extract_paragraphs(raw_markup, language_id);
        if paragraphs.is_empty() {
            degradations.push(ParseDegradation::NoSegments);
        }
        for d in &degradations {
            debug!(book_id, ?d, "page parse degradation");
        }

        ParseReport {
            content: TextContent { paragraphs, metadata },
            degradations,
            matched,
        }
    }
}

fn positive_u32(raw: &str) -> Option<u32> {
    extract_u32(raw).filter(|&n| n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Paragraph,
    Term,
    Other,
}

#[derive(Default)]
struct ParagraphDraft {
    segments: Vec<Segment>,
    literal: String,
    has_terms: bool,
    implicit: bool,
}

struct TermDraft {
    attrs: Attributes,
    text: String,
}

struct SegmentBuilder {
    language_id: u32,
    paragraphs: Vec<Paragraph>,
    current: Option<ParagraphDraft>,
    term: Option<TermDraft>,
}

impl SegmentBuilder {
    fn new(language_id: u32) -> Self {
        SegmentBuilder { language_id, paragraphs: Vec::new(), current: None, term: None }
    }

    fn open_paragraph(&mut self, implicit: bool) {
        self.finish_paragraph();
        self.current = Some(ParagraphDraft { implicit, ..Default::default() });
    }

    fn finish_paragraph(&mut self) {
        self.finish_term();
        let Some(mut draft) = self.current.take() else { return };
        flush_literal(&mut draft, self.language_id);
        if draft.has_terms {
            let id = format!("p{}", self.paragraphs.len());
            self.paragraphs.push(Paragraph::new(id, draft.segments));
        } else if !draft.segments.is_empty() {
            debug!(implicit = draft.implicit, "dropping paragraph without term markers");
        }
    }

    fn open_term(&mut self, attrs: Attributes) {
        if self.current.is_none() {
            self.open_paragraph(true);
        }
        if let Some(draft) = self.current.as_mut() {
            flush_literal(draft, self.language_id);
        }
        self.term = Some(TermDraft { attrs, text: String::new() });
    }

    fn finish_term(&mut self) {
        let Some(term) = self.term.take() else { return };
        if term.text.is_empty() {
            return;
        }
        let segment = term_segment(term, self.language_id);
        if let Some(draft) = self.current.as_mut() {
            draft.segments.push(segment);
            draft.has_terms = true;
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(term) = self.term.as_mut() {
            term.text.push_str(text);
        } else if let Some(draft) = self.current.as_mut() {
            draft.literal.push_str(text);
        }
    }

    fn in_implicit_paragraph(&self) -> bool {
        self.current.as_ref().is_some_and(|d| d.implicit)
    }
}

fn flush_literal(draft: &mut ParagraphDraft, language_id: u32) {
    if !draft.literal.is_empty() {
        let text = std::mem::take(&mut draft.literal);
        draft.segments.push(Segment::literal(text, language_id));
    }
}

fn is_term_marker(name: &str, attrs: &Attributes) -> bool {
    name == "span"
        && (attrs.has_class("textitem")
            || attrs.has_class("word")
            || attrs.first_of(&["data_order", "data-order"]).is_some())
}

fn is_paragraph_marker(name: &str, attrs: &Attributes) -> bool {
    name == "p" || attrs.classes().any(|c| c == "paragraph" || c == "textparagraph")
}

fn is_container(attrs: &Attributes) -> bool {
    attrs.get("id").is_some_and(|id| CONTAINER_IDS.contains(&id))
}

/// Restricts the token stream to the reading pane when the page has one.
fn reading_pane(tokens: &[Token]) -> &[Token] {
    let Some(start) = tokens
        .iter()
        .position(|t| matches!(t, Token::Open { attrs, self_closing: false, .. } if is_container(attrs)))
    else {
        return tokens;
    };
    let Token::Open { name: container, .. } = &tokens[start] else {
        return tokens;
    };
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        match token {
            Token::Open { name, self_closing: false, .. } if name == container => depth += 1,
            Token::Close { name } if name == container => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &tokens[start + 1..i];
                }
            }
            _ => {}
        }
    }
    &tokens[start + 1..]
}

/// Walks the reading pane and builds paragraphs of segments. Text outside
/// paragraphs and paragraphs without any term marker are not reading text.
pub fn extract_paragraphs(raw_markup: &str, language_id: u32) -> Vec<Paragraph> {
    let tokens = tokenize(raw_markup);
    let pane = reading_pane(&tokens);

    let mut builder = SegmentBuilder::new(language_id);
    let mut stack: Vec<(String, Frame)> = Vec::new();

    for token in pane {
        match token {
            Token::Open { name, attrs, self_closing } => {
                if *self_closing {
                    continue;
                }
                // Markup nested inside a term (ruby, emphasis) is part of the term.
                if builder.term.is_some() {
                    stack.push((name.clone(), Frame::Other));
                    continue;
                }
                if is_term_marker(name, attrs) {
                    builder.open_term(attrs.clone());
                    stack.push((name.clone(), Frame::Term));
                } else if is_paragraph_marker(name, attrs) {
                    builder.open_paragraph(false);
                    stack.push((name.clone(), Frame::Paragraph));
                } else {
                    stack.push((name.clone(), Frame::Other));
                }
            }
            Token::Close { name } => {
                let Some(pos) = stack.iter().rposition(|(n, _)| n == name) else {
                    continue;
                };
                for (_, frame) in stack.drain(pos..).rev() {
                    match frame {
                        Frame::Term => builder.finish_term(),
                        Frame::Paragraph => builder.finish_paragraph(),
                        Frame::Other => {}
                    }
                }
            }
            Token::Text(text) => {
                // Source line breaks around an implicit paragraph are formatting.
                if builder.term.is_none() && builder.current.is_none() {
                    continue;
                }
                if builder.in_implicit_paragraph() && text.trim().is_empty() && text.contains('\n') {
                    continue;
                }
                builder.text(text);
            }
        }
    }
    builder.finish_paragraph();
    builder.paragraphs
}

fn term_segment(term: TermDraft, page_language_id: u32) -> Segment {
    let attrs = &term.attrs;
    let term_id = attrs
        .first_of(&["data_wid", "data-wid", "data_term_id", "data-term-id"])
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let status = parse_status(attrs);
    let looks_like_word = attrs.has_class("word") || attrs.has_class("click");
    let has_letters = term.text.chars().any(char::is_alphanumeric);
    let is_interactive = term_id > 0 || (looks_like_word && has_letters);

    let language_id = attrs
        .first_of(&["data_lang_id", "data-lang-id"])
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(page_language_id);
    let translation = attrs
        .first_of(&["data_trans", "data-trans", "data_translation", "data-translation"])
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let parent_term_ids = attrs
        .first_of(&["data_parent_ids", "data-parent-ids"])
        .map(|v| {
            v.split([',', ';', ' '])
                .filter_map(|id| id.trim().parse::<u64>().ok())
                .filter(|&id| id > 0)
                .collect()
        })
        .unwrap_or_default();
    let parent_translations = attrs
        .first_of(&["data_parent_trans", "data-parent-trans"])
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.split('|').map(|t| t.trim().to_string()).collect())
        .unwrap_or_default();

    Segment {
        text: term.text,
        is_interactive,
        status,
        term_id,
        language_id,
        translation,
        parent_term_ids,
        parent_translations,
    }
}

fn status_digits(value: &str) -> Option<u16> {
    let digits = value.trim().trim_start_matches("status");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_status(attrs: &Attributes) -> TermStatus {
    let code = attrs
        .first_of(&["data_status_class", "data-status-class"])
        .and_then(status_digits)
        .or_else(|| attrs.classes().filter(|c| c.starts_with("status")).find_map(status_digits))
        .or_else(|| attrs.first_of(&["data_status", "data-status"]).and_then(status_digits));
    code.map(TermStatus::from_code).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::markup::visible_text;

    const READING_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Reading</title>
<script>var pageNum = 99; LANG_ID = 7;</script></head>
<body>
<nav><a href="/">Home</a> <span>Menu</span></nav>
<input type="hidden" id="page_num" value="3" />
<input type="hidden" id="page_count" value="12" />
<input type="hidden" id="lang_id" value="2" />
<input type="hidden" id="lang_name" value="Espa&ntilde;ol" />
<div id="thetext" dir="ltr">
<p id="para-a"><span class="textitem click word status1" data_wid="15" data_trans="the" data_status_class="status1">El</span><span class="textitem">&nbsp;</span><span class="textitem click word status0">gato</span><span class="textitem">. </span></p>
<p><span class="textitem click word status99" data_wid="9">Sí</span><span class="textitem">!</span></p>
</div>
</body></html>"#;

    #[test]
    fn metadata_comes_from_form_fields_first() {
        let report = ContentParser::new().parse_with_diagnostics(READING_PAGE, 5, 1);
        let meta = &report.content.metadata;
        assert_eq!(meta.book_id, 5);
        assert_eq!(meta.page_num, 3);
        assert_eq!(meta.page_count, 12);
        assert_eq!(meta.language_id, 2);
        assert_eq!(meta.language_name, "Español");
        assert!(!meta.has_audio);
        assert!(!meta.is_right_to_left);
        assert!(report.matched.contains(&("page_num", "page-num-input")));
        assert!(report.degradations.is_empty());
    }

    #[test]
    fn segments_preserve_order_and_annotations() {
        let content = parse_page(READING_PAGE, 5, 1);
        assert_eq!(content.paragraphs.len(), 2);
        let first = &content.paragraphs[0];
        assert_eq!(first.id, "p0");
        assert_eq!(first.segments.len(), 4);
        let el = &first.segments[0];
        assert_eq!(el.text, "El");
        assert!(el.is_interactive);
        assert_eq!(el.term_id, 15);
        assert_eq!(el.status, TermStatus::Learning1);
        assert_eq!(el.translation, "the");
        assert!(!first.segments[1].is_interactive);
        assert!(first.segments[2].is_interactive);
        assert_eq!(first.segments[2].term_id, 0);
        assert_eq!(content.paragraphs[1].segments[0].status, TermStatus::WellKnown);
    }

    #[test]
    fn reconstruction_is_lossless() {
        let content = parse_page(READING_PAGE, 5, 1);
        let first_para = READING_PAGE
            .split("<p id=\"para-a\">")
            .nth(1)
            .and_then(|rest| rest.split("</p>").next())
            .unwrap();
        assert_eq!(content.paragraphs[0].text(), visible_text(first_para));
        assert_eq!(content.paragraphs[0].text(), "El\u{a0}gato. ");
    }

    #[test]
    fn segment_text_matches_what_the_browser_shows() {
        let page = r#"<div id="thetext"><p><span class="textitem click word">&Eacute;cole</span><span class="textitem">&nbsp;&mdash; </span><span class="textitem click word">&ecirc;tre</span><span class="textitem"> &copy;&oslash;</span></p></div>"#;
        let content = parse_page(page, 1, 1);
        let texts: Vec<&str> = content.paragraphs[0].segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["École", "\u{a0}— ", "être", " ©ø"]);
        assert_eq!(content.paragraphs[0].text(), "École\u{a0}— être ©ø");
    }

    #[test]
    fn script_variables_are_second_choice() {
        let page = r#"<script>var pageNum = 4; var pageCount = 6; LANG_ID = 3;</script>
            <div id="thetext"><p><span class="textitem word">uno</span></p></div>"#;
        let report = ContentParser::new().parse_with_diagnostics(page, 1, 1);
        let meta = &report.content.metadata;
        assert_eq!((meta.page_num, meta.page_count, meta.language_id), (4, 6, 3));
        assert!(report.matched.contains(&("language_id", "lang-id-script-var")));
    }

    #[test]
    fn language_id_falls_back_through_chain() {
        let data_attr = r#"<div data-lang-id="8"></div>"#;
        let action = r#"<form action="/term/new?text=x&lang_id=11"></form>"#;
        let kv = r#"{"language_id": 13}"#;
        let parser = ContentParser::new();
        assert_eq!(parser.parse(data_attr, 1, 1).metadata.language_id, 8);
        assert_eq!(parser.parse(action, 1, 1).metadata.language_id, 11);
        assert_eq!(parser.parse(kv, 1, 1).metadata.language_id, 13);
    }

    #[test]
    fn garbage_degrades_to_defaults() {
        let report = ContentParser::new().parse_with_diagnostics("<<<not markup at all", 9, 4);
        let meta = &report.content.metadata;
        assert_eq!(meta.page_num, 4);
        assert_eq!(meta.page_count, DEFAULT_PAGE_COUNT);
        assert_eq!(meta.language_id, DEFAULT_LANGUAGE_ID);
        assert!(report.content.paragraphs.is_empty());
        assert!(report.degradations.contains(&ParseDegradation::NoSegments));
        assert!(report
            .degradations
            .contains(&ParseDegradation::Defaulted { field: "page_count", value: "10".into() }));
    }

    #[test]
    fn page_count_raised_to_cover_page_num() {
        let page = r#"<input id="page_num" value="14"><input id="page_count" value="12">"#;
        let meta = parse_page(page, 1, 1).metadata;
        assert_eq!((meta.page_num, meta.page_count), (14, 14));
    }

    #[test]
    fn audio_and_rtl_markers() {
        let page = r#"<audio id="player"></audio><div id="thetext" dir="rtl"></div>"#;
        let meta = parse_page(page, 1, 1).metadata;
        assert!(meta.has_audio);
        assert!(meta.is_right_to_left);
    }

    #[test]
    fn term_ids_imply_interactive_even_without_word_class() {
        let page = r#"<div id="thetext"><p><span class="textitem" data-wid="4" data-parent-ids="7, 8" data-parent-trans="a|b">x</span></p></div>"#;
        let seg = &parse_page(page, 1, 1).paragraphs[0].segments[0];
        assert!(seg.is_interactive);
        assert_eq!(seg.parent_term_ids, vec![7, 8]);
        assert_eq!(seg.parent_translations, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn spans_outside_paragraphs_form_an_implicit_paragraph() {
        let page = "<div id=\"thetext\"><span class=\"textitem word\">a</span><span class=\"textitem\"> </span><span class=\"textitem word\">b</span>\n<p><span class=\"textitem word\">c</span></p></div>";
        let content = parse_page(page, 1, 1);
        assert_eq!(content.paragraphs.len(), 2);
        assert_eq!(content.paragraphs[0].text(), "a b");
        assert_eq!(content.paragraphs[1].text(), "c");
    }
}
