//! Markup handling for server pages: a flat tag/text token stream over the
//! html5ever tokenizer, plus attribute lookup. There is no tree building;
//! tags come out in source order whether or not they balance.

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

// Their text is never page text.
const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "title"];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open { name: String, attrs: Attributes, self_closing: bool },
    Close { name: String },
    /// Decoded text. Adjacent character runs are merged.
    Text(String),
}

/// Collects tokens into a flat list. Text inside `<script>`, `<style>` and
/// `<title>` is dropped.
#[derive(Default)]
struct FlatSink {
    tokens: RefCell<Vec<Token>>,
    hidden: RefCell<Option<String>>,
}

impl FlatSink {
    fn push_text(&self, text: &str) {
        if self.hidden.borrow().is_some() {
            return;
        }
        let mut tokens = self.tokens.borrow_mut();
        match tokens.last_mut() {
            Some(Token::Text(last)) => last.push_str(text),
            _ => tokens.push(Token::Text(text.to_string())),
        }
    }

    fn push_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                let self_closing = tag.self_closing || VOID_ELEMENTS.contains(&name.as_str());
                let raw = if self_closing { None } else { raw_kind(&name) };
                if !self_closing && HIDDEN_TEXT_ELEMENTS.contains(&name.as_str()) {
                    *self.hidden.borrow_mut() = Some(name.clone());
                }
                let attrs = tag
                    .attrs
                    .iter()
                    .map(|a| (a.name.local.to_string(), a.value.to_string()))
                    .collect();
                self.tokens.borrow_mut().push(Token::Open { name, attrs: Attributes(attrs), self_closing });
                match raw {
                    Some(kind) => TokenSinkResult::RawData(kind),
                    None => TokenSinkResult::Continue,
                }
            }
            TagKind::EndTag => {
                {
                    let mut hidden = self.hidden.borrow_mut();
                    if hidden.as_deref() == Some(name.as_str()) {
                        *hidden = None;
                    }
                }
                self.tokens.borrow_mut().push(Token::Close { name });
                TokenSinkResult::Continue
            }
        }
    }
}

/// Elements whose content the tokenizer must read as raw text.
fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

impl TokenSink for FlatSink {
    type Handle = ();

    fn process_token(&self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::TagToken(tag) => return self.push_tag(tag),
            HtmlToken::CharacterTokens(text) => self.push_text(&text),
            // Comments, doctype, parse errors and EOF carry no page content.
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Splits markup into tags and decoded text runs. Comments and doctype
/// declarations are dropped.
pub fn tokenize(markup: &str) -> Vec<Token> {
    let tokenizer = Tokenizer::new(FlatSink::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));
    let _ = tokenizer.feed(&input);
    tokenizer.end();
    tokenizer.sink.tokens.take()
}

/// Decoded attributes of one tag, in source order. Names are lowercased.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// First present attribute among `names`. Used for `data_x` / `data-x`
    /// spellings that differ between server templates.
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| self.get(n))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Decodes character references in text lifted out of raw markup by a
/// regex. Unknown references are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(visible_text(&text.replace('<', "&lt;")))
}

/// The text a browser would show for `markup`: tags dropped, script, style
/// and title contents removed, entities decoded.
pub fn visible_text(markup: &str) -> String {
    tokenize(markup)
        .into_iter()
        .filter_map(|t| match t {
            Token::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}
