//! Ordered matcher chains for fields the server markup carries in more than
//! one place depending on template version and page type.
//!
//! A chain is plain data: a list of `(name, pattern)` pairs tried in order.
//! Supporting a new template means adding a row, not a branch.

use regex::Regex;
use tracing::warn;

use super::markup::{decode_entities, visible_text};

/// One row of a chain. The pattern's first capture group holds the raw
/// value; presence chains need no group.
#[derive(Debug, Clone, Copy)]
pub struct MatcherSpec {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// A value recovered by a chain, with the matcher that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub matcher: &'static str,
}

pub struct FieldResolver<T> {
    field: &'static str,
    matchers: Vec<(&'static str, Regex)>,
    extract: fn(&str) -> Option<T>,
}

impl<T> FieldResolver<T> {
    /// Builds a chain. Rows whose pattern does not compile are dropped with a
    /// warning so one bad row cannot take the whole field down.
    pub fn new(field: &'static str, specs: &[MatcherSpec], extract: fn(&str) -> Option<T>) -> Self {
        let matchers = specs
            .iter()
            .filter_map(|spec| match Regex::new(spec.pattern) {
                Ok(re) => Some((spec.name, re)),
                Err(e) => {
                    warn!(field, matcher = spec.name, error = %e, "skipping invalid matcher");
                    None
                }
            })
            .collect();
        FieldResolver { field, matchers, extract }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Tries each matcher in order. A matcher that matches but whose capture
    /// does not extract (e.g. not a number) falls through to the next row.
    pub fn resolve(&self, markup: &str) -> Option<Resolved<T>> {
        for (name, re) in &self.matchers {
            for caps in re.captures_iter(markup) {
                let raw = caps.get(1).or_else(|| caps.get(0)).map_or("", |m| m.as_str());
                if let Some(value) = (self.extract)(raw) {
                    return Some(Resolved { value, matcher: name });
                }
            }
        }
        None
    }
}

impl FieldResolver<bool> {
    /// A chain that answers "is any of these markers present".
    pub fn presence(field: &'static str, specs: &[MatcherSpec]) -> Self {
        FieldResolver::new(field, specs, |_| Some(true))
    }
}

pub fn extract_u32(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Text captured from an attribute value or a text run.
pub fn extract_text(raw: &str) -> Option<String> {
    non_empty(&decode_entities(raw))
}

/// Text captured as a markup fragment: tags dropped, entities decoded once.
pub fn extract_markup_text(raw: &str) -> Option<String> {
    non_empty(&visible_text(raw))
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
