use crate::types::{Paragraph, SentenceGroup, TextContent};

pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？', '।', '…'];

// Paragraphs at or under both limits are taken to be a single sentence already.
const LARGE_PARAGRAPH_SEGMENTS: usize = 10;
const LARGE_PARAGRAPH_TERMS: usize = 10;

pub fn ends_sentence(text: &str) -> bool {
    text.contains(SENTENCE_TERMINATORS)
}

fn is_large(paragraph: &Paragraph) -> bool {
    paragraph.segments.len() > LARGE_PARAGRAPH_SEGMENTS || paragraph.interactive_count() > LARGE_PARAGRAPH_TERMS
}

/// Splits a page into sentence-sized reading units, in page order.
pub fn group(content: &TextContent) -> Vec<SentenceGroup> {
    let mut groups = Vec::new();
    for paragraph in &content.paragraphs {
        if !is_large(paragraph) {
            if paragraph.interactive_count() == 0 && paragraph.text().trim().is_empty() {
                continue;
            }
            groups.push(vec![paragraph.clone()]);
            continue;
        }
        groups.extend(split_sentences(paragraph).into_iter().map(|p| vec![p]));
    }
    groups
}

/// One sub-paragraph per sentence. A segment holding a terminator closes
/// the sentence after itself, however many terminators it holds.
fn split_sentences(paragraph: &Paragraph) -> Vec<Paragraph> {
    let mut slices: Vec<&[crate::types::Segment]> = Vec::new();
    let mut start = 0;
    for (i, segment) in paragraph.segments.iter().enumerate() {
        if ends_sentence(&segment.text) {
            slices.push(&paragraph.segments[start..=i]);
            start = i + 1;
        }
    }
    if slices.is_empty() {
        // No boundary at all: keep the paragraph whole rather than lose it.
        return vec![paragraph.clone()];
    }
    if start < paragraph.segments.len() {
        slices.push(&paragraph.segments[start..]);
    }

    slices
        .into_iter()
        .filter(|slice| slice.iter().any(|s| s.is_interactive))
        .enumerate()
        .map(|(n, slice)| Paragraph::new(format!("{}_part_{}", paragraph.id, n + 1), slice.to_vec()))
        .collect()
}
