//! Status colours and the highlight spans painted over a paragraph.

use egui::Color32;
use std::ops::Range;

use crate::types::{Segment, TermStatus};

/// ARGB for each status. Known is the learning-4 colour at 25% alpha;
/// ignored and well-known terms are not highlighted at all.
pub fn argb_for(status: TermStatus) -> u32 {
    match status {
        TermStatus::Unknown => 0xFF80_95FF,
        TermStatus::Learning1 => 0xFFB4_6B7A,
        TermStatus::Learning2 => 0xFFBA_8050,
        TermStatus::Learning3 => 0xFFBD_9C7B,
        TermStatus::Learning4 => 0xFF75_6D6B,
        TermStatus::Known => 0x4075_6D6B,
        TermStatus::Ignored | TermStatus::WellKnown | TermStatus::Other(_) => 0x0000_0000,
    }
}

pub fn argb_to_color(argb: u32) -> Color32 {
    let [a, r, g, b] = argb.to_be_bytes();
    if a == 0 {
        return Color32::TRANSPARENT;
    }
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

pub fn color_for(status: TermStatus) -> Color32 {
    argb_to_color(argb_for(status))
}

/// Text colour kept on unknown words when backgrounds are hidden, so the
/// reader can still tell they are clickable.
pub fn unknown_foreground() -> Color32 {
    color_for(TermStatus::Unknown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Background(Color32),
    Foreground(Color32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub range: Range<usize>, // byte range in the paragraph text
    pub style: SpanStyle,
}

/// Anything highlight spans can be painted on.
pub trait HighlightTarget {
    /// Drops every span previously added through `add_highlight_span`.
    fn remove_highlight_spans(&mut self);
    fn add_highlight_span(&mut self, span: StyledSpan);
}

/// A paragraph's text plus its highlight spans; what the UI lays out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledText {
    pub text: String,
    spans: Vec<StyledSpan>,
}

impl StyledText {
    pub fn new(text: impl Into<String>) -> Self {
        StyledText { text: text.into(), spans: Vec::new() }
    }

    pub fn spans(&self) -> &[StyledSpan] {
        &self.spans
    }

    pub fn background_at(&self, offset: usize) -> Option<Color32> {
        self.spans.iter().find_map(|s| match s.style {
            SpanStyle::Background(c) if s.range.contains(&offset) => Some(c),
            _ => None,
        })
    }

    pub fn foreground_at(&self, offset: usize) -> Option<Color32> {
        self.spans.iter().find_map(|s| match s.style {
            SpanStyle::Foreground(c) if s.range.contains(&offset) => Some(c),
            _ => None,
        })
    }
}

impl HighlightTarget for StyledText {
    fn remove_highlight_spans(&mut self) {
        self.spans.clear();
    }

    fn add_highlight_span(&mut self, span: StyledSpan) {
        self.spans.push(span);
    }
}

/// Repaints `target` for `segments`. Existing highlight spans are removed
/// first, so painting twice with the same flag gives the same result.
pub fn apply_highlights<T: HighlightTarget + ?Sized>(target: &mut T, segments: &[Segment], visible: bool) {
    target.remove_highlight_spans();
    let mut offset = 0;
    for segment in segments {
        let range = offset..offset + segment.text.len();
        offset = range.end;
        if !segment.is_interactive || range.is_empty() {
            continue;
        }
        if visible {
            let color = color_for(segment.status);
            if color != Color32::TRANSPARENT {
                target.add_highlight_span(StyledSpan { range, style: SpanStyle::Background(color) });
            }
        } else if segment.status == TermStatus::Unknown {
            target.add_highlight_span(StyledSpan {
                range,
                style: SpanStyle::Foreground(unknown_foreground()),
            });
        }
    }
}

pub fn styled_paragraph(segments: &[Segment], visible: bool) -> StyledText {
    let mut styled = StyledText::new(segments.iter().map(|s| s.text.as_str()).collect::<String>());
    apply_highlights(&mut styled, segments, visible);
    styled
}
