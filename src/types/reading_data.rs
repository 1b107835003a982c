use serde::{Deserialize, Serialize};

/// Learning status the server attaches to a term.
///
/// The wire codes are 0 (unknown), 1..=4 (learning), 5 (known),
/// 98 (ignored) and 99 (well known). Anything else is kept as `Other`
/// so a template change on the server never loses information.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TermStatus {
    #[default]
    Unknown,
    Learning1,
    Learning2,
    Learning3,
    Learning4,
    Known,
    Ignored,
    WellKnown,
    Other(u16),
}

impl TermStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => TermStatus::Unknown,
            1 => TermStatus::Learning1,
            2 => TermStatus::Learning2,
            3 => TermStatus::Learning3,
            4 => TermStatus::Learning4,
            5 => TermStatus::Known,
            98 => TermStatus::Ignored,
            99 => TermStatus::WellKnown,
            other => TermStatus::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            TermStatus::Unknown => 0,
            TermStatus::Learning1 => 1,
            TermStatus::Learning2 => 2,
            TermStatus::Learning3 => 3,
            TermStatus::Learning4 => 4,
            TermStatus::Known => 5,
            TermStatus::Ignored => 98,
            TermStatus::WellKnown => 99,
            TermStatus::Other(code) => code,
        }
    }
}

/// Page-level facts recovered from one page of markup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub book_id: u64,
    pub page_num: u32,   // 1-based
    pub page_count: u32, // >= page_num
    pub has_audio: bool,
    pub is_right_to_left: bool,
    pub language_id: u32, // 0 = unknown
    pub language_name: String,
}

pub const DEFAULT_PAGE_COUNT: u32 = 10;
pub const DEFAULT_LANGUAGE_ID: u32 = 1;

impl PageMetadata {
    /// What the reader gets when nothing at all could be recovered.
    pub fn fallback(book_id: u64, fallback_page_num: u32) -> Self {
        let page_num = fallback_page_num.max(1);
        PageMetadata {
            book_id,
            page_num,
            page_count: DEFAULT_PAGE_COUNT.max(page_num),
            has_audio: false,
            is_right_to_left: false,
            language_id: DEFAULT_LANGUAGE_ID,
            language_name: String::new(),
        }
    }
}

/// One run of text from the page: a tracked word, an untracked word or
/// the literal text (spaces, punctuation) between words.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    pub text: String,
    pub is_interactive: bool,
    pub status: TermStatus,
    pub term_id: u64, // 0 = not a tracked term
    pub language_id: u32,
    pub translation: String,
    pub parent_term_ids: Vec<u64>,
    pub parent_translations: Vec<String>,
}

impl Segment {
    pub fn literal(text: impl Into<String>, language_id: u32) -> Self {
        Segment {
            text: text.into(),
            language_id,
            ..Default::default()
        }
    }

    pub fn word(text: impl Into<String>, status: TermStatus, term_id: u64, language_id: u32) -> Self {
        Segment {
            text: text.into(),
            is_interactive: true,
            status,
            term_id,
            language_id,
            ..Default::default()
        }
    }

    /// True when the text has no letters or digits at all.
    pub fn is_punctuation_only(&self) -> bool {
        !self.text.chars().any(char::is_alphanumeric)
    }

    /// Something the reader can tap on.
    pub fn is_tappable(&self) -> bool {
        self.is_interactive && !self.is_punctuation_only()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub id: String,
    pub segments: Vec<Segment>,
}

impl Paragraph {
    pub fn new(id: impl Into<String>, segments: Vec<Segment>) -> Self {
        Paragraph { id: id.into(), segments }
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn interactive_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_interactive).count()
    }

    /// Byte offset of every segment inside `text()`.
    pub fn segment_offsets(&self) -> Vec<usize> {
        let mut offset = 0;
        self.segments
            .iter()
            .map(|s| {
                let start = offset;
                offset += s.text.len();
                start
            })
            .collect()
    }

    pub fn segment_index_at_offset(&self, offset: usize) -> Option<usize> {
        self.segment_offsets().iter().position(|&start| start == offset)
    }
}

/// A status/id patch for one segment, located by text offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermUpdate {
    pub paragraph_index: usize,
    pub offset: usize,
    pub status: TermStatus,
    pub term_id: u64,
    pub translation: String,
}

/// One parsed page, the unit handed to rendering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TextContent {
    pub paragraphs: Vec<Paragraph>,
    pub metadata: PageMetadata,
}

impl TextContent {
    /// Patches segments in place. Segments are never added or removed;
    /// an update whose offset no longer starts a segment is skipped.
    /// Returns how many segments changed.
    pub fn apply_term_updates(&mut self, updates: &[TermUpdate]) -> usize {
        let mut changed = 0;
        for update in updates {
            let Some(paragraph) = self.paragraphs.get_mut(update.paragraph_index) else {
                continue;
            };
            let Some(idx) = paragraph.segment_index_at_offset(update.offset) else {
                continue;
            };
            let segment = &mut paragraph.segments[idx];
            if segment.status == update.status
                && segment.term_id == update.term_id
                && segment.translation == update.translation
            {
                continue;
            }
            segment.status = update.status;
            segment.term_id = update.term_id;
            segment.translation = update.translation.clone();
            if segment.term_id > 0 {
                segment.is_interactive = true;
            }
            changed += 1;
        }
        changed
    }

    /// Updates that would bring `self` in line with a freshly parsed copy of
    /// the same page. Only segments whose text and offset still line up are
    /// compared.
    pub fn term_updates_from(&self, fresh: &TextContent) -> Vec<TermUpdate> {
        let mut updates = Vec::new();
        for (p_idx, (current, newer)) in self.paragraphs.iter().zip(&fresh.paragraphs).enumerate() {
            let current_offsets = current.segment_offsets();
            let newer_offsets = newer.segment_offsets();
            for (c_idx, segment) in current.segments.iter().enumerate() {
                let offset = current_offsets[c_idx];
                let Some(n_idx) = newer_offsets.iter().position(|&o| o == offset) else {
                    continue;
                };
                let candidate = &newer.segments[n_idx];
                if candidate.text != segment.text {
                    continue;
                }
                if candidate.status != segment.status
                    || candidate.term_id != segment.term_id
                    || candidate.translation != segment.translation
                {
                    updates.push(TermUpdate {
                        paragraph_index: p_idx,
                        offset,
                        status: candidate.status,
                        term_id: candidate.term_id,
                        translation: candidate.translation.clone(),
                    });
                }
            }
        }
        updates
    }
}

/// One navigable sentence-reading unit. Derived by the grouper, never stored.
pub type SentenceGroup = Vec<Paragraph>;

/// Where a tapped segment lives in the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub paragraph: usize,
    pub segment: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParentTerm {
    pub term_id: u64,
    pub translation: String,
}

/// Transient view-model for a tapped term. Lives as long as the interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TermData {
    pub term_id: u64,
    pub term: String,
    pub language_id: u32,
    pub translation: String,
    pub status: TermStatus,
    pub parents: Vec<ParentTerm>,
    pub tap_x: f32,
    pub tap_y: f32,
    pub sentence_context: Option<String>,
}

impl TermData {
    pub fn from_segment(segment: &Segment, tap_x: f32, tap_y: f32) -> Self {
        let parents = segment
            .parent_term_ids
            .iter()
            .enumerate()
            .map(|(i, &term_id)| ParentTerm {
                term_id,
                translation: segment.parent_translations.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        TermData {
            term_id: segment.term_id,
            term: segment.text.clone(),
            language_id: segment.language_id,
            translation: segment.translation.clone(),
            status: segment.status,
            parents,
            tap_x,
            tap_y,
            sentence_context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TextContent {
        TextContent {
            paragraphs: vec![Paragraph::new(
                "p0",
                vec![
                    Segment::word("Hola", TermStatus::Unknown, 0, 1),
                    Segment::literal(", ", 1),
                    Segment::word("mundo", TermStatus::Learning2, 7, 1),
                ],
            )],
            metadata: PageMetadata::fallback(1, 1),
        }
    }

    #[test]
    fn status_codes_survive_unknown_values() {
        assert_eq!(TermStatus::from_code(98), TermStatus::Ignored);
        assert_eq!(TermStatus::from_code(7), TermStatus::Other(7));
        assert_eq!(TermStatus::Other(7).code(), 7);
    }

    #[test]
    fn fallback_metadata_keeps_page_in_range() {
        let meta = PageMetadata::fallback(3, 14);
        assert_eq!(meta.page_num, 14);
        assert!(meta.page_count >= meta.page_num);
        assert_eq!(PageMetadata::fallback(3, 0).page_num, 1);
    }

    #[test]
    fn updates_patch_in_place_without_changing_segment_count() {
        let mut content = sample();
        let update = TermUpdate {
            paragraph_index: 0,
            offset: 0,
            status: TermStatus::Learning1,
            term_id: 42,
            translation: "hello".into(),
        };
        assert_eq!(content.apply_term_updates(&[update]), 1);
        let p = &content.paragraphs[0];
        assert_eq!(p.segments.len(), 3);
        assert_eq!(p.segments[0].term_id, 42);
        assert_eq!(p.segments[0].status, TermStatus::Learning1);
    }

    #[test]
    fn misaligned_update_is_skipped() {
        let mut content = sample();
        let update = TermUpdate {
            paragraph_index: 0,
            offset: 2,
            status: TermStatus::Known,
            term_id: 1,
            translation: String::new(),
        };
        assert_eq!(content.apply_term_updates(&[update]), 0);
    }

    #[test]
    fn diff_finds_changed_terms_only() {
        let current = sample();
        let mut fresh = sample();
        fresh.paragraphs[0].segments[2].status = TermStatus::Known;
        let updates = current.term_updates_from(&fresh);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].offset, "Hola, ".len());
        assert_eq!(updates[0].status, TermStatus::Known);
    }
}
