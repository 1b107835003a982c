//! Single/double tap state machine over taps on page segments.
//!
//! The controller is clock-agnostic: callers pass `now` in and ask for the
//! pending deadline, so the engine drives expiry from a timer task and the
//! tests drive it by hand.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::sentence_grouper::ends_sentence;
use crate::types::{Paragraph, SegmentRef, TermData};

pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub target: SegmentRef,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionIntent {
    /// Single tap settled; show the term's popup.
    ShowPopup(TermData),
    /// Double tap; open the editor. Carries the sentence around the term.
    OpenEditor(TermData),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TapState {
    Idle,
    SingleTapPending {
        target: SegmentRef,
        term: TermData,
        deadline: Instant,
    },
}

#[derive(Debug)]
pub struct TermInteractionController {
    double_tap_window: Duration,
    state: TapState,
}

impl Default for TermInteractionController {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_TAP_WINDOW)
    }
}

impl TermInteractionController {
    pub fn new(double_tap_window: Duration) -> Self {
        TermInteractionController { double_tap_window, state: TapState::Idle }
    }

    pub fn state(&self) -> &TapState {
        &self.state
    }

    pub fn double_tap_window(&self) -> Duration {
        self.double_tap_window
    }

    /// When the pending single tap turns into a popup, if one is pending.
    pub fn pending_deadline(&self) -> Option<Instant> {
        match &self.state {
            TapState::Idle => None,
            TapState::SingleTapPending { deadline, .. } => Some(*deadline),
        }
    }

    /// Drops any pending tap without emitting anything. Used when the page
    /// under the tap goes away.
    pub fn reset(&mut self) {
        self.state = TapState::Idle;
    }

    /// Feeds one tap. Returns the intents it settles, in order: a tap on a
    /// different segment first fires the popup still pending for the old one.
    pub fn on_tap(&mut self, paragraphs: &[Paragraph], tap: Tap, now: Instant) -> Vec<InteractionIntent> {
        let Some(segment) = paragraphs
            .get(tap.target.paragraph)
            .and_then(|p| p.segments.get(tap.target.segment))
        else {
            debug!(segment = ?tap.target, "tap outside the page ignored");
            return Vec::new();
        };
        if !segment.is_tappable() {
            debug!(text = %segment.text, "tap on non-interactive segment ignored");
            return Vec::new();
        }

        let mut intents = Vec::new();
        match std::mem::replace(&mut self.state, TapState::Idle) {
            TapState::SingleTapPending { target, mut term, deadline } if target == tap.target && now < deadline => {
                term.sentence_context = sentence_context(&paragraphs[target.paragraph], target.segment);
                intents.push(InteractionIntent::OpenEditor(term));
                return intents;
            }
            TapState::SingleTapPending { term, .. } => intents.push(InteractionIntent::ShowPopup(term)),
            TapState::Idle => {}
        }

        self.state = TapState::SingleTapPending {
            target: tap.target,
            term: TermData::from_segment(segment, tap.x, tap.y),
            deadline: now + self.double_tap_window,
        };
        intents
    }

    /// Fires the pending popup once its window has elapsed.
    pub fn expire(&mut self, now: Instant) -> Option<InteractionIntent> {
        match &self.state {
            TapState::SingleTapPending { deadline, .. } if now >= *deadline => {}
            _ => return None,
        }
        match std::mem::replace(&mut self.state, TapState::Idle) {
            TapState::SingleTapPending { term, .. } => Some(InteractionIntent::ShowPopup(term)),
            TapState::Idle => None,
        }
    }
}

/// The sentence around segment `idx`, taken from the rendered paragraph:
/// from just after the previous terminator up to and including the next.
pub fn sentence_context(paragraph: &Paragraph, idx: usize) -> Option<String> {
    let segments = &paragraph.segments;
    if idx >= segments.len() {
        return None;
    }
    let start = segments[..idx]
        .iter()
        .rposition(|s| ends_sentence(&s.text))
        .map_or(0, |i| i + 1);
    let end = segments[idx..]
        .iter()
        .position(|s| ends_sentence(&s.text))
        .map_or(segments.len(), |i| idx + i + 1);

    let sentence: String = segments[start..end].iter().map(|s| s.text.as_str()).collect();
    let sentence = sentence.trim();
    (!sentence.is_empty()).then(|| sentence.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Segment, TermStatus};

    fn page() -> Vec<Paragraph> {
        vec![Paragraph::new(
            "p0",
            vec![
                Segment::word("El", TermStatus::Known, 1, 1),
                Segment::literal(" ", 1),
                Segment::word("gato", TermStatus::Unknown, 2, 1),
                Segment::literal(". ", 1),
                Segment::word("Duerme", TermStatus::Learning1, 3, 1),
                Segment::literal(" ", 1),
                Segment::word("mucho", TermStatus::Learning2, 4, 1),
                Segment::literal("!", 1),
            ],
        )]
    }

    fn tap(segment: usize) -> Tap {
        Tap { target: SegmentRef { paragraph: 0, segment }, x: 10.0, y: 20.0 }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn double_tap_emits_one_edit_and_no_popup() {
        let page = page();
        let mut ctl = TermInteractionController::default();
        let t0 = Instant::now();

        assert!(ctl.on_tap(&page, tap(2), t0).is_empty());
        let intents = ctl.on_tap(&page, tap(2), t0 + ms(120));
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            InteractionIntent::OpenEditor(term) => {
                assert_eq!(term.term_id, 2);
                assert_eq!(term.sentence_context.as_deref(), Some("El gato."));
            }
            other => panic!("expected editor intent, got {other:?}"),
        }
        assert_eq!(ctl.state(), &TapState::Idle);
        assert_eq!(ctl.expire(t0 + ms(1000)), None);
    }

    #[test]
    fn single_tap_fires_popup_after_window() {
        let page = page();
        let mut ctl = TermInteractionController::new(ms(300));
        let t0 = Instant::now();

        ctl.on_tap(&page, tap(4), t0);
        assert_eq!(ctl.pending_deadline(), Some(t0 + ms(300)));
        assert_eq!(ctl.expire(t0 + ms(299)), None);
        match ctl.expire(t0 + ms(300)) {
            Some(InteractionIntent::ShowPopup(term)) => {
                assert_eq!(term.term, "Duerme");
                assert_eq!((term.tap_x, term.tap_y), (10.0, 20.0));
                assert_eq!(term.sentence_context, None);
            }
            other => panic!("expected popup, got {other:?}"),
        }
        assert_eq!(ctl.pending_deadline(), None);
    }

    #[test]
    fn second_tap_after_window_is_a_new_single_tap() {
        let page = page();
        let mut ctl = TermInteractionController::new(ms(300));
        let t0 = Instant::now();

        ctl.on_tap(&page, tap(2), t0);
        let intents = ctl.on_tap(&page, tap(2), t0 + ms(400));
        assert!(matches!(intents.as_slice(), [InteractionIntent::ShowPopup(_)]));
        assert!(matches!(ctl.state(), TapState::SingleTapPending { .. }));
    }

    #[test]
    fn tap_on_other_segment_settles_the_first() {
        let page = page();
        let mut ctl = TermInteractionController::default();
        let t0 = Instant::now();

        ctl.on_tap(&page, tap(2), t0);
        let intents = ctl.on_tap(&page, tap(6), t0 + ms(50));
        match intents.as_slice() {
            [InteractionIntent::ShowPopup(term)] => assert_eq!(term.term_id, 2),
            other => panic!("unexpected intents {other:?}"),
        }
        match ctl.state() {
            TapState::SingleTapPending { target, .. } => assert_eq!(target.segment, 6),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn punctuation_and_out_of_range_taps_are_ignored() {
        let page = page();
        let mut ctl = TermInteractionController::default();
        let t0 = Instant::now();

        ctl.on_tap(&page, tap(2), t0);
        let before = ctl.state().clone();
        assert!(ctl.on_tap(&page, tap(3), t0 + ms(10)).is_empty());
        assert!(ctl.on_tap(&page, tap(40), t0 + ms(20)).is_empty());
        assert_eq!(ctl.state(), &before);
    }

    #[test]
    fn sentence_context_spans_terminators() {
        let p = &page()[0];
        assert_eq!(sentence_context(p, 0).as_deref(), Some("El gato."));
        assert_eq!(sentence_context(p, 6).as_deref(), Some("Duerme mucho!"));
        assert_eq!(sentence_context(p, 99), None);
    }
}
