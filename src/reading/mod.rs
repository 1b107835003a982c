pub mod highlight;
pub mod interaction;
pub mod sentence_grouper;

pub use highlight::{apply_highlights, color_for, styled_paragraph, HighlightTarget, SpanStyle, StyledSpan, StyledText};
pub use interaction::{sentence_context, InteractionIntent, Tap, TapState, TermInteractionController};
pub use sentence_grouper::group;
