//! The template fill engine: substitutes submitted words into a story
//! template and computes per-player highlight ranges.
//!
//! # Offset bookkeeping
//!
//! Placeholder markers rarely have the same length as the words that
//! replace them, so every substitution shifts the offsets of everything
//! after it. The engine first locates every marker in the *template*
//! text, then applies the replacements in **descending** start order —
//! a replacement can then never invalidate a range that hasn't been
//! processed yet. Ascending-order replacement over stale ranges is the
//! classic bug here. Final highlight offsets are computed afterwards in
//! ascending order by accumulating the length deltas, so the emitted
//! highlights are always sorted ascending and non-overlapping.
//!
//! All indices are byte offsets into the final UTF-8 paragraph text.

use std::collections::HashMap;

use fableforge_types::{
    BlankId, CompletedParagraph, CompletedStory, GameError, Paragraph,
    StoryTemplate, WordHighlight, WordSubmission,
};

/// The marker the generator embeds in paragraph text for a blank.
pub fn placeholder(id: &BlankId) -> String {
    format!("{{{{{id}}}}}")
}

/// A located placeholder awaiting replacement, in template-text
/// coordinates.
struct PendingSpan<'a> {
    start: usize,
    marker_len: usize,
    submission: &'a WordSubmission,
}

/// Assembles the completed story from a template and a complete set of
/// submissions (exactly one per blank).
///
/// Completeness is the session state machine's responsibility; a blank
/// without a matching submission here is a contract violation and
/// returns [`GameError::Validation`].
pub fn fill_story(
    template: &StoryTemplate,
    submissions: &[WordSubmission],
) -> Result<CompletedStory, GameError> {
    let by_blank: HashMap<&BlankId, &WordSubmission> = submissions
        .iter()
        .map(|s| (&s.word_blank_id, s))
        .collect();

    let mut paragraphs = Vec::with_capacity(template.paragraphs.len());
    for paragraph in &template.paragraphs {
        paragraphs.push(fill_paragraph(paragraph, &by_blank)?);
    }

    Ok(CompletedStory {
        title: template.title.clone(),
        paragraphs,
    })
}

fn fill_paragraph(
    paragraph: &Paragraph,
    by_blank: &HashMap<&BlankId, &WordSubmission>,
) -> Result<CompletedParagraph, GameError> {
    // Locate every marker against the untouched template text.
    let mut spans = Vec::with_capacity(paragraph.word_blanks.len());
    for blank in &paragraph.word_blanks {
        let submission = by_blank.get(&blank.id).ok_or_else(|| {
            GameError::validation(format!("no submission for blank {}", blank.id))
        })?;
        let marker = placeholder(&blank.id);
        let start = paragraph.text.find(&marker).ok_or_else(|| {
            GameError::validation(format!(
                "blank {} has no marker in paragraph {}",
                blank.id, paragraph.id
            ))
        })?;
        spans.push(PendingSpan {
            start,
            marker_len: marker.len(),
            submission,
        });
    }

    // Replace in descending start order so pending ranges stay valid.
    let mut text = paragraph.text.clone();
    spans.sort_by(|a, b| b.start.cmp(&a.start));
    for span in &spans {
        text.replace_range(
            span.start..span.start + span.marker_len,
            &span.submission.word,
        );
    }

    // Emit highlights ascending, accumulating the shift each earlier
    // replacement introduced.
    spans.sort_by_key(|s| s.start);
    let mut highlights = Vec::with_capacity(spans.len());
    let mut shift: isize = 0;
    for span in &spans {
        let word_len = span.submission.word.len();
        let start = (span.start as isize + shift) as usize;
        highlights.push(WordHighlight {
            word: span.submission.word.clone(),
            player_username: span.submission.player_username.clone(),
            start_index: start,
            end_index: start + word_len,
        });
        shift += word_len as isize - span.marker_len as isize;
    }

    Ok(CompletedParagraph {
        id: paragraph.id.clone(),
        text,
        image_url: None,
        word_highlights: highlights,
    })
}
