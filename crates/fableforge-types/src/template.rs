//! Story content types: templates, blanks, submissions, completed stories.
//!
//! A [`StoryTemplate`] arrives from the content generator and is immutable
//! from then on. Players fill its blanks with [`WordSubmission`]s, and the
//! fill engine turns the pair into a [`CompletedStory`] whose highlight
//! ranges attribute each inserted word to the player who supplied it.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{BlankId, ParagraphId, PlayerId, SubmissionId, TemplateId};

/// The closed set of grammatical categories a blank can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordType {
    Noun,
    PluralNoun,
    Verb,
    PastTenseVerb,
    Adjective,
    Adverb,
    Place,
    Person,
    Animal,
    Food,
    Color,
    Exclamation,
}

impl WordType {
    /// Human-readable label, used in prompts and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::PluralNoun => "plural noun",
            Self::Verb => "verb",
            Self::PastTenseVerb => "past-tense verb",
            Self::Adjective => "adjective",
            Self::Adverb => "adverb",
            Self::Place => "place",
            Self::Person => "person",
            Self::Animal => "animal",
            Self::Food => "food",
            Self::Color => "color",
            Self::Exclamation => "exclamation",
        }
    }
}

impl fmt::Display for WordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Story difficulty, chosen by the content generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A typed placeholder position within a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBlank {
    /// Unique across the whole template.
    pub id: BlankId,
    pub word_type: WordType,
    /// Index within the owning paragraph's blank ordering.
    pub position: usize,
}

/// One paragraph of a story template. `text` contains one positional
/// placeholder marker per blank (`{{<blank-id>}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: ParagraphId,
    pub text: String,
    /// Ordered by `position`.
    pub word_blanks: Vec<WordBlank>,
    /// Prompt handed to the image generator for this paragraph.
    pub image_prompt: String,
}

/// A story template produced by the content generator. Immutable once
/// generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryTemplate {
    pub id: TemplateId,
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
    /// Must equal the sum of blanks across all paragraphs.
    pub total_word_blanks: usize,
    pub theme: String,
    pub difficulty: Difficulty,
}

impl StoryTemplate {
    /// Looks up a blank by id across all paragraphs.
    pub fn blank(&self, id: &BlankId) -> Option<&WordBlank> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.word_blanks.iter())
            .find(|b| &b.id == id)
    }

    /// Counts the blanks actually present in the paragraphs, independent
    /// of the `total_word_blanks` field the generator claimed.
    pub fn count_blanks(&self) -> usize {
        self.paragraphs.iter().map(|p| p.word_blanks.len()).sum()
    }
}

/// A player's accepted word for one blank. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSubmission {
    pub id: SubmissionId,
    pub word_blank_id: BlankId,
    pub player_id: PlayerId,
    /// Username snapshot at submission time; survives later renames
    /// or departures.
    pub player_username: String,
    pub word: String,
    pub word_type: WordType,
    pub submitted_at: SystemTime,
}

/// A text range in a completed paragraph attributing a span to the
/// player who supplied that word. Indices are byte offsets into the
/// final (post-substitution) paragraph text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordHighlight {
    pub word: String,
    pub player_username: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// A paragraph with every blank replaced by its submitted word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedParagraph {
    pub id: ParagraphId,
    pub text: String,
    /// Filled asynchronously by the image generator; `None` until then.
    pub image_url: Option<String>,
    /// Non-overlapping, sorted ascending by `start_index`.
    pub word_highlights: Vec<WordHighlight>,
}

/// The fully assembled story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedStory {
    pub title: String,
    pub paragraphs: Vec<CompletedParagraph>,
}
