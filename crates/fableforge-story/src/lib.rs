//! Story assembly for Fableforge.
//!
//! Three concerns live here:
//!
//! - [`fill_story`] — the template fill engine: deterministic
//!   substitution of submitted words into a template, with per-player
//!   highlight ranges indexed into the post-substitution text.
//! - [`validate_word`] / [`validate_username`] — syntactic format rules
//!   for player input.
//! - [`StoryGenerator`] / [`MediaGenerator`] — the collaborator traits
//!   behind which all AI content generation hides.

mod fill;
mod generate;
mod words;

pub use fill::{fill_story, placeholder};
pub use generate::{MediaGenerator, StoryGenerator};
pub use words::{
    validate_username, validate_word, MAX_USERNAME_LEN, MAX_WORD_LEN,
};
