//! Core types for Fableforge.
//!
//! This crate defines the shared vocabulary of the system:
//!
//! - **Identifiers** ([`PlayerId`], [`RoomCode`], [`BlankId`], …)
//! - **Data model** ([`GameSession`], [`Player`], [`GameState`],
//!   [`StoryTemplate`], [`WordSubmission`], [`CompletedStory`], …)
//! - **Events** ([`GameEvent`]) — what connected clients observe
//! - **Errors** ([`GameError`]) — the closed error taxonomy
//!
//! It has no async code and no I/O; everything here is plain data that
//! the session, presence, and story layers operate on.

mod error;
mod events;
mod ids;
mod model;
mod template;

pub use error::{Cause, GameError};
pub use events::GameEvent;
pub use ids::{
    BlankId, ParagraphId, PlayerId, RoomCode, SessionId, SubmissionId,
    TemplateId,
};
pub use model::{GameSession, GameState, Player};
pub use template::{
    CompletedParagraph, CompletedStory, Difficulty, Paragraph, StoryTemplate,
    WordBlank, WordHighlight, WordSubmission, WordType,
};
