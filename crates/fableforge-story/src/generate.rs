//! Collaborator traits for external content generation.
//!
//! Fableforge treats AI content generation as a black box behind these
//! traits. The room actor holds them as `Arc<dyn ...>` and calls them
//! from spawned tasks so the per-room serialization point is never held
//! across a generation call. Failures surface as
//! [`GameError::AiService`] and are not retried by the core — retry
//! policy, if any, belongs to the implementation.

use async_trait::async_trait;
use fableforge_types::{
    CompletedStory, GameError, Paragraph, StoryTemplate, WordSubmission,
};

use crate::fill_story;

/// Produces story templates and assembles completed stories.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Generates a fresh template for the given theme and player count.
    async fn generate_template(
        &self,
        theme: Option<&str>,
        player_count: usize,
    ) -> Result<StoryTemplate, GameError>;

    /// Assembles the completed story from a template and a complete set
    /// of submissions.
    ///
    /// The default implementation runs the deterministic fill engine
    /// ([`fill_story`]); implementations backed by a generation service
    /// may override it to embellish the narrative, as long as the
    /// highlight guarantees hold.
    async fn fill_template(
        &self,
        template: &StoryTemplate,
        submissions: &[WordSubmission],
    ) -> Result<CompletedStory, GameError> {
        fill_story(template, submissions)
    }
}

/// Produces illustration URLs for story paragraphs.
///
/// Image generation is asynchronous and keyed by paragraph id; the core
/// stores the returned URL and never blocks a state transition on it.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn paragraph_image(
        &self,
        paragraph: &Paragraph,
    ) -> Result<String, GameError>;
}
