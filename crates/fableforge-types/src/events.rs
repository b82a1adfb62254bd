//! Events broadcast to connected players after each serialized mutation.
//!
//! The room actor pushes one `GameEvent` per observable change onto every
//! connected player's channel. Events are facts about what happened, not
//! commands — a client that misses one can always resync from a snapshot.

use serde::{Deserialize, Serialize};

use crate::{
    BlankId, CompletedStory, GameState, ParagraphId, Player, PlayerId,
    StoryTemplate,
};

/// One observable change to a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined { player: Player },
    PlayerReconnected { player_id: PlayerId },
    PlayerDisconnected { player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
    HostChanged { host_id: PlayerId },
    StateChanged { state: GameState },
    TemplateReady { template: StoryTemplate },
    TemplateFailed { message: String },
    WordAccepted {
        word_blank_id: BlankId,
        player_id: PlayerId,
        /// Blanks still waiting for a word.
        remaining: usize,
    },
    StoryReady { story: CompletedStory },
    StoryFailed { message: String },
    ParagraphImageReady { paragraph_id: ParagraphId, url: String },
}
