//! Session data model: players, the lifecycle state machine enum, and
//! the per-room [`GameSession`] record.
//!
//! `GameSession` is plain data plus read helpers. All mutation goes
//! through the session state machine in `fableforge-room`, which owns
//! exactly one `GameSession` per room.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{
    BlankId, CompletedStory, PlayerId, RoomCode, SessionId, StoryTemplate,
    WordSubmission,
};

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The lifecycle state of a game session.
///
/// Transitions are strictly one-directional — no state is ever re-entered:
///
/// ```text
/// WaitingForPlayers → CollectingWords → GeneratingStory
///     → DisplayingStory → CreatingVideo → Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    WaitingForPlayers,
    CollectingWords,
    GeneratingStory,
    DisplayingStory,
    CreatingVideo,
    Completed,
}

impl GameState {
    /// The next state in the strict ordering, or `None` at the terminal.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::CollectingWords),
            Self::CollectingWords => Some(Self::GeneratingStory),
            Self::GeneratingStory => Some(Self::DisplayingStory),
            Self::DisplayingStory => Some(Self::CreatingVideo),
            Self::CreatingVideo => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Returns `true` for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WaitingForPlayers => "waiting_for_players",
            Self::CollectingWords => "collecting_words",
            Self::GeneratingStory => "generating_story",
            Self::DisplayingStory => "displaying_story",
            Self::CreatingVideo => "creating_video",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One seat in a game session.
///
/// A player is never silently removed: transport loss only flips
/// `is_connected`, preserving the seat and contributed words until either
/// an explicit leave or the reconnection grace window elapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Display label only — untrusted, no identity semantics.
    pub username: String,
    /// Exactly one player has this set while the roster is non-empty.
    pub is_host: bool,
    pub is_connected: bool,
    pub words_contributed: u32,
    pub joined_at: SystemTime,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// The full record of one room's game.
///
/// Invariants (enforced by the session state machine):
/// - `host_id` references a player in `players` whenever the roster is
///   non-empty, and exactly that player has `is_host == true`;
/// - `players` keeps insertion order (join order);
/// - `word_submissions` is append-only with at most one entry per blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub game_state: GameState,
    /// Requested theme, forwarded to the content generator.
    pub theme: Option<String>,
    pub story_template: Option<StoryTemplate>,
    pub word_submissions: Vec<WordSubmission>,
    pub completed_story: Option<CompletedStory>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl GameSession {
    /// Looks up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Mutable lookup by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Looks up a player by username (case-sensitive display label).
    pub fn player_by_username(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    /// Number of currently connected players.
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected).count()
    }

    /// The current host, if the roster is non-empty.
    pub fn host(&self) -> Option<&Player> {
        self.player(self.host_id)
    }

    /// The accepted submission for a blank, if any.
    pub fn submission_for(&self, blank_id: &BlankId) -> Option<&WordSubmission> {
        self.word_submissions
            .iter()
            .find(|s| &s.word_blank_id == blank_id)
    }

    /// Returns `true` once every blank of the active template has an
    /// accepted submission. `false` when no template is active.
    pub fn all_blanks_filled(&self) -> bool {
        match &self.story_template {
            Some(t) => self.word_submissions.len() == t.total_word_blanks,
            None => false,
        }
    }

    /// Bumps `updated_at`. Called by the state machine after every
    /// accepted mutation.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}
