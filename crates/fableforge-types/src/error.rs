//! The closed error taxonomy for Fableforge.
//!
//! One enum covers every failure the core can surface. Each variant has
//! a machine-readable code ([`GameError::code`]) and an HTTP-style status
//! class ([`GameError::status`]) so transports can map errors uniformly
//! without inspecting variants.
//!
//! Unclassified failures are wrapped as [`GameError::Unknown`] and are
//! fatal only to the operation that triggered them — never to the room.

use crate::{PlayerId, RoomCode};

/// An arbitrary underlying cause, preserved for diagnostics only.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every error the Fableforge core can return.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Malformed input, an out-of-order transition, or a duplicate
    /// submission. Locally recoverable; never retried automatically.
    #[error("{0}")]
    Validation(String),

    /// The room code is unknown or the room has been evicted.
    #[error("game {0} not found")]
    GameNotFound(RoomCode),

    /// The room's connected-player count has reached capacity.
    #[error("game {0} is full")]
    GameFull(RoomCode),

    /// The player is not part of this session.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// A connected player already uses this username in the session.
    #[error("username {0:?} is already taken")]
    UsernameConflict(String),

    /// The content generation collaborator failed. The display message
    /// is deliberately generic; the original cause is kept as `source`
    /// for diagnostics and never shown to players.
    #[error("story service is temporarily unavailable")]
    AiService {
        #[source]
        source: Option<Cause>,
    },

    /// Anything that doesn't fit the taxonomy. Fatal to the triggering
    /// operation only.
    #[error("internal error")]
    Unknown {
        #[source]
        source: Option<Cause>,
    },
}

impl GameError {
    /// Shorthand for a [`GameError::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wraps a collaborator failure, preserving the cause internally.
    pub fn ai_service(source: impl Into<Cause>) -> Self {
        Self::AiService {
            source: Some(source.into()),
        }
    }

    /// A collaborator failure with no further detail.
    pub fn ai_service_unavailable() -> Self {
        Self::AiService { source: None }
    }

    /// Wraps an unclassified failure.
    pub fn unknown(source: impl Into<Cause>) -> Self {
        Self::Unknown {
            source: Some(source.into()),
        }
    }

    /// The machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::GameNotFound(_) => "GAME_NOT_FOUND",
            Self::GameFull(_) => "GAME_FULL",
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::UsernameConflict(_) => "USERNAME_CONFLICT",
            Self::AiService { .. } => "AI_SERVICE_ERROR",
            Self::Unknown { .. } => "UNKNOWN_ERROR",
        }
    }

    /// The suggested HTTP-style status class for this variant.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::GameNotFound(_) | Self::PlayerNotFound(_) => 404,
            Self::GameFull(_) | Self::UsernameConflict(_) => 409,
            Self::AiService { .. } => 503,
            Self::Unknown { .. } => 500,
        }
    }
}
