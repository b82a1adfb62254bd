//! Tunable limits and timings for rooms.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration shared by every room a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Connected players required before the host may start the game.
    pub min_players: usize,
    /// Connected-player capacity. Disconnected seats don't count, so a
    /// full room with a dropped player still admits one newcomer.
    pub max_players: usize,
    /// How long a disconnected player's seat survives.
    #[serde(with = "duration_secs")]
    pub disconnect_grace: Duration,
    /// How long a room with an empty roster survives before eviction.
    #[serde(with = "duration_secs")]
    pub empty_room_grace: Duration,
    /// How long a completed room stays readable before eviction.
    #[serde(with = "duration_secs")]
    pub completed_retention: Duration,
    /// Bound on re-draws when hunting for an unused room code.
    pub max_code_attempts: usize,
    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            disconnect_grace: Duration::from_secs(120),
            empty_room_grace: Duration::from_secs(60),
            completed_retention: Duration::from_secs(300),
            max_code_attempts: 32,
            channel_size: 64,
        }
    }
}

/// Serializes durations as whole seconds, which is how they appear in
/// deployment config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
