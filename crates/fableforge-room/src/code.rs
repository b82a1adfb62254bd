//! Room code generation.
//!
//! Codes are short, human-shareable, and read aloud across a living
//! room, so the alphabet drops the characters people confuse when
//! shouting: no `I`/`1`/`L`, no `O`/`0`. Uniqueness among active rooms
//! is the registry's job, not the generator's.

use fableforge_types::RoomCode;
use rand::Rng;

/// Length of every room code.
pub const CODE_LENGTH: usize = 6;

/// 31 unambiguous uppercase characters.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Stateless generator of room codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomCodeGenerator;

impl RoomCodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Draws a fresh random code. No uniqueness guarantee; collisions
    /// are resolved by the caller re-drawing.
    pub fn generate(&self) -> RoomCode {
        let mut rng = rand::rng();
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }
}
