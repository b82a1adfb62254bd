//! The room registry: code-to-room routing and room lifecycle.
//!
//! The registry is the only component that knows every active room. It
//! mints unique room codes, spawns room actors, routes lookups, and
//! sweeps out handles whose actors have stopped (eviction or shutdown).
//! It holds no game state itself — a room is its actor.

use std::collections::HashMap;
use std::sync::Arc;

use fableforge_story::{MediaGenerator, StoryGenerator};
use fableforge_types::{GameError, PlayerId, RoomCode};

use crate::{
    spawn_session, GameConfig, JoinReply, PlayerSender, RoomCodeGenerator,
    SessionHandle,
};

/// What creating a room hands back.
pub struct CreatedRoom {
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub handle: SessionHandle,
}

/// Owns the code-to-handle map for all active rooms.
///
/// Callers serialize access themselves (typically behind a
/// `tokio::sync::Mutex` in the transport layer); the registry's own
/// methods are cheap and never await a room.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, SessionHandle>,
    codes: RoomCodeGenerator,
    config: GameConfig,
    generator: Arc<dyn StoryGenerator>,
    media: Option<Arc<dyn MediaGenerator>>,
}

impl RoomRegistry {
    pub fn new(
        config: GameConfig,
        generator: Arc<dyn StoryGenerator>,
        media: Option<Arc<dyn MediaGenerator>>,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            codes: RoomCodeGenerator::new(),
            config,
            generator,
            media,
        }
    }

    /// Creates a room, seats the host, and registers the handle under a
    /// freshly minted unique code.
    pub fn create(
        &mut self,
        host_username: &str,
        theme: Option<String>,
        host_sender: PlayerSender,
    ) -> Result<CreatedRoom, GameError> {
        self.sweep();
        let room_code = self.unique_code()?;

        let (handle, reply) = spawn_session(
            room_code.clone(),
            theme,
            self.config.clone(),
            Arc::clone(&self.generator),
            self.media.as_ref().map(Arc::clone),
            host_username,
            host_sender,
        )?;
        tracing::info!(room = %room_code, host = %reply.player_id, "room created");

        self.rooms.insert(room_code.clone(), handle.clone());
        Ok(CreatedRoom {
            room_code,
            host_id: reply.player_id,
            handle,
        })
    }

    /// Resolves a room code to a live handle. A code whose actor has
    /// stopped resolves to [`GameError::GameNotFound`], same as a code
    /// that never existed.
    pub fn lookup(&self, room_code: &RoomCode) -> Result<SessionHandle, GameError> {
        match self.rooms.get(room_code) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            _ => Err(GameError::GameNotFound(room_code.clone())),
        }
    }

    /// Convenience: resolve and join in one call.
    pub async fn join(
        &self,
        room_code: &RoomCode,
        username: &str,
        sender: PlayerSender,
    ) -> Result<JoinReply, GameError> {
        self.lookup(room_code)?.join(username, sender).await
    }

    /// Forcibly removes a room, asking its actor to stop.
    pub async fn evict(&mut self, room_code: &RoomCode) -> bool {
        match self.rooms.remove(room_code) {
            Some(handle) => {
                handle.shutdown().await;
                tracing::info!(room = %room_code, "room evicted by registry");
                true
            }
            None => false,
        }
    }

    /// Drops handles whose actors have stopped on their own, freeing
    /// their codes for reuse.
    pub fn sweep(&mut self) {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        let swept = before - self.rooms.len();
        if swept > 0 {
            tracing::debug!(swept, "swept stopped rooms");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }

    /// Draws codes until one is unused among active rooms. Bounded so a
    /// pathologically full code space fails loudly instead of spinning.
    fn unique_code(&self) -> Result<RoomCode, GameError> {
        for _ in 0..self.config.max_code_attempts {
            let code = self.codes.generate();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(GameError::unknown("room code space exhausted"))
    }
}
