//! Room coordination for Fableforge: the state machine, the per-room
//! actor, and the registry that routes room codes to actors.
//!
//! Layering, inside out:
//!
//! ```text
//! SessionMachine      pure rules, no I/O, exhaustively unit-tested
//!   └─ RoomActor      one task per room, serializes commands,
//!      │              owns presence + eviction deadlines
//!      └─ RoomRegistry mints codes, spawns actors, sweeps the dead
//! ```
//!
//! Transports talk to a [`SessionHandle`] and receive [`GameEvent`]s
//! (from `fableforge-types`) on the channel they registered at join.

mod actor;
mod code;
mod config;
mod machine;
mod registry;

pub use actor::{
    spawn_session, JoinReply, PlayerSender, RoomCommand, SessionHandle,
};
pub use code::{RoomCodeGenerator, CODE_ALPHABET, CODE_LENGTH};
pub use config::GameConfig;
pub use machine::{JoinOutcome, SessionMachine};
pub use registry::{CreatedRoom, RoomRegistry};
