//! Presence and reconnection for Fableforge.
//!
//! Two halves of the same contract:
//!
//! - [`PresenceManager`] — the server side: a cancellable grace-window
//!   deadline per disconnected player, drained by the room actor's
//!   select loop.
//! - [`ReconnectBackoff`] / [`reconnect_with_backoff`] — the client
//!   side: capped exponential retry until the grace window is either
//!   beaten or forfeited.

mod backoff;
mod manager;

pub use backoff::{
    reconnect_with_backoff, BackoffPolicy, ReconnectAbandoned,
    ReconnectBackoff,
};
pub use manager::{PresenceConfig, PresenceManager};
