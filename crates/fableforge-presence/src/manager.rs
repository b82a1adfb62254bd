//! Server-side presence tracking: the disconnect grace window.
//!
//! When a player's transport drops, their seat and contributed words are
//! retained for a bounded grace window. `PresenceManager` is the
//! scheduler for those windows: one cancellable deadline per player id.
//! It never spawns tasks or fires callbacks itself — the room actor
//! selects on [`PresenceManager::next_deadline`] and drains
//! [`PresenceManager::take_expired`] when it elapses, which makes
//! cancellation on leave/reconnect deterministic (the entry is simply
//! removed before the deadline is ever observed).

use std::collections::HashMap;
use std::time::Duration;

use fableforge_types::PlayerId;
use tokio::time::Instant;

/// Configuration for the disconnect grace window.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// How long a disconnected player's seat is preserved before the
    /// disconnect is treated as a permanent departure.
    pub disconnect_grace: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            // Order of minutes — long enough to ride out a WiFi blip,
            // short enough that a room doesn't wait forever.
            disconnect_grace: Duration::from_secs(120),
        }
    }
}

/// A pending reconnection window for one player.
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    since: Instant,
    deadline: Instant,
}

/// Tracks which players are inside their reconnection grace window.
///
/// Not thread-safe by design: each room actor owns one manager and is
/// itself the serialization point, the same way the session layer owns
/// its maps single-threaded.
#[derive(Debug)]
pub struct PresenceManager {
    config: PresenceConfig,
    pending: HashMap<PlayerId, PendingEntry>,
}

impl PresenceManager {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
        }
    }

    /// Starts the grace window for a player. Idempotent: a second
    /// disconnect for the same player keeps the original deadline.
    /// Returns the deadline in effect.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Instant {
        let now = Instant::now();
        let entry = self.pending.entry(player_id).or_insert(PendingEntry {
            since: now,
            deadline: now + self.config.disconnect_grace,
        });
        tracing::debug!(%player_id, "grace window running");
        entry.deadline
    }

    /// Cancels the grace window on successful reconnection.
    /// Returns `true` if a window was actually pending.
    pub fn reconnect(&mut self, player_id: &PlayerId) -> bool {
        let cancelled = self.pending.remove(player_id).is_some();
        if cancelled {
            tracing::debug!(%player_id, "grace window cancelled (reconnected)");
        }
        cancelled
    }

    /// Cancels the grace window on explicit leave. Same effect as
    /// [`reconnect`](Self::reconnect); separate name for call-site
    /// clarity.
    pub fn remove(&mut self, player_id: &PlayerId) -> bool {
        self.pending.remove(player_id).is_some()
    }

    /// The earliest pending deadline, for the owner's select loop.
    /// `None` when nobody is disconnected.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|e| e.deadline).min()
    }

    /// Removes and returns every player whose window elapsed at `now`,
    /// ordered by how long they have been disconnected (longest first).
    pub fn take_expired(&mut self, now: Instant) -> Vec<PlayerId> {
        let mut expired: Vec<(PlayerId, PendingEntry)> = self
            .pending
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(id, e)| (*id, *e))
            .collect();
        expired.sort_by_key(|(_, e)| e.since);

        let ids: Vec<PlayerId> = expired.into_iter().map(|(id, _)| id).collect();
        for id in &ids {
            self.pending.remove(id);
        }
        ids
    }

    /// Returns `true` if the player has a pending window.
    pub fn is_pending(&self, player_id: &PlayerId) -> bool {
        self.pending.contains_key(player_id)
    }

    /// Number of players currently inside their grace window.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    //! Grace-window behavior is tested with two durations:
    //! zero (expires immediately) and an hour (never expires during a
    //! test). No wall-clock sleeps.

    use super::*;

    fn instant_expiry() -> PresenceManager {
        PresenceManager::new(PresenceConfig {
            disconnect_grace: Duration::ZERO,
        })
    }

    fn long_grace() -> PresenceManager {
        PresenceManager::new(PresenceConfig {
            disconnect_grace: Duration::from_secs(3600),
        })
    }

    #[tokio::test]
    async fn test_disconnect_registers_a_deadline() {
        let mut presence = long_grace();
        let player = PlayerId::new();

        assert!(presence.next_deadline().is_none());
        presence.disconnect(player);

        assert!(presence.is_pending(&player));
        assert!(presence.next_deadline().is_some());
        assert_eq!(presence.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_twice_keeps_original_deadline() {
        let mut presence = long_grace();
        let player = PlayerId::new();

        let first = presence.disconnect(player);
        let second = presence.disconnect(player);

        assert_eq!(first, second);
        assert_eq!(presence.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_cancels_the_window() {
        let mut presence = instant_expiry();
        let player = PlayerId::new();
        presence.disconnect(player);

        assert!(presence.reconnect(&player));

        // Even with a zero grace window nothing expires — the entry is
        // gone before any deadline could be observed.
        assert!(presence.take_expired(Instant::now()).is_empty());
        assert!(!presence.is_pending(&player));
    }

    #[tokio::test]
    async fn test_reconnect_without_pending_window_is_false() {
        let mut presence = long_grace();
        assert!(!presence.reconnect(&PlayerId::new()));
    }

    #[tokio::test]
    async fn test_take_expired_pops_only_elapsed_windows() {
        let mut presence = long_grace();
        let patient = PlayerId::new();
        presence.disconnect(patient);

        // Within the hour-long grace: nothing expires.
        assert!(presence.take_expired(Instant::now()).is_empty());
        assert!(presence.is_pending(&patient));
    }

    #[tokio::test]
    async fn test_take_expired_with_zero_grace_expires_immediately() {
        let mut presence = instant_expiry();
        let player = PlayerId::new();
        presence.disconnect(player);

        let expired = presence.take_expired(Instant::now());

        assert_eq!(expired, vec![player]);
        assert!(!presence.is_pending(&player));
        assert!(presence.next_deadline().is_none());
    }

    #[tokio::test]
    async fn test_take_expired_orders_by_disconnect_time() {
        tokio::time::pause();

        let mut presence = instant_expiry();
        let first = PlayerId::new();
        let second = PlayerId::new();

        presence.disconnect(first);
        tokio::time::advance(Duration::from_millis(5)).await;
        presence.disconnect(second);

        let expired = presence.take_expired(Instant::now());
        assert_eq!(expired, vec![first, second]);
    }

    #[tokio::test]
    async fn test_next_deadline_is_the_minimum() {
        tokio::time::pause();

        let mut presence = long_grace();
        let early = PlayerId::new();
        presence.disconnect(early);
        let early_deadline = presence.next_deadline().unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        presence.disconnect(PlayerId::new());

        assert_eq!(presence.next_deadline(), Some(early_deadline));
    }
}
