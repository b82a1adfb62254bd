//! The session state machine: every rule of the game, with no I/O.
//!
//! `SessionMachine` owns one [`GameSession`] and is the only place that
//! mutates it. Each operation validates, mutates, and returns the
//! [`GameEvent`]s the mutation produced; the room actor serializes the
//! calls and broadcasts the events. Keeping the machine synchronous and
//! deterministic is what makes the concurrency story simple — two
//! players racing for the same blank are just two calls in some order,
//! and the second one loses.
//!
//! Lifecycle:
//!
//! ```text
//! WaitingForPlayers --start_game--> CollectingWords
//!     (template generation runs; on failure start_game may be retried)
//! CollectingWords --last blank filled--> GeneratingStory
//! GeneratingStory --story_ready--> DisplayingStory
//! DisplayingStory --begin_video--> CreatingVideo
//! CreatingVideo --complete--> Completed
//! ```

use std::time::SystemTime;

use fableforge_story::{validate_username, validate_word};
use fableforge_types::{
    BlankId, GameError, GameEvent, GameSession, GameState, ParagraphId,
    Player, PlayerId, RoomCode, SessionId, StoryTemplate, SubmissionId,
    WordSubmission,
};

use crate::GameConfig;

/// What happened when a username joined: a fresh seat or a reclaimed one.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(Player),
    Reconnected(PlayerId),
}

impl JoinOutcome {
    pub fn player_id(&self) -> PlayerId {
        match self {
            Self::Joined(player) => player.id,
            Self::Reconnected(id) => *id,
        }
    }
}

/// The pure state machine for one game session.
#[derive(Debug)]
pub struct SessionMachine {
    session: GameSession,
    config: GameConfig,
    /// `true` while a template generation request is in flight, so a
    /// retry of `start_game` can't stack a second request on top.
    template_pending: bool,
}

impl SessionMachine {
    /// Creates a machine with an empty roster. The first successful
    /// [`join`](Self::join) seats the host.
    pub fn new(room_code: RoomCode, theme: Option<String>, config: GameConfig) -> Self {
        let now = SystemTime::now();
        Self {
            session: GameSession {
                id: SessionId::new(),
                room_code,
                // Placeholder until the first player joins; never read
                // while the roster is empty.
                host_id: PlayerId::new(),
                players: Vec::new(),
                game_state: GameState::WaitingForPlayers,
                theme,
                story_template: None,
                word_submissions: Vec::new(),
                completed_story: None,
                created_at: now,
                updated_at: now,
            },
            config,
            template_pending: false,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn state(&self) -> GameState {
        self.session.game_state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn template_pending(&self) -> bool {
        self.template_pending
    }

    // -----------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------

    /// Admits a username: a new seat while the game is waiting, or a
    /// reconnection to a disconnected seat at any point of the game.
    pub fn join(
        &mut self,
        username: &str,
    ) -> Result<(JoinOutcome, Vec<GameEvent>), GameError> {
        let username = validate_username(username)?;

        if let Some(existing) = self.session.player_by_username(username) {
            if existing.is_connected {
                return Err(GameError::UsernameConflict(username.to_owned()));
            }
            // Reclaiming a disconnected seat works in every state.
            let player_id = existing.id;
            let events = self.mark_reconnected(player_id)?;
            return Ok((JoinOutcome::Reconnected(player_id), events));
        }

        if self.session.game_state != GameState::WaitingForPlayers {
            return Err(GameError::validation(
                "the game has already started; only returning players can join",
            ));
        }
        if self.session.connected_count() >= self.config.max_players {
            return Err(GameError::GameFull(self.session.room_code.clone()));
        }

        let becomes_host = self.session.players.is_empty();
        let player = Player {
            id: PlayerId::new(),
            username: username.to_owned(),
            is_host: becomes_host,
            is_connected: true,
            words_contributed: 0,
            joined_at: SystemTime::now(),
        };
        if becomes_host {
            self.session.host_id = player.id;
        }
        self.session.players.push(player.clone());
        self.session.touch();

        let events = vec![GameEvent::PlayerJoined {
            player: player.clone(),
        }];
        Ok((JoinOutcome::Joined(player), events))
    }

    /// Removes a player permanently, migrating hostship if needed.
    ///
    /// Host migration picks the next connected player in join order,
    /// scanning circularly from the departed host's seat; if everyone
    /// left behind is disconnected, the seat at the host's old index
    /// inherits anyway so the invariant holds.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let idx = self
            .session
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;

        let departed = self.session.players.remove(idx);
        self.session.touch();
        let mut events = vec![GameEvent::PlayerLeft { player_id }];

        if departed.is_host && !self.session.players.is_empty() {
            let n = self.session.players.len();
            let heir = (0..n)
                .map(|k| (idx + k) % n)
                .find(|&i| self.session.players[i].is_connected)
                .unwrap_or(idx % n);
            let heir_id = self.session.players[heir].id;
            for p in &mut self.session.players {
                p.is_host = p.id == heir_id;
            }
            self.session.host_id = heir_id;
            events.push(GameEvent::HostChanged { host_id: heir_id });
        }

        Ok(events)
    }

    /// Flips a player to disconnected. Idempotent.
    pub fn mark_disconnected(
        &mut self,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let player = self
            .session
            .player_mut(player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if !player.is_connected {
            return Ok(Vec::new());
        }
        player.is_connected = false;
        self.session.touch();
        Ok(vec![GameEvent::PlayerDisconnected { player_id }])
    }

    /// Flips a player back to connected. Idempotent.
    pub fn mark_reconnected(
        &mut self,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let player = self
            .session
            .player_mut(player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.is_connected {
            return Ok(Vec::new());
        }
        player.is_connected = true;
        self.session.touch();
        Ok(vec![GameEvent::PlayerReconnected { player_id }])
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Starts the game: host-only, enough players, and the room either
    /// still waiting or retrying after a failed template generation.
    pub fn start_game(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id)?;

        let retry_after_failure = self.session.game_state == GameState::CollectingWords
            && self.session.story_template.is_none()
            && !self.template_pending;
        if self.session.game_state != GameState::WaitingForPlayers && !retry_after_failure {
            return Err(GameError::validation(format!(
                "cannot start a game in the {} state",
                self.session.game_state
            )));
        }
        if self.session.connected_count() < self.config.min_players {
            return Err(GameError::validation(format!(
                "need at least {} connected players to start",
                self.config.min_players
            )));
        }

        let mut events = Vec::new();
        if self.session.game_state == GameState::WaitingForPlayers {
            events.push(self.transition_to(GameState::CollectingWords)?);
        }
        self.template_pending = true;
        Ok(events)
    }

    /// Installs a generated template. A template whose declared blank
    /// count disagrees with its paragraphs is rejected as a generation
    /// failure, not trusted.
    pub fn template_ready(&mut self, template: StoryTemplate) -> Vec<GameEvent> {
        self.template_pending = false;

        if self.session.game_state != GameState::CollectingWords
            || self.session.story_template.is_some()
        {
            tracing::debug!(
                room = %self.session.room_code,
                "dropping stale template result"
            );
            return Vec::new();
        }
        if template.count_blanks() != template.total_word_blanks {
            tracing::warn!(
                room = %self.session.room_code,
                declared = template.total_word_blanks,
                actual = template.count_blanks(),
                "generated template is inconsistent"
            );
            return vec![GameEvent::TemplateFailed {
                message: "the generated story was malformed; the host can try again".into(),
            }];
        }

        self.session.story_template = Some(template.clone());
        self.session.touch();
        vec![GameEvent::TemplateReady { template }]
    }

    /// Records a failed template generation. The room stays in
    /// `CollectingWords` with no template, and `start_game` becomes
    /// invocable again.
    pub fn template_failed(&mut self, message: String) -> Vec<GameEvent> {
        self.template_pending = false;
        vec![GameEvent::TemplateFailed { message }]
    }

    /// Accepts a word for a blank. First writer wins: a blank that
    /// already has a word rejects every later submission.
    pub fn submit_word(
        &mut self,
        player_id: PlayerId,
        blank_id: BlankId,
        word: &str,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.session.game_state != GameState::CollectingWords {
            return Err(GameError::validation(format!(
                "words cannot be submitted in the {} state",
                self.session.game_state
            )));
        }
        let username = self
            .session
            .player(player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?
            .username
            .clone();
        let template = self
            .session
            .story_template
            .as_ref()
            .ok_or_else(|| GameError::validation("the story is not ready yet"))?;
        let blank = template.blank(&blank_id).ok_or_else(|| {
            GameError::validation(format!("no blank {blank_id} in this story"))
        })?;
        let word_type = blank.word_type;
        let total = template.total_word_blanks;

        if self.session.submission_for(&blank_id).is_some() {
            return Err(GameError::validation(format!(
                "blank {blank_id} already has a word"
            )));
        }
        let word = validate_word(word_type, word)?.to_owned();

        self.session.word_submissions.push(WordSubmission {
            id: SubmissionId::new(),
            word_blank_id: blank_id.clone(),
            player_id,
            player_username: username,
            word,
            word_type,
            submitted_at: SystemTime::now(),
        });
        if let Some(player) = self.session.player_mut(player_id) {
            player.words_contributed += 1;
        }
        self.session.touch();

        let remaining = total - self.session.word_submissions.len();
        let mut events = vec![GameEvent::WordAccepted {
            word_blank_id: blank_id,
            player_id,
            remaining,
        }];
        if remaining == 0 {
            events.push(self.transition_to(GameState::GeneratingStory)?);
        }
        Ok(events)
    }

    /// Installs the completed story. Stale results (a room that moved
    /// on or was reset) are dropped silently.
    pub fn story_ready(
        &mut self,
        story: fableforge_types::CompletedStory,
    ) -> Vec<GameEvent> {
        if self.session.game_state != GameState::GeneratingStory {
            tracing::debug!(
                room = %self.session.room_code,
                "dropping stale story result"
            );
            return Vec::new();
        }
        self.session.completed_story = Some(story.clone());
        let mut events = vec![GameEvent::StoryReady { story }];
        match self.transition_to(GameState::DisplayingStory) {
            Ok(event) => events.push(event),
            // Unreachable: GeneratingStory always steps to DisplayingStory.
            Err(err) => tracing::error!(%err, "story transition rejected"),
        }
        events
    }

    /// Records a failed story assembly. The room stays in
    /// `GeneratingStory`; players see the failure.
    pub fn story_failed(&mut self, message: String) -> Vec<GameEvent> {
        vec![GameEvent::StoryFailed { message }]
    }

    /// Attaches an illustration URL to a completed paragraph. Images
    /// arrive on their own schedule and never gate a transition.
    pub fn image_ready(&mut self, paragraph_id: ParagraphId, url: String) -> Vec<GameEvent> {
        let Some(story) = self.session.completed_story.as_mut() else {
            return Vec::new();
        };
        let Some(paragraph) = story.paragraphs.iter_mut().find(|p| p.id == paragraph_id)
        else {
            return Vec::new();
        };
        if paragraph.image_url.is_some() {
            return Vec::new();
        }
        paragraph.image_url = Some(url.clone());
        self.session.touch();
        vec![GameEvent::ParagraphImageReady { paragraph_id, url }]
    }

    /// Host acknowledges the displayed story and moves on to the video
    /// stage.
    pub fn begin_video(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id)?;
        Ok(vec![self.transition_to(GameState::CreatingVideo)?])
    }

    /// Host closes out the game.
    pub fn complete(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id)?;
        Ok(vec![self.transition_to(GameState::Completed)?])
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn require_host(&self, player_id: PlayerId) -> Result<(), GameError> {
        if self.session.player(player_id).is_none() {
            return Err(GameError::PlayerNotFound(player_id));
        }
        if self.session.host_id != player_id {
            return Err(GameError::validation("only the host can do that"));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: GameState) -> Result<GameEvent, GameError> {
        if !self.session.game_state.can_transition_to(target) {
            return Err(GameError::validation(format!(
                "cannot move from {} to {}",
                self.session.game_state, target
            )));
        }
        self.session.game_state = target;
        self.session.touch();
        Ok(GameEvent::StateChanged { state: target })
    }
}

#[cfg(test)]
mod tests {
    use fableforge_types::{
        CompletedParagraph, CompletedStory, Difficulty, Paragraph,
        TemplateId, WordBlank, WordType,
    };

    use super::*;

    fn machine() -> SessionMachine {
        SessionMachine::new(RoomCode::from("TEST42"), None, GameConfig::default())
    }

    fn two_blank_template() -> StoryTemplate {
        StoryTemplate {
            id: TemplateId::from("t1"),
            title: "A Walk".into(),
            paragraphs: vec![Paragraph {
                id: ParagraphId::from("p1"),
                text: "The {{b1}} went to the {{b2}}.".into(),
                word_blanks: vec![
                    WordBlank {
                        id: BlankId::from("b1"),
                        word_type: WordType::Animal,
                        position: 0,
                    },
                    WordBlank {
                        id: BlankId::from("b2"),
                        word_type: WordType::Place,
                        position: 1,
                    },
                ],
                image_prompt: "an animal on a walk".into(),
            }],
            total_word_blanks: 2,
            theme: "walks".into(),
            difficulty: Difficulty::Easy,
        }
    }

    /// Seats the given usernames and returns their ids in order.
    fn seat(machine: &mut SessionMachine, usernames: &[&str]) -> Vec<PlayerId> {
        usernames
            .iter()
            .map(|u| machine.join(u).unwrap().0.player_id())
            .collect()
    }

    /// Drives a fresh machine to CollectingWords with a template installed.
    fn collecting(usernames: &[&str]) -> (SessionMachine, Vec<PlayerId>) {
        let mut m = machine();
        let ids = seat(&mut m, usernames);
        m.start_game(ids[0]).unwrap();
        let events = m.template_ready(two_blank_template());
        assert!(matches!(events[0], GameEvent::TemplateReady { .. }));
        (m, ids)
    }

    // -- joining --------------------------------------------------------

    #[test]
    fn test_join_first_player_becomes_host() {
        let mut m = machine();
        let (outcome, events) = m.join("alice").unwrap();

        let JoinOutcome::Joined(player) = outcome else {
            panic!("expected a fresh seat");
        };
        assert!(player.is_host);
        assert_eq!(m.session().host_id, player.id);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_join_second_player_is_not_host() {
        let mut m = machine();
        seat(&mut m, &["alice"]);
        let (outcome, _) = m.join("bob").unwrap();

        let JoinOutcome::Joined(player) = outcome else {
            panic!("expected a fresh seat");
        };
        assert!(!player.is_host);
    }

    #[test]
    fn test_join_connected_username_conflicts() {
        let mut m = machine();
        seat(&mut m, &["alice"]);

        let err = m.join("alice").unwrap_err();
        assert!(matches!(err, GameError::UsernameConflict(name) if name == "alice"));
    }

    #[test]
    fn test_join_disconnected_username_reconnects() {
        let (mut m, ids) = collecting(&["alice", "bob"]);
        m.mark_disconnected(ids[1]).unwrap();

        let (outcome, events) = m.join("bob").unwrap();

        assert_eq!(outcome, JoinOutcome::Reconnected(ids[1]));
        assert_eq!(
            events,
            vec![GameEvent::PlayerReconnected { player_id: ids[1] }]
        );
        assert!(m.session().player(ids[1]).unwrap().is_connected);
    }

    #[test]
    fn test_join_new_player_rejected_after_start() {
        let (mut m, _) = collecting(&["alice", "bob"]);

        let err = m.join("carol").unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_join_full_room_rejected() {
        let mut m = SessionMachine::new(
            RoomCode::from("TEST42"),
            None,
            GameConfig {
                max_players: 2,
                ..GameConfig::default()
            },
        );
        seat(&mut m, &["alice", "bob"]);

        let err = m.join("carol").unwrap_err();
        assert!(matches!(err, GameError::GameFull(_)));
    }

    #[test]
    fn test_join_full_room_admits_after_a_disconnect() {
        let mut m = SessionMachine::new(
            RoomCode::from("TEST42"),
            None,
            GameConfig {
                max_players: 2,
                ..GameConfig::default()
            },
        );
        let ids = seat(&mut m, &["alice", "bob"]);
        m.mark_disconnected(ids[1]).unwrap();

        // Capacity counts connected players only.
        assert!(m.join("carol").is_ok());
    }

    // -- leaving and host migration --------------------------------------

    #[test]
    fn test_leave_host_passes_to_next_connected_in_join_order() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob", "carol"]);

        let events = m.leave(ids[0]).unwrap();

        assert_eq!(m.session().host_id, ids[1]);
        assert!(m.session().player(ids[1]).unwrap().is_host);
        assert!(!m.session().player(ids[2]).unwrap().is_host);
        assert_eq!(
            events,
            vec![
                GameEvent::PlayerLeft { player_id: ids[0] },
                GameEvent::HostChanged { host_id: ids[1] },
            ]
        );
    }

    #[test]
    fn test_leave_host_skips_disconnected_heir() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob", "carol"]);
        m.mark_disconnected(ids[1]).unwrap();

        m.leave(ids[0]).unwrap();

        assert_eq!(m.session().host_id, ids[2]);
    }

    #[test]
    fn test_leave_host_wraps_around_join_order() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob", "carol", "dave"]);
        // Push hostship to dave, the last seat.
        m.mark_disconnected(ids[1]).unwrap();
        m.mark_disconnected(ids[2]).unwrap();
        m.leave(ids[0]).unwrap();
        assert_eq!(m.session().host_id, ids[3]);
        m.mark_reconnected(ids[1]).unwrap();
        m.mark_reconnected(ids[2]).unwrap();

        // Removing the last seat wraps the scan back to the first.
        m.leave(ids[3]).unwrap();

        assert_eq!(m.session().host_id, ids[1]);
    }

    #[test]
    fn test_leave_host_with_all_disconnected_still_migrates() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.mark_disconnected(ids[1]).unwrap();

        m.leave(ids[0]).unwrap();

        // Nobody connected, but the invariant holds: bob inherits.
        assert_eq!(m.session().host_id, ids[1]);
        assert!(m.session().player(ids[1]).unwrap().is_host);
    }

    #[test]
    fn test_leave_non_host_keeps_host() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);

        let events = m.leave(ids[1]).unwrap();

        assert_eq!(m.session().host_id, ids[0]);
        assert_eq!(events, vec![GameEvent::PlayerLeft { player_id: ids[1] }]);
    }

    #[test]
    fn test_leave_unknown_player_fails() {
        let mut m = machine();
        seat(&mut m, &["alice"]);

        let err = m.leave(PlayerId::new()).unwrap_err();
        assert!(matches!(err, GameError::PlayerNotFound(_)));
    }

    #[test]
    fn test_leave_preserves_submitted_words() {
        let (mut m, ids) = collecting(&["alice", "bob"]);
        m.submit_word(ids[1], BlankId::from("b1"), "dog").unwrap();

        m.leave(ids[1]).unwrap();

        assert_eq!(m.session().word_submissions.len(), 1);
        assert_eq!(m.session().word_submissions[0].player_username, "bob");
    }

    // -- presence ---------------------------------------------------------

    #[test]
    fn test_mark_disconnected_is_idempotent() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice"]);

        let first = m.mark_disconnected(ids[0]).unwrap();
        let second = m.mark_disconnected(ids[0]).unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_mark_disconnected_keeps_the_seat() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);

        m.mark_disconnected(ids[1]).unwrap();

        assert_eq!(m.session().players.len(), 2);
        assert_eq!(m.session().connected_count(), 1);
    }

    // -- starting ---------------------------------------------------------

    #[test]
    fn test_start_game_transitions_exactly_once() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);

        let events = m.start_game(ids[0]).unwrap();

        assert_eq!(
            events,
            vec![GameEvent::StateChanged {
                state: GameState::CollectingWords
            }]
        );
        assert!(m.template_pending());

        // A second start while generation is pending is out of order.
        assert!(m.start_game(ids[0]).is_err());
    }

    #[test]
    fn test_start_game_requires_host() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);

        let err = m.start_game(ids[1]).unwrap_err();

        assert!(matches!(err, GameError::Validation(_)));
        assert_eq!(m.state(), GameState::WaitingForPlayers);
    }

    #[test]
    fn test_start_game_requires_min_players() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice"]);

        assert!(m.start_game(ids[0]).is_err());
        assert_eq!(m.state(), GameState::WaitingForPlayers);
    }

    #[test]
    fn test_start_game_counts_connected_players_only() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.mark_disconnected(ids[1]).unwrap();

        assert!(m.start_game(ids[0]).is_err());
    }

    #[test]
    fn test_start_game_retry_after_template_failure() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.start_game(ids[0]).unwrap();
        m.template_failed("generator down".into());

        // Retry is allowed and does not re-enter CollectingWords.
        let events = m.start_game(ids[0]).unwrap();
        assert!(events.is_empty());
        assert!(m.template_pending());
        assert_eq!(m.state(), GameState::CollectingWords);
    }

    // -- templates ----------------------------------------------------------

    #[test]
    fn test_template_ready_installs_the_template() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.start_game(ids[0]).unwrap();

        let events = m.template_ready(two_blank_template());

        assert!(matches!(events[0], GameEvent::TemplateReady { .. }));
        assert!(m.session().story_template.is_some());
        assert!(!m.template_pending());
    }

    #[test]
    fn test_template_ready_rejects_inconsistent_blank_count() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.start_game(ids[0]).unwrap();

        let mut template = two_blank_template();
        template.total_word_blanks = 5;
        let events = m.template_ready(template);

        assert!(matches!(events[0], GameEvent::TemplateFailed { .. }));
        assert!(m.session().story_template.is_none());
        // The host can try again.
        assert!(m.start_game(ids[0]).is_ok());
    }

    #[test]
    fn test_template_ready_in_wrong_state_is_dropped() {
        let mut m = machine();
        seat(&mut m, &["alice", "bob"]);

        let events = m.template_ready(two_blank_template());

        assert!(events.is_empty());
        assert!(m.session().story_template.is_none());
    }

    // -- word submission ----------------------------------------------------

    #[test]
    fn test_submit_word_accepts_and_counts_down() {
        let (mut m, ids) = collecting(&["alice", "bob"]);

        let events = m.submit_word(ids[0], BlankId::from("b1"), "dog").unwrap();

        assert_eq!(
            events,
            vec![GameEvent::WordAccepted {
                word_blank_id: BlankId::from("b1"),
                player_id: ids[0],
                remaining: 1,
            }]
        );
        assert_eq!(m.session().player(ids[0]).unwrap().words_contributed, 1);
    }

    #[test]
    fn test_submit_word_duplicate_blank_first_writer_wins() {
        let (mut m, ids) = collecting(&["alice", "bob"]);
        m.submit_word(ids[0], BlankId::from("b1"), "dog").unwrap();

        let err = m
            .submit_word(ids[1], BlankId::from("b1"), "cat")
            .unwrap_err();

        assert!(matches!(err, GameError::Validation(_)));
        assert_eq!(m.session().word_submissions.len(), 1);
        assert_eq!(m.session().word_submissions[0].word, "dog");
        assert_eq!(m.session().player(ids[1]).unwrap().words_contributed, 0);
    }

    #[test]
    fn test_submit_word_last_blank_transitions_once() {
        let (mut m, ids) = collecting(&["alice", "bob"]);
        m.submit_word(ids[0], BlankId::from("b1"), "dog").unwrap();

        let events = m.submit_word(ids[1], BlankId::from("b2"), "park").unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            GameEvent::StateChanged {
                state: GameState::GeneratingStory
            }
        );
        assert_eq!(m.state(), GameState::GeneratingStory);
    }

    #[test]
    fn test_submit_word_before_start_rejected() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);

        let err = m
            .submit_word(ids[0], BlankId::from("b1"), "dog")
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_submit_word_without_template_rejected() {
        let mut m = machine();
        let ids = seat(&mut m, &["alice", "bob"]);
        m.start_game(ids[0]).unwrap();

        let err = m
            .submit_word(ids[0], BlankId::from("b1"), "dog")
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_submit_word_unknown_blank_rejected() {
        let (mut m, ids) = collecting(&["alice", "bob"]);

        let err = m
            .submit_word(ids[0], BlankId::from("nope"), "dog")
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_submit_word_invalid_word_rejected() {
        let (mut m, ids) = collecting(&["alice", "bob"]);

        let err = m
            .submit_word(ids[0], BlankId::from("b1"), "d0g!")
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
        assert!(m.session().word_submissions.is_empty());
    }

    #[test]
    fn test_submit_word_unknown_player_rejected() {
        let (mut m, _) = collecting(&["alice", "bob"]);

        let err = m
            .submit_word(PlayerId::new(), BlankId::from("b1"), "dog")
            .unwrap_err();
        assert!(matches!(err, GameError::PlayerNotFound(_)));
    }

    // -- story and completion -------------------------------------------------

    fn dummy_story() -> CompletedStory {
        CompletedStory {
            title: "A Walk".into(),
            paragraphs: vec![CompletedParagraph {
                id: ParagraphId::from("p1"),
                text: "The dog went to the park.".into(),
                image_url: None,
                word_highlights: Vec::new(),
            }],
        }
    }

    /// Drives a machine to DisplayingStory.
    fn displaying(usernames: &[&str]) -> (SessionMachine, Vec<PlayerId>) {
        let (mut m, ids) = collecting(usernames);
        m.submit_word(ids[0], BlankId::from("b1"), "dog").unwrap();
        m.submit_word(ids[0], BlankId::from("b2"), "park").unwrap();
        let events = m.story_ready(dummy_story());
        assert_eq!(events.len(), 2);
        (m, ids)
    }

    #[test]
    fn test_story_ready_moves_to_displaying() {
        let (m, _) = displaying(&["alice", "bob"]);
        assert_eq!(m.state(), GameState::DisplayingStory);
        assert!(m.session().completed_story.is_some());
    }

    #[test]
    fn test_story_ready_in_wrong_state_is_dropped() {
        let (mut m, _) = collecting(&["alice", "bob"]);

        let events = m.story_ready(dummy_story());

        assert!(events.is_empty());
        assert!(m.session().completed_story.is_none());
    }

    #[test]
    fn test_story_failed_keeps_the_state() {
        let (mut m, ids) = collecting(&["alice", "bob"]);
        m.submit_word(ids[0], BlankId::from("b1"), "dog").unwrap();
        m.submit_word(ids[0], BlankId::from("b2"), "park").unwrap();

        let events = m.story_failed("generator down".into());

        assert!(matches!(events[0], GameEvent::StoryFailed { .. }));
        assert_eq!(m.state(), GameState::GeneratingStory);
    }

    #[test]
    fn test_image_ready_attaches_url_once() {
        let (mut m, _) = displaying(&["alice", "bob"]);

        let first = m.image_ready(ParagraphId::from("p1"), "https://img/1".into());
        let second = m.image_ready(ParagraphId::from("p1"), "https://img/2".into());

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        let story = m.session().completed_story.as_ref().unwrap();
        assert_eq!(story.paragraphs[0].image_url.as_deref(), Some("https://img/1"));
    }

    #[test]
    fn test_image_ready_unknown_paragraph_is_dropped() {
        let (mut m, _) = displaying(&["alice", "bob"]);
        assert!(m
            .image_ready(ParagraphId::from("nope"), "https://img/1".into())
            .is_empty());
    }

    #[test]
    fn test_begin_video_and_complete_are_host_only_and_ordered() {
        let (mut m, ids) = displaying(&["alice", "bob"]);

        assert!(m.begin_video(ids[1]).is_err());
        assert!(m.complete(ids[0]).is_err()); // skipping CreatingVideo

        m.begin_video(ids[0]).unwrap();
        assert_eq!(m.state(), GameState::CreatingVideo);

        m.complete(ids[0]).unwrap();
        assert_eq!(m.state(), GameState::Completed);
        assert!(m.state().is_terminal());
    }
}
