//! The room actor: one task per room, owning that room's state.
//!
//! All mutation flows through a single mpsc command channel, so the
//! actor is the serialization point the state machine relies on. Slow
//! work (template generation, story assembly, images) never runs inside
//! the loop: it is spawned with a clone of the actor's own command
//! sender and its result comes back as just another command. A result
//! whose room has since been evicted finds a closed channel and is
//! dropped, which is exactly the behavior we want.
//!
//! The actor also owns the two clocks of a room's life:
//! - the presence deadlines (disconnected players whose grace window
//!   may elapse), and
//! - the eviction deadline (an empty or completed room that has
//!   overstayed its welcome).

use std::collections::HashMap;
use std::sync::Arc;

use fableforge_presence::{PresenceConfig, PresenceManager};
use fableforge_story::{MediaGenerator, StoryGenerator};
use fableforge_types::{
    BlankId, CompletedStory, GameError, GameEvent, GameSession, ParagraphId,
    PlayerId, RoomCode, StoryTemplate,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::{GameConfig, JoinOutcome, SessionMachine};

/// The channel a connected player receives [`GameEvent`]s on.
pub type PlayerSender = mpsc::UnboundedSender<GameEvent>;

/// Everything a successful join hands back to the transport layer.
#[derive(Debug)]
pub struct JoinReply {
    pub player_id: PlayerId,
    /// `true` when an existing disconnected seat was reclaimed.
    pub reconnected: bool,
    /// Full session state for the client's initial render.
    pub snapshot: GameSession,
}

/// Commands a room actor processes, one at a time.
pub enum RoomCommand {
    Join {
        username: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinReply, GameError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    SubmitWord {
        player_id: PlayerId,
        blank_id: BlankId,
        word: String,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    MarkDisconnected {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Reconnect {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<GameSession, GameError>>,
    },
    BeginVideo {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Complete {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSession>,
    },
    // Results of spawned generation work, addressed back to the room.
    TemplateReady {
        result: Result<StoryTemplate, GameError>,
    },
    StoryReady {
        result: Result<CompletedStory, GameError>,
    },
    ImageReady {
        paragraph_id: ParagraphId,
        url: String,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// A cheap, cloneable handle to one room's actor.
///
/// Every method maps a closed channel to [`GameError::GameNotFound`]:
/// from the caller's point of view an evicted room and a room that
/// never existed are the same thing.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<RoomCommand>,
    room_code: RoomCode,
}

impl SessionHandle {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(
        &self,
        username: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<JoinReply, GameError> {
        let username = username.into();
        self.request(|reply| RoomCommand::Join {
            username,
            sender,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await
    }

    pub async fn submit_word(
        &self,
        player_id: PlayerId,
        blank_id: BlankId,
        word: impl Into<String>,
    ) -> Result<(), GameError> {
        let word = word.into();
        self.request(|reply| RoomCommand::SubmitWord {
            player_id,
            blank_id,
            word,
            reply,
        })
        .await
    }

    /// Reports a dropped transport. The seat survives until the grace
    /// window elapses.
    pub async fn mark_disconnected(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::MarkDisconnected { player_id, reply })
            .await
    }

    /// Re-seats a player by id with a fresh event channel and returns a
    /// snapshot for resync.
    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<GameSession, GameError> {
        self.request(|reply| RoomCommand::Reconnect {
            player_id,
            sender,
            reply,
        })
        .await
    }

    pub async fn begin_video(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::BeginVideo { player_id, reply })
            .await
    }

    pub async fn complete(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Complete { player_id, reply })
            .await
    }

    /// Current full session state.
    pub async fn snapshot(&self) -> Result<GameSession, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        rx.await
            .map_err(|_| GameError::GameNotFound(self.room_code.clone()))
    }

    /// Asks the actor to stop. Best-effort; an already-stopped actor is
    /// fine.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }

    async fn send(&self, command: RoomCommand) -> Result<(), GameError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| GameError::GameNotFound(self.room_code.clone()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, GameError>>) -> RoomCommand,
    ) -> Result<T, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await
            .map_err(|_| GameError::GameNotFound(self.room_code.clone()))?
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// Spawns a room actor, seating the host as its first player.
///
/// Seating happens before the task starts so a bad host username fails
/// the whole room creation synchronously.
pub fn spawn_session(
    room_code: RoomCode,
    theme: Option<String>,
    config: GameConfig,
    generator: Arc<dyn StoryGenerator>,
    media: Option<Arc<dyn MediaGenerator>>,
    host_username: &str,
    host_sender: PlayerSender,
) -> Result<(SessionHandle, JoinReply), GameError> {
    let mut machine = SessionMachine::new(room_code.clone(), theme, config.clone());
    let (outcome, _) = machine.join(host_username)?;
    let host_id = outcome.player_id();
    let reply = JoinReply {
        player_id: host_id,
        reconnected: false,
        snapshot: machine.session().clone(),
    };

    let (sender, receiver) = mpsc::channel(config.channel_size);
    let presence = PresenceManager::new(PresenceConfig {
        disconnect_grace: config.disconnect_grace,
    });
    let mut actor = RoomActor {
        machine,
        presence,
        senders: HashMap::from([(host_id, host_sender)]),
        generator,
        media,
        receiver,
        self_sender: sender.clone(),
        eviction_deadline: None,
    };
    tokio::spawn(async move {
        actor.run().await;
        tracing::info!(room = %actor.machine.session().room_code, "room stopped");
    });

    Ok((SessionHandle { sender, room_code }, reply))
}

struct RoomActor {
    machine: SessionMachine,
    presence: PresenceManager,
    senders: HashMap<PlayerId, PlayerSender>,
    generator: Arc<dyn StoryGenerator>,
    media: Option<Arc<dyn MediaGenerator>>,
    receiver: mpsc::Receiver<RoomCommand>,
    self_sender: mpsc::Sender<RoomCommand>,
    eviction_deadline: Option<Instant>,
}

impl RoomActor {
    async fn run(&mut self) {
        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle(command) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = sleep_until_opt(self.presence.next_deadline()) => {
                    self.expire_disconnected();
                }
                _ = sleep_until_opt(self.eviction_deadline) => {
                    tracing::info!(
                        room = %self.machine.session().room_code,
                        state = %self.machine.state(),
                        "evicting room"
                    );
                    break;
                }
            }
        }
    }

    /// Processes one command. Returns `false` to stop the actor.
    fn handle(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Join {
                username,
                sender,
                reply,
            } => {
                let result = self.machine.join(&username).map(|(outcome, events)| {
                    let player_id = outcome.player_id();
                    let reconnected = matches!(outcome, JoinOutcome::Reconnected(_));
                    self.presence.reconnect(&player_id);
                    self.senders.insert(player_id, sender);
                    self.broadcast(events);
                    self.update_eviction();
                    JoinReply {
                        player_id,
                        reconnected,
                        snapshot: self.machine.session().clone(),
                    }
                });
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.machine.leave(player_id).map(|events| {
                    self.presence.remove(&player_id);
                    self.senders.remove(&player_id);
                    self.broadcast(events);
                    self.update_eviction();
                });
                let _ = reply.send(result);
            }
            RoomCommand::StartGame { player_id, reply } => {
                let result = self.machine.start_game(player_id).map(|events| {
                    self.broadcast(events);
                    self.request_template();
                });
                let _ = reply.send(result);
            }
            RoomCommand::SubmitWord {
                player_id,
                blank_id,
                word,
                reply,
            } => {
                let result = self
                    .machine
                    .submit_word(player_id, blank_id, &word)
                    .map(|events| {
                        self.broadcast(events);
                        if self.machine.state()
                            == fableforge_types::GameState::GeneratingStory
                        {
                            self.request_story();
                        }
                    });
                let _ = reply.send(result);
            }
            RoomCommand::MarkDisconnected { player_id, reply } => {
                let result = self.machine.mark_disconnected(player_id).map(|events| {
                    if !events.is_empty() {
                        self.presence.disconnect(player_id);
                        self.senders.remove(&player_id);
                        self.broadcast(events);
                    }
                });
                let _ = reply.send(result);
            }
            RoomCommand::Reconnect {
                player_id,
                sender,
                reply,
            } => {
                let result = self.machine.mark_reconnected(player_id).map(|events| {
                    self.presence.reconnect(&player_id);
                    self.senders.insert(player_id, sender);
                    self.broadcast(events);
                    self.machine.session().clone()
                });
                let _ = reply.send(result);
            }
            RoomCommand::BeginVideo { player_id, reply } => {
                let result = self
                    .machine
                    .begin_video(player_id)
                    .map(|events| self.broadcast(events));
                let _ = reply.send(result);
            }
            RoomCommand::Complete { player_id, reply } => {
                let result = self.machine.complete(player_id).map(|events| {
                    self.broadcast(events);
                    self.update_eviction();
                });
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.machine.session().clone());
            }
            RoomCommand::TemplateReady { result } => {
                let events = match result {
                    Ok(template) => self.machine.template_ready(template),
                    Err(err) => {
                        tracing::warn!(
                            room = %self.machine.session().room_code,
                            %err,
                            "template generation failed"
                        );
                        self.machine.template_failed(err.to_string())
                    }
                };
                self.broadcast(events);
            }
            RoomCommand::StoryReady { result } => {
                let events = match result {
                    Ok(story) => {
                        let events = self.machine.story_ready(story);
                        if !events.is_empty() {
                            self.request_images();
                        }
                        events
                    }
                    Err(err) => {
                        tracing::warn!(
                            room = %self.machine.session().room_code,
                            %err,
                            "story assembly failed"
                        );
                        self.machine.story_failed(err.to_string())
                    }
                };
                self.broadcast(events);
            }
            RoomCommand::ImageReady { paragraph_id, url } => {
                let events = self.machine.image_ready(paragraph_id, url);
                self.broadcast(events);
            }
            RoomCommand::Shutdown => return false,
        }
        true
    }

    /// Permanently removes players whose grace window has elapsed,
    /// through the same path as an explicit leave.
    fn expire_disconnected(&mut self) {
        for player_id in self.presence.take_expired(Instant::now()) {
            tracing::info!(
                room = %self.machine.session().room_code,
                %player_id,
                "grace window elapsed, removing player"
            );
            self.senders.remove(&player_id);
            match self.machine.leave(player_id) {
                Ok(events) => self.broadcast(events),
                Err(err) => tracing::debug!(%err, "expired player already gone"),
            }
        }
        self.update_eviction();
    }

    /// Arms or disarms the room's own eviction deadline. An armed
    /// deadline is kept if it would fire sooner than the recomputed one.
    fn update_eviction(&mut self) {
        let grace = if self.machine.session().players.is_empty() {
            Some(self.machine.config().empty_room_grace)
        } else if self.machine.state().is_terminal() {
            Some(self.machine.config().completed_retention)
        } else {
            None
        };
        self.eviction_deadline = grace.map(|grace| {
            let candidate = Instant::now() + grace;
            match self.eviction_deadline {
                Some(existing) if existing <= candidate => existing,
                _ => candidate,
            }
        });
    }

    /// Kicks off template generation off-loop.
    fn request_template(&self) {
        let generator = Arc::clone(&self.generator);
        let theme = self.machine.session().theme.clone();
        let player_count = self.machine.session().connected_count();
        let tx = self.self_sender.clone();
        tokio::spawn(async move {
            let result = generator
                .generate_template(theme.as_deref(), player_count)
                .await;
            // A closed channel means the room was evicted meanwhile.
            let _ = tx.send(RoomCommand::TemplateReady { result }).await;
        });
    }

    /// Kicks off story assembly off-loop once every blank is filled.
    fn request_story(&self) {
        let Some(template) = self.machine.session().story_template.clone() else {
            return;
        };
        let submissions = self.machine.session().word_submissions.clone();
        let generator = Arc::clone(&self.generator);
        let tx = self.self_sender.clone();
        tokio::spawn(async move {
            let result = generator.fill_template(&template, &submissions).await;
            let _ = tx.send(RoomCommand::StoryReady { result }).await;
        });
    }

    /// Kicks off one illustration task per paragraph, if a media
    /// generator is configured. Image failures are logged and dropped;
    /// the story stands without them.
    fn request_images(&self) {
        let Some(media) = self.media.as_ref().map(Arc::clone) else {
            return;
        };
        let Some(template) = self.machine.session().story_template.clone() else {
            return;
        };
        for paragraph in template.paragraphs {
            let media = Arc::clone(&media);
            let tx = self.self_sender.clone();
            tokio::spawn(async move {
                match media.paragraph_image(&paragraph).await {
                    Ok(url) => {
                        let _ = tx
                            .send(RoomCommand::ImageReady {
                                paragraph_id: paragraph.id,
                                url,
                            })
                            .await;
                    }
                    Err(err) => {
                        tracing::warn!(paragraph = %paragraph.id, %err, "image generation failed");
                    }
                }
            });
        }
    }

    /// Sends each event to every connected player, pruning channels
    /// whose receiver is gone.
    fn broadcast(&mut self, events: Vec<GameEvent>) {
        for event in events {
            self.senders
                .retain(|_, sender| sender.send(event.clone()).is_ok());
        }
    }
}

/// Sleeps until the deadline, or forever when there is none — which
/// lets `select!` treat "no deadline" as a branch that never fires.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
