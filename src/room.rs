//! The room actor: one logical owner per room.
//!
//! All intents for a room are serialized through one mpsc channel and
//! applied synchronously, so two connections can never interleave writes.
//! Overlay broadcast and snapshot persistence run strictly after an
//! intent completes, as best-effort follow-ups: a broken connection or a
//! failed storage write never stalls the room. In-memory state stays the
//! source of truth until the next successful persist.
//!
//! Connection bootstrap (sockets, tokens, role resolution) happens
//! upstream; by the time a [`RoomCommand::Connect`] arrives the viewer is
//! already authenticated. A connection that closed mid-authentication
//! simply never sends the command, so it registers no side effects here.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::{ConnectionId, GameRng, LogEventEnvelope, RoomId};
use crate::document::GameDoc;
use crate::hidden::HiddenState;
use crate::intent::{self, Intent, IntentAck};
use crate::overlay::{
    build_overlay, OverlayDiffPayload, OverlayMessage, OverlaySnapshotPayload, OverlayTracker,
    Viewer,
};
use crate::snapshot::{SnapshotError, SnapshotStorage, SnapshotWriter};

const LOG_TARGET: &str = "cardroom::room";

/// Everything the server pushes to a connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "ack")]
    Ack(IntentAck),

    #[serde(rename = "logEvent")]
    LogEvent(LogEventEnvelope),

    #[serde(rename = "privateOverlay")]
    PrivateOverlay { payload: OverlaySnapshotPayload },

    #[serde(rename = "privateOverlayDiff")]
    PrivateOverlayDiff { payload: OverlayDiffPayload },
}

impl From<OverlayMessage> for ServerMessage {
    fn from(message: OverlayMessage) -> Self {
        match message {
            OverlayMessage::Snapshot(payload) => ServerMessage::PrivateOverlay { payload },
            OverlayMessage::Diff(payload) => ServerMessage::PrivateOverlayDiff { payload },
        }
    }
}

/// The receiving end of a connection went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("connection closed")]
pub struct SinkClosed;

/// Outbound half of one connection.
#[async_trait]
pub trait OverlaySink: Send + Sync {
    async fn send(&self, message: ServerMessage) -> Result<(), SinkClosed>;
}

/// A sink backed by an unbounded channel; the transport drains the other
/// end. Also convenient in tests.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl OverlaySink for ChannelSink {
    async fn send(&self, message: ServerMessage) -> Result<(), SinkClosed> {
        self.tx.send(message).map_err(|_| SinkClosed)
    }
}

/// Room construction parameters.
pub struct RoomConfig {
    pub room_id: RoomId,
    pub max_players: usize,
    /// Fixed seed for deterministic rooms; random otherwise.
    pub seed: Option<u64>,
    /// Storage for hidden-state snapshots; `None` disables persistence.
    pub storage: Option<Arc<dyn SnapshotStorage>>,
    pub command_buffer: usize,
}

impl RoomConfig {
    #[must_use]
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            max_players: 8,
            seed: None,
            storage: None,
            command_buffer: 64,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players;
        self
    }
}

/// Commands a transport sends into the room.
pub enum RoomCommand {
    Connect {
        connection: ConnectionId,
        viewer: Viewer,
        sink: Arc<dyn OverlaySink>,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Intent {
        connection: ConnectionId,
        intent: Intent,
    },
    Shutdown,
}

/// Cloneable handle for submitting commands to a running room.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
}

/// The room task is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("room closed")]
pub struct RoomClosed;

impl RoomHandle {
    pub async fn connect(
        &self,
        connection: ConnectionId,
        viewer: Viewer,
        sink: Arc<dyn OverlaySink>,
    ) -> Result<(), RoomClosed> {
        self.tx
            .send(RoomCommand::Connect {
                connection,
                viewer,
                sink,
            })
            .await
            .map_err(|_| RoomClosed)
    }

    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), RoomClosed> {
        self.tx
            .send(RoomCommand::Disconnect { connection })
            .await
            .map_err(|_| RoomClosed)
    }

    pub async fn submit(
        &self,
        connection: ConnectionId,
        intent: Intent,
    ) -> Result<(), RoomClosed> {
        self.tx
            .send(RoomCommand::Intent { connection, intent })
            .await
            .map_err(|_| RoomClosed)
    }

    pub async fn shutdown(&self) -> Result<(), RoomClosed> {
        self.tx
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomClosed)
    }
}

struct Connection {
    sink: Arc<dyn OverlaySink>,
    tracker: OverlayTracker,
}

/// One room's state and command loop.
pub struct Room {
    room_id: RoomId,
    doc: GameDoc,
    hidden: HiddenState,
    rng: GameRng,
    writer: Option<SnapshotWriter>,
    connections: FxHashMap<ConnectionId, Connection>,
    event_seq: u64,
    rx: mpsc::Receiver<RoomCommand>,
}

impl Room {
    /// Open a room, recovering state from storage when available.
    pub async fn open(config: RoomConfig) -> Result<(Self, RoomHandle), SnapshotError> {
        let (tx, rx) = mpsc::channel(config.command_buffer);

        let (writer, recovered) = match &config.storage {
            Some(storage) => {
                let (writer, recovered) =
                    SnapshotWriter::recover(storage.clone(), config.room_id.clone()).await?;
                (Some(writer), recovered)
            }
            None => (None, None),
        };

        let (doc, hidden, rng) = match recovered {
            Some(persisted) => {
                tracing::info!(
                    target: LOG_TARGET,
                    room = %config.room_id,
                    players = persisted.doc.player_count(),
                    "room recovered from snapshot"
                );
                (
                    persisted.doc,
                    persisted.hidden,
                    GameRng::from_state(&persisted.rng),
                )
            }
            None => (
                GameDoc::new(config.room_id.clone(), config.max_players),
                HiddenState::new(),
                config.seed.map_or_else(GameRng::from_entropy, GameRng::new),
            ),
        };

        let room = Self {
            room_id: config.room_id,
            doc,
            hidden,
            rng,
            writer,
            connections: FxHashMap::default(),
            event_seq: 0,
            rx,
        };
        Ok((room, RoomHandle { tx }))
    }

    /// Run the room on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The command loop. Exits when every handle is dropped or on
    /// [`RoomCommand::Shutdown`].
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                RoomCommand::Connect {
                    connection,
                    viewer,
                    sink,
                } => self.handle_connect(connection, viewer, sink).await,
                RoomCommand::Disconnect { connection } => {
                    self.connections.remove(&connection);
                }
                RoomCommand::Intent { connection, intent } => {
                    self.handle_intent(connection, intent).await;
                }
                RoomCommand::Shutdown => break,
            }
        }
        tracing::info!(target: LOG_TARGET, room = %self.room_id, "room stopped");
    }

    async fn handle_connect(
        &mut self,
        connection: ConnectionId,
        viewer: Viewer,
        sink: Arc<dyn OverlaySink>,
    ) {
        let mut tracker = OverlayTracker::new(self.room_id.clone(), viewer);
        let view = build_overlay(&self.doc, &self.hidden, tracker.viewer());
        let message: ServerMessage = tracker.message_for(&view).into();

        if sink.send(message).await.is_err() {
            tracing::debug!(
                target: LOG_TARGET,
                room = %self.room_id,
                connection = %connection,
                "connection closed before first overlay"
            );
            return;
        }
        self.connections
            .insert(connection, Connection { sink, tracker });
    }

    async fn handle_intent(&mut self, connection: ConnectionId, intent: Intent) {
        let intent_id = intent.id.clone();
        let result = intent::apply(&mut self.doc, &mut self.hidden, &mut self.rng, &intent);

        // Exactly one ack per intent, in submission order.
        let ack = match &result {
            Ok(_) => IntentAck::ok(&intent_id),
            Err(err) => IntentAck::rejected(&intent_id, err.to_string()),
        };
        if let Some(conn) = self.connections.get(&connection) {
            let _ = conn.sink.send(ServerMessage::Ack(ack)).await;
        }

        let Ok(outcome) = result else {
            return;
        };

        // Broadcast log events to every connection, best effort.
        for event in outcome.log_events {
            self.event_seq += 1;
            let envelope = LogEventEnvelope {
                event_id: self.event_seq,
                event,
            };
            for conn in self.connections.values() {
                let _ = conn.sink.send(ServerMessage::LogEvent(envelope.clone())).await;
            }
        }

        if outcome.hidden_changed {
            self.broadcast_overlays().await;
            self.persist().await;
        }
    }

    /// Rebuild and send each connection's overlay. Send failures drop the
    /// connection rather than stalling the room.
    async fn broadcast_overlays(&mut self) {
        let mut closed: Vec<ConnectionId> = Vec::new();
        for (id, conn) in self.connections.iter_mut() {
            let view = build_overlay(&self.doc, &self.hidden, conn.tracker.viewer());
            let message: ServerMessage = conn.tracker.message_for(&view).into();
            if conn.sink.send(message).await.is_err() {
                closed.push(id.clone());
            }
        }
        for id in closed {
            tracing::debug!(
                target: LOG_TARGET,
                room = %self.room_id,
                connection = %id,
                "dropping closed connection"
            );
            self.connections.remove(&id);
        }
    }

    /// Persist hidden state; failures are logged and swallowed.
    async fn persist(&mut self) {
        let Some(writer) = &mut self.writer else {
            return;
        };
        if let Err(err) = writer
            .persist(&self.doc, &self.hidden, &self.rng.state())
            .await
        {
            tracing::warn!(
                target: LOG_TARGET,
                room = %self.room_id,
                error = %err,
                "snapshot persist failed; keeping in-memory state"
            );
        }
    }
}
