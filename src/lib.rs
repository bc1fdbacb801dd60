//! # cardroom
//!
//! Server-side authoritative engine for a real-time multiplayer card
//! table: several connected viewers (players and spectators) share one
//! logical room, and this crate keeps the replicated public document
//! consistent while guaranteeing that each player's private information
//! (hand contents, library order, face-down identities) is never exposed
//! to a viewer not entitled to it.
//!
//! ## Design Principles
//!
//! 1. **Attributable mutation**: every change arrives as an intent with
//!    an actor, is permission-checked, applied atomically, and acked
//!    exactly once.
//!
//! 2. **Partitioned state**: a card lives in exactly one of the public
//!    document or the server-only hidden partition; hidden-zone order and
//!    counts are authoritative only on the server.
//!
//! 3. **Entitlement-driven visibility**: hidden information reaches a
//!    viewer only through per-viewer overlays built from explicit
//!    entitlement rules, diffed per connection under a bandwidth cap.
//!
//! 4. **Restart-safe**: hidden state persists through chunked, two-phase
//!    snapshots; a crash loses at most the latest increment, never
//!    corrupts.
//!
//! ## Modules
//!
//! - `core`: identifiers, players, zones, cards, log events, RNG
//! - `document`: typed, transactional access to the replicated document
//! - `perms`: pure permission predicates
//! - `position`: battlefield placement and collision resolution
//! - `transforms`: pure card-record transforms
//! - `hidden`: the server-only hidden-state partition
//! - `movement`: the card-movement state machine
//! - `intent`: the validate/authorize/dispatch pipeline
//! - `overlay`: per-viewer overlay building and diffing
//! - `snapshot`: chunked two-phase persistence
//! - `room`: the single-owner room actor

pub mod core;
pub mod document;
pub mod hidden;
pub mod intent;
pub mod movement;
pub mod overlay;
pub mod perms;
pub mod position;
pub mod room;
pub mod snapshot;
pub mod transforms;

// Re-export commonly used types
pub use crate::core::{
    Card, CardFace, CardId, CardLite, ConnectionId, FaceDownMode, GameRng, GameRngState,
    LibraryTopReveal, LogEvent, LogEventEnvelope, Player, PlayerId, Position, RoomId, Zone,
    ZoneId, ZoneKind,
};

pub use crate::document::{GameDoc, Placement, RoomMeta};

pub use crate::hidden::{chunk_hidden_cards, HiddenState, RevealGrant, MAX_CHUNK_BYTES};

pub use crate::intent::{apply, ApplyOutcome, Intent, IntentAck, IntentError, IntentKind};

pub use crate::movement::{move_card, MoveError, MoveOutcome, MoveRequest, MoveSemantic};

pub use crate::overlay::{
    build_overlay, OverlayMessage, OverlayTracker, OverlayView, Viewer, ViewerRole,
};

pub use crate::perms::PermissionDenied;

pub use crate::room::{
    ChannelSink, OverlaySink, Room, RoomCommand, RoomConfig, RoomHandle, ServerMessage,
};

pub use crate::snapshot::{
    MemoryStorage, PersistedRoom, SnapshotError, SnapshotStorage, SnapshotWriter, StorageError,
    WriterPhase,
};
