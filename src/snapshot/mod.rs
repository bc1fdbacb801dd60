//! Chunked, two-phase snapshot persistence.
//!
//! Hidden state must survive restarts without losing or double-applying
//! mutations. Each persist runs an explicit state machine:
//!
//! ```text
//! Idle → Staging (pending meta written)
//!      → Committing (document, hidden meta, card chunks written)
//!      → Committed (meta promoted)
//!      → Idle (pending cleared, stale generation deleted)
//! ```
//!
//! Every generation writes under its own key prefix, so a crash anywhere
//! before the commit leaves the previous committed generation untouched.
//! Recovery reads both pending and committed metadata, discards orphaned
//! pending artifacts, and loads the committed generation.
//!
//! The hidden card map is chunked (see [`crate::hidden::chunk`]) so no
//! single storage record exceeds the per-key ceiling.

pub mod storage;

pub use storage::{MemoryStorage, SnapshotStorage, StorageError};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Card, GameRngState, RoomId};
use crate::document::GameDoc;
use crate::hidden::{chunk_hidden_cards, HiddenState, MAX_CHUNK_BYTES};

const LOG_TARGET: &str = "cardroom::snapshot";

/// A failed snapshot operation. Callers log and swallow; in-memory state
/// stays the source of truth until the next successful persist.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Where the writer is in the two-phase protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterPhase {
    Idle,
    Staging,
    Committing,
    Committed,
}

/// Snapshot metadata, stored at both the pending and committed keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotMeta {
    generation: u64,
    chunk_count: usize,
}

/// Everything persisted besides the chunked cards.
#[derive(Serialize, Deserialize)]
struct RoomBlob {
    doc: GameDoc,
    rng: GameRngState,
}

#[derive(Serialize, Deserialize)]
struct HiddenMeta {
    hidden: HiddenState,
}

/// A fully recovered room.
pub struct PersistedRoom {
    pub doc: GameDoc,
    pub hidden: HiddenState,
    pub rng: GameRngState,
}

/// Two-phase snapshot writer for one room.
pub struct SnapshotWriter {
    storage: Arc<dyn SnapshotStorage>,
    room: RoomId,
    generation: u64,
    phase: WriterPhase,
}

impl SnapshotWriter {
    /// A writer for a brand-new room (no recovery).
    #[must_use]
    pub fn new(storage: Arc<dyn SnapshotStorage>, room: RoomId) -> Self {
        Self {
            storage,
            room,
            generation: 0,
            phase: WriterPhase::Idle,
        }
    }

    /// Recover a room from storage, cleaning up any interrupted persist.
    ///
    /// Returns the writer positioned after the committed generation, and
    /// the recovered room state when a committed snapshot exists.
    pub async fn recover(
        storage: Arc<dyn SnapshotStorage>,
        room: RoomId,
    ) -> Result<(Self, Option<PersistedRoom>), SnapshotError> {
        let mut writer = Self::new(storage, room);

        let committed: Option<SnapshotMeta> = writer.read_meta(&writer.committed_key()).await?;
        let pending: Option<SnapshotMeta> = writer.read_meta(&writer.pending_key()).await?;

        // Orphaned pending artifacts are from a persist that never
        // committed; the previously committed snapshot wins.
        if let Some(pending) = pending {
            if committed.as_ref().map(|c| c.generation) != Some(pending.generation) {
                tracing::warn!(
                    target: LOG_TARGET,
                    room = %writer.room,
                    generation = pending.generation,
                    "discarding orphaned pending snapshot"
                );
                writer.delete_generation(pending.generation).await;
            }
            writer.storage.delete(&writer.pending_key()).await?;
        }

        let Some(meta) = committed else {
            return Ok((writer, None));
        };
        writer.generation = meta.generation;

        let room_state = writer.load_generation(&meta).await?;
        Ok((writer, Some(room_state)))
    }

    /// The writer's current protocol phase.
    #[must_use]
    pub fn phase(&self) -> WriterPhase {
        self.phase
    }

    /// The last committed generation (0 before the first persist).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Persist the room: pending meta, artifacts, promote, clean up.
    pub async fn persist(
        &mut self,
        doc: &GameDoc,
        hidden: &HiddenState,
        rng: &GameRngState,
    ) -> Result<(), SnapshotError> {
        let generation = self.generation + 1;
        let result = self.persist_generation(generation, doc, hidden, rng).await;
        match result {
            Ok(()) => {
                let stale = self.generation;
                self.generation = generation;
                if stale > 0 {
                    self.delete_generation(stale).await;
                }
                let _ = self.storage.delete(&self.pending_key()).await;
                self.phase = WriterPhase::Idle;
                tracing::debug!(
                    target: LOG_TARGET,
                    room = %self.room,
                    generation,
                    "snapshot committed"
                );
                Ok(())
            }
            Err(err) => {
                self.phase = WriterPhase::Idle;
                Err(err)
            }
        }
    }

    async fn persist_generation(
        &mut self,
        generation: u64,
        doc: &GameDoc,
        hidden: &HiddenState,
        rng: &GameRngState,
    ) -> Result<(), SnapshotError> {
        let chunks = chunk_hidden_cards(&hidden.cards, MAX_CHUNK_BYTES);
        let meta = SnapshotMeta {
            generation,
            chunk_count: chunks.len(),
        };

        self.phase = WriterPhase::Staging;
        self.storage
            .put(&self.pending_key(), encode(&meta)?)
            .await?;

        self.phase = WriterPhase::Committing;
        let blob = RoomBlob {
            doc: doc.clone(),
            rng: rng.clone(),
        };
        self.storage
            .put(&self.document_key(generation), encode(&blob)?)
            .await?;

        let mut hidden_meta = hidden.clone();
        hidden_meta.cards = Default::default();
        self.storage
            .put(
                &self.hidden_key(generation),
                encode(&HiddenMeta { hidden: hidden_meta })?,
            )
            .await?;

        for (index, chunk) in chunks.iter().enumerate() {
            self.storage
                .put(&self.chunk_key(generation, index), encode(chunk)?)
                .await?;
        }

        self.storage
            .put(&self.committed_key(), encode(&meta)?)
            .await?;
        self.phase = WriterPhase::Committed;
        Ok(())
    }

    async fn load_generation(&self, meta: &SnapshotMeta) -> Result<PersistedRoom, SnapshotError> {
        let blob: RoomBlob = self
            .read_required(&self.document_key(meta.generation))
            .await?;
        let hidden_meta: HiddenMeta = self
            .read_required(&self.hidden_key(meta.generation))
            .await?;

        let mut hidden = hidden_meta.hidden;
        for index in 0..meta.chunk_count {
            let chunk: Vec<Card> = self
                .read_required(&self.chunk_key(meta.generation, index))
                .await?;
            for card in chunk {
                hidden.cards.insert(card.id.clone(), card);
            }
        }

        Ok(PersistedRoom {
            doc: blob.doc,
            hidden,
            rng: blob.rng,
        })
    }

    async fn read_meta(&self, key: &str) -> Result<Option<SnapshotMeta>, SnapshotError> {
        match self.storage.get(key).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_required<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, SnapshotError> {
        let bytes = self
            .storage
            .get(key)
            .await?
            .ok_or_else(|| SnapshotError::Corrupt(format!("missing key: {key}")))?;
        decode(&bytes)
    }

    /// Best-effort removal of one generation's artifacts.
    async fn delete_generation(&self, generation: u64) {
        let prefix = format!("{}/{generation}/", self.room);
        if let Ok(keys) = self.storage.list(&prefix).await {
            for key in keys {
                let _ = self.storage.delete(&key).await;
            }
        }
    }

    fn pending_key(&self) -> String {
        format!("{}/meta/pending", self.room)
    }

    fn committed_key(&self) -> String {
        format!("{}/meta/committed", self.room)
    }

    fn document_key(&self, generation: u64) -> String {
        format!("{}/{generation}/document", self.room)
    }

    fn hidden_key(&self, generation: u64) -> String {
        format!("{}/{generation}/hidden", self.room)
    }

    fn chunk_key(&self, generation: u64, index: usize) -> String {
        format!("{}/{generation}/cards/{index}", self.room)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SnapshotError> {
    bincode::serialize(value).map_err(|e| SnapshotError::Corrupt(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, SnapshotError> {
    bincode::deserialize(bytes).map_err(|e| SnapshotError::Corrupt(e.to_string()))
}
