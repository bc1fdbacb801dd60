//! Core room types: identifiers, players, zones, cards, log events, RNG.
//!
//! These are the data-model building blocks shared by the document store,
//! the hidden-state partition, and the intent pipeline.

pub mod card;
pub mod events;
pub mod ids;
pub mod player;
pub mod rng;
pub mod zone;

pub use card::{Card, CardFace, CardLite, FaceDownMode, Position, MAX_REVEAL_TARGETS};
pub use events::{LogEvent, LogEventEnvelope, REDACTED_CARD_NAME};
pub use ids::{CardId, ConnectionId, PlayerId, RoomId, ZoneId};
pub use player::{LibraryTopReveal, Player};
pub use rng::{GameRng, GameRngState};
pub use zone::{Zone, ZoneKind};
