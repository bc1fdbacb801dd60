//! Intent handlers, one per intent kind.
//!
//! Handlers follow a shared discipline:
//! 1. resolve and validate everything the mutation needs,
//! 2. re-check permission through `perms`,
//! 3. mutate, appending log events and marking hidden changes.
//!
//! Nothing is mutated before step 3, so a rejected intent leaves both
//! partitions untouched even before the pipeline's rollback kicks in.

mod cards;
mod deck;
mod library;
mod player;
mod room;
mod zones;

use crate::core::{GameRng, LogEvent, PlayerId};
use crate::document::GameDoc;
use crate::hidden::HiddenState;
use crate::movement::MoveOutcome;

use super::types::{IntentError, IntentKind};

/// Mutable room state threaded through one intent application.
pub(crate) struct Ctx<'a> {
    pub doc: &'a mut GameDoc,
    pub hidden: &'a mut HiddenState,
    pub rng: &'a mut GameRng,
    pub events: Vec<LogEvent>,
    pub hidden_changed: bool,
}

impl Ctx<'_> {
    /// Signal that the hidden partition changed: the caller must rebuild
    /// overlays and re-persist hidden state after this intent.
    pub fn mark_hidden_changed(&mut self) {
        self.hidden_changed = true;
    }

    pub fn log(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    /// Fold a movement outcome into this intent's result.
    pub fn absorb(&mut self, outcome: MoveOutcome) {
        self.events.extend(outcome.events);
        self.hidden_changed |= outcome.hidden_changed;
    }
}

/// Exhaustive dispatch over the sealed intent registry.
pub(crate) fn dispatch(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    kind: &IntentKind,
) -> Result<(), IntentError> {
    match kind {
        IntentKind::PlayerJoin(p) => player::join(ctx, actor, p),
        IntentKind::PlayerUpdate(p) => player::update(ctx, actor, p),
        IntentKind::PlayerLeave(p) => player::leave(ctx, actor, p),
        IntentKind::ZoneAdd(p) => zones::add(ctx, actor, p),
        IntentKind::ZoneReorder(p) => zones::reorder(ctx, actor, p),
        IntentKind::CardAdd(p) => cards::add(ctx, actor, p),
        IntentKind::CardRemove(p) => cards::remove(ctx, actor, p),
        IntentKind::CardUpdate(p) => cards::update(ctx, actor, p),
        IntentKind::CardTap(p) => cards::tap(ctx, actor, p),
        IntentKind::CardDuplicate(p) => cards::duplicate(ctx, actor, p),
        IntentKind::CardTransform(p) => cards::transform(ctx, actor, p),
        IntentKind::CardMove(p) => cards::mv(ctx, actor, p),
        IntentKind::CardReveal(p) => cards::reveal(ctx, actor, p),
        IntentKind::CounterAdjust(p) => cards::counter_adjust(ctx, actor, p),
        IntentKind::LibraryDraw(p) => library::draw(ctx, actor, p),
        IntentKind::LibraryDiscard(p) => library::discard(ctx, actor, p),
        IntentKind::LibraryShuffle(p) => library::shuffle(ctx, actor, p),
        IntentKind::LibraryView(p) => library::view(ctx, actor, p),
        IntentKind::DeckLoad(p) => deck::load(ctx, actor, p),
        IntentKind::DeckReset(p) => deck::reset(ctx, actor, p),
        IntentKind::DeckUnload(p) => deck::unload(ctx, actor, p),
        IntentKind::DeckMulligan(p) => deck::mulligan(ctx, actor, p),
        IntentKind::RoomLock(p) => room::lock(ctx, actor, p),
        IntentKind::BattlefieldScale(p) => room::scale(ctx, actor, p),
        IntentKind::GlobalCounterAdd(p) => room::global_counter(ctx, actor, p),
        IntentKind::CoinFlip(p) => room::coin_flip(ctx, actor, p),
        IntentKind::DiceRoll(p) => room::dice_roll(ctx, actor, p),
    }
}

/// Actor must be the player a player-scoped intent acts on.
pub(crate) fn require_self(actor: &PlayerId, target: &PlayerId) -> Result<(), IntentError> {
    if actor == target {
        Ok(())
    } else {
        Err(IntentError::ActorMismatch)
    }
}
