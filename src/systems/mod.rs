//! Default performers and the phase loop.
//!
//! `install` attaches one performer per action kind an effect can map to,
//! plus the phase and energy kinds, and the system subscribers that chain
//! phases together. Performers mutate state directly and queue follow-up
//! actions through `add_reaction`; they never submit top-level flows.
//!
//! Performers are lenient: a target that lacks the needed capability, sits
//! in the wrong zone or no longer exists is skipped with a `debug!` line.

pub mod cards;
pub mod play;
pub mod stats;
pub mod turn;

use crate::cards::{Buff, BuffKind};
use crate::core::action::Action;
use crate::engine::Engine;
use crate::pipeline::{ActionPipeline, Performed};

/// Attach every default performer and system subscriber.
pub fn install(pipeline: &mut ActionPipeline<Engine>) {
    stats::install(pipeline);
    cards::install(pipeline);
    play::install(pipeline);
    turn::install(pipeline);
}

/// Buff attributed to the ability (or entity) that produced `action`.
pub(crate) fn sourced_buff(action: &Action, kind: BuffKind, amount: i64) -> Buff {
    let buff = Buff::new(kind, amount);
    match (action.owner, action.ability) {
        (Some(owner), Some(ability)) => buff.from_ability(owner, ability),
        (Some(owner), None) => buff.from_entity(owner),
        _ => buff,
    }
}

/// Outcome for performers that take time on screen.
pub(crate) fn timed(engine: &Engine) -> Performed {
    match engine.config().performer_delay_ticks {
        0 => Performed::Done,
        ticks => Performed::Wait(ticks),
    }
}
