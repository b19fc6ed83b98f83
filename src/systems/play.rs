//! Playing cards and granting abilities.

use std::rc::Rc;

use tracing::{debug, warn};

use super::timed;
use crate::abilities::{AbilityDefinition, AbilitySystem};
use crate::core::action::{Action, ActionKind};
use crate::engine::Engine;
use crate::pipeline::{ActionPipeline, Performed};
use crate::zones::{Zone, ZonePosition};

pub fn install(pipeline: &mut ActionPipeline<Engine>) {
    pipeline.attach_performer(ActionKind::RevealCard, reveal);
    pipeline.attach_performer(ActionKind::AddTemporaryAbility, add_temporary_ability);
}

/// Put the card on its owner's side of `location`, pay its cost, record
/// the play and fire its on-reveal abilities.
fn reveal(engine: &mut Engine, action: &mut Action) -> Performed {
    let Some(&card) = action.targets.first() else {
        return Performed::Done;
    };
    let Some((player, cost)) = engine.state().card(card).map(|c| (c.owner, c.cost())) else {
        return Performed::Done;
    };

    if let Some(position) = action.location {
        let state = engine.state_mut();
        if state.zones.zone_of(card) != Some(Zone::Location(position, player)) {
            if state.is_location_full(position, player) {
                debug!(card = %card, position = %position, "reveal skipped: location full");
                return Performed::Done;
            }
            state
                .zones
                .move_to(card, Zone::Location(position, player), ZonePosition::Top);
            let energy = state.energy.get_mut(player);
            energy.current = (energy.current - cost).max(0);
        }
    }

    let order = engine.state_mut().record_play(card);
    debug!(card = %card, player = %player, ?order, "card revealed");
    AbilitySystem::activate_on_reveal(engine, card, Some(&*action));
    timed(engine)
}

/// Install the JSON ability in the amount payload on every target card.
fn add_temporary_ability(engine: &mut Engine, action: &mut Action) -> Performed {
    let definition = match AbilityDefinition::from_json(&action.amount.value) {
        Ok(definition) => Rc::new(definition),
        Err(err) => {
            warn!(ability = ?action.ability, %err, "temporary ability payload rejected");
            return Performed::Done;
        }
    };
    for &target in &action.targets {
        let Some(revealed) = engine.state().card(target).map(|c| c.revealed) else {
            continue;
        };
        let id = AbilitySystem::install(engine, Rc::clone(&definition), target);
        debug!(target = %target, ability = %id, "temporary ability granted");
        if revealed && engine.state().zones.zone_of(target).is_some_and(Zone::is_board) {
            AbilitySystem::activate(engine, id, Some(&*action));
        }
    }
    Performed::Done
}
