//! Card movement and card creation performers.

use tracing::debug;

use super::{sourced_buff, timed};
use crate::abilities::{AbilitySystem, AbilityTrigger};
use crate::cards::{BuffKind, Capabilities};
use crate::core::action::{Action, ActionKind};
use crate::core::config::LocationPosition;
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;
use crate::engine::Engine;
use crate::pipeline::{ActionPipeline, Performed};
use crate::zones::{Zone, ZonePosition};

pub fn install(pipeline: &mut ActionPipeline<Engine>) {
    pipeline.attach_performer(ActionKind::DestroyCard, destroy);
    pipeline.attach_performer(ActionKind::DiscardCard, discard);
    pipeline.attach_performer(ActionKind::MoveCard, move_card);
    pipeline.attach_performer(ActionKind::ReturnCard, return_card);
    pipeline.attach_performer(ActionKind::DrawCard, draw);
    pipeline.attach_performer(ActionKind::AddCardToHand, add_to_hand);
    pipeline.attach_performer(ActionKind::AddCardToLocation, add_to_location);
    pipeline.attach_performer(ActionKind::MergeCards, merge);
    pipeline.attach_performer(ActionKind::CreateCardInHand, create_in_hand);
    pipeline.attach_performer(ActionKind::CreateCardInDeck, create_in_deck);
    pipeline.attach_performer(ActionKind::CreateCardInLocation, create_in_location);
}

fn card_owner(engine: &Engine, card: EntityId) -> Option<PlayerId> {
    engine.state().card(card).map(|c| c.owner)
}

fn on_board(engine: &Engine, card: EntityId) -> bool {
    engine.state().zones.zone_of(card).is_some_and(Zone::is_board)
}

fn hand_full(engine: &Engine, player: PlayerId) -> bool {
    engine.state().hand(player).len() >= engine.state().max_hand_size()
}

fn destroy(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some(player) = card_owner(engine, target) else {
            continue;
        };
        if !on_board(engine, target) || !engine.state().has_capability(target, Capabilities::DESTRUCTIBLE) {
            debug!(target = %target, "destroy skipped");
            continue;
        }
        AbilitySystem::tear_down(engine, target, Some(AbilityTrigger::Destroyed));
        engine
            .state_mut()
            .zones
            .move_to(target, Zone::Destroyed(player), ZonePosition::Top);
    }
    Performed::Done
}

fn discard(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some(player) = card_owner(engine, target) else {
            continue;
        };
        let in_hand = engine.state().zones.zone_of(target) == Some(Zone::Hand(player));
        if !in_hand || !engine.state().has_capability(target, Capabilities::DISCARDABLE) {
            debug!(target = %target, "discard skipped");
            continue;
        }
        engine
            .state_mut()
            .zones
            .move_to(target, Zone::Discard(player), ZonePosition::Top);
    }
    Performed::Done
}

/// Next position to the right (wrapping) with room on `player`'s side.
fn next_open_position(engine: &Engine, from: LocationPosition, player: PlayerId) -> Option<LocationPosition> {
    let state = engine.state();
    let count = state.location_count();
    (1..count)
        .map(|offset| LocationPosition((from.0 + offset) % count))
        .find(|&position| !state.is_location_full(position, player))
}

fn move_card(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some((from, player)) = engine.state().side_of(target) else {
            continue;
        };
        if engine.state().card(target).is_none() || !engine.state().has_capability(target, Capabilities::MOVEABLE) {
            debug!(target = %target, "move skipped");
            continue;
        }
        let destination = match action.location {
            Some(position) if position != from && !engine.state().is_location_full(position, player) => Some(position),
            Some(_) => None,
            None => next_open_position(engine, from, player),
        };
        let Some(destination) = destination else {
            debug!(target = %target, "no room to move");
            continue;
        };
        engine
            .state_mut()
            .zones
            .move_to(target, Zone::Location(destination, player), ZonePosition::Top);
    }
    Performed::Done
}

/// Back to hand with play state cleared; to the discard pile if the hand is full.
fn return_card(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some(player) = card_owner(engine, target) else {
            continue;
        };
        if !on_board(engine, target) {
            continue;
        }
        AbilitySystem::tear_down(engine, target, None);
        let zone = if hand_full(engine, player) {
            Zone::Discard(player)
        } else {
            Zone::Hand(player)
        };
        let auras = engine.abilities().ongoing_targeting(target);
        let state = engine.state_mut();
        if let Some(card) = state.card_mut(target) {
            card.reset(&auras);
        }
        state.zones.move_to(target, zone, ZonePosition::Top);
    }
    Performed::Done
}

/// Draw `value` cards for `player`. Drawn cards are appended to the targets.
fn draw(engine: &mut Engine, action: &mut Action) -> Performed {
    let Some(player) = action.player else {
        return Performed::Done;
    };
    for _ in 0..action.value.max(0) {
        if hand_full(engine, player) {
            debug!(player = %player, "hand full; draw stopped");
            break;
        }
        let state = engine.state_mut();
        let Some(card) = state.zones.pop_top(Zone::Deck(player)) else {
            debug!(player = %player, "deck empty; draw stopped");
            break;
        };
        state.zones.add(card, Zone::Hand(player), ZonePosition::Top);
        action.targets.push(card);
    }
    timed(engine)
}

fn add_to_hand(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some(player) = card_owner(engine, target) else {
            continue;
        };
        let zone = engine.state().zones.zone_of(target);
        if zone == Some(Zone::Hand(player)) || zone.is_some_and(Zone::is_board) || hand_full(engine, player) {
            debug!(target = %target, "add to hand skipped");
            continue;
        }
        engine
            .state_mut()
            .zones
            .move_to(target, Zone::Hand(player), ZonePosition::Top);
    }
    Performed::Done
}

/// Position a card added to the board lands at: the action's location,
/// else the ability owner's position, else the first side with room.
fn landing_position(engine: &Engine, action: &Action, player: PlayerId) -> Option<LocationPosition> {
    let state = engine.state();
    let preferred = action
        .location
        .or_else(|| action.owner.and_then(|o| state.side_of(o)).map(|(position, _)| position));
    match preferred {
        Some(position) if !state.is_location_full(position, player) => Some(position),
        Some(_) => None,
        None => state.positions().find(|&p| !state.is_location_full(p, player)),
    }
}

fn add_to_location(engine: &mut Engine, action: &mut Action) -> Performed {
    for &target in &action.targets {
        let Some(player) = card_owner(engine, target) else {
            continue;
        };
        if on_board(engine, target) {
            continue;
        }
        let Some(position) = landing_position(engine, action, player) else {
            debug!(target = %target, "no room at location");
            continue;
        };
        engine
            .state_mut()
            .zones
            .move_to(target, Zone::Location(position, player), ZonePosition::Top);
        AbilitySystem::activate_on_reveal(engine, target, Some(&*action));
    }
    Performed::Done
}

/// The owner absorbs each target's power; the target is banished.
fn merge(engine: &mut Engine, action: &mut Action) -> Performed {
    let Some(owner) = action.owner else {
        return Performed::Done;
    };
    for &target in action.targets.iter().filter(|&&t| t != owner) {
        if !on_board(engine, target) {
            continue;
        }
        let absorbed = engine.state().power_of(target);
        AbilitySystem::tear_down(engine, target, Some(AbilityTrigger::Banished));
        let state = engine.state_mut();
        state.apply_buff(owner, sourced_buff(action, BuffKind::AdditionalPower, absorbed));
        state.zones.move_to(target, Zone::Banished, ZonePosition::Top);
    }
    Performed::Done
}

/// Spawn the card named by the action's amount for `player`, marked as created.
fn create(engine: &mut Engine, action: &mut Action, player: PlayerId, zone: Zone, position: ZonePosition) -> Option<EntityId> {
    let name = action.amount.value.trim();
    let Some(definition) = engine.cards().get(name) else {
        debug!(card = name, "create skipped: unknown card");
        return None;
    };
    let state = engine.state_mut();
    let card = state.spawn_card(definition.clone(), player, zone, position);
    if let Some(instance) = state.card_mut(card) {
        instance.created = true;
    }
    let source = action.owner.unwrap_or(card);
    state.apply_buff(card, crate::cards::Buff::new(BuffKind::Created, 0).from_entity(source));
    AbilitySystem::set_up_abilities(engine, &definition, card);
    action.created.push(card);
    Some(card)
}

/// Player a create-effect target stands for: its owner.
fn target_players(engine: &Engine, action: &Action) -> Vec<PlayerId> {
    let mut players = Vec::new();
    for &target in &action.targets {
        if let Some(player) = engine.state().owner_of(target) {
            players.push(player);
        }
    }
    players
}

fn create_in_hand(engine: &mut Engine, action: &mut Action) -> Performed {
    for player in target_players(engine, action) {
        if hand_full(engine, player) {
            debug!(player = %player, "hand full; created card discarded");
            continue;
        }
        create(engine, action, player, Zone::Hand(player), ZonePosition::Top);
    }
    Performed::Done
}

/// Created deck cards are shuffled in at a random depth.
fn create_in_deck(engine: &mut Engine, action: &mut Action) -> Performed {
    for player in target_players(engine, action) {
        let depth = engine.state().deck(player).len() + 1;
        let index = engine.state_mut().rng.index(depth);
        create(engine, action, player, Zone::Deck(player), ZonePosition::Index(index));
    }
    Performed::Done
}

/// One card per targeted side, revealed in place.
fn create_in_location(engine: &mut Engine, action: &mut Action) -> Performed {
    let sides: Vec<(LocationPosition, PlayerId)> = action
        .targets
        .iter()
        .filter_map(|&t| engine.state().side_of(t))
        .collect();
    for (position, player) in sides {
        if engine.state().is_location_full(position, player) {
            debug!(position = %position, player = %player, "location full; created card skipped");
            continue;
        }
        let Some(card) = create(engine, action, player, Zone::Location(position, player), ZonePosition::Top) else {
            continue;
        };
        if let Some(instance) = engine.state_mut().card_mut(card) {
            instance.revealed = true;
        }
        AbilitySystem::activate_on_reveal(engine, card, Some(&*action));
    }
    Performed::Done
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::abilities::{AbilityAmount, AbilityId};
    use crate::cards::{CardDefinition, CardRegistry};
    use crate::core::EngineConfig;

    const P0: PlayerId = PlayerId(0);
    const P1: PlayerId = PlayerId(1);
    const LEFT: LocationPosition = LocationPosition(0);

    fn engine() -> Engine {
        let mut cards = CardRegistry::new();
        cards.register(CardDefinition::new("Rock", 1, 3));
        Engine::new(EngineConfig::default(), cards).unwrap()
    }

    fn card(engine: &mut Engine, player: PlayerId, zone: Zone) -> EntityId {
        engine.add_card(Rc::new(CardDefinition::new("Filler", 1, 2)), player, zone)
    }

    fn run(engine: &mut Engine, kind: ActionKind, owner: EntityId, targets: &[EntityId], amount: AbilityAmount) {
        let action = Action::effect(kind, owner, AbilityId(0), targets.iter().copied(), amount, 0);
        engine.perform(action).unwrap();
        engine.run_until_idle().unwrap();
    }

    #[test]
    fn test_destroy_moves_to_destroyed_pile() {
        let mut engine = engine();
        let owner = card(&mut engine, P0, Zone::Location(LEFT, P0));
        let target = card(&mut engine, P1, Zone::Location(LEFT, P1));
        run(&mut engine, ActionKind::DestroyCard, owner, &[target], AbilityAmount::default());
        assert_eq!(engine.state().zones.zone_of(target), Some(Zone::Destroyed(P1)));
    }

    #[test]
    fn test_destroy_ignores_cards_in_hand() {
        let mut engine = engine();
        let owner = card(&mut engine, P0, Zone::Location(LEFT, P0));
        let target = card(&mut engine, P1, Zone::Hand(P1));
        run(&mut engine, ActionKind::DestroyCard, owner, &[target], AbilityAmount::default());
        assert_eq!(engine.state().zones.zone_of(target), Some(Zone::Hand(P1)));
    }

    #[test]
    fn test_move_wraps_to_next_open_side() {
        let mut engine = engine();
        let last = LocationPosition(2);
        let target = card(&mut engine, P0, Zone::Location(last, P0));
        run(&mut engine, ActionKind::MoveCard, target, &[target], AbilityAmount::default());
        assert_eq!(engine.state().zones.zone_of(target), Some(Zone::Location(LEFT, P0)));
    }

    #[test]
    fn test_return_clears_buffs() {
        let mut engine = engine();
        let target = card(&mut engine, P0, Zone::Location(LEFT, P0));
        engine
            .state_mut()
            .apply_buff(target, crate::cards::Buff::new(BuffKind::AdditionalPower, 4));
        run(&mut engine, ActionKind::ReturnCard, target, &[target], AbilityAmount::default());
        assert_eq!(engine.state().zones.zone_of(target), Some(Zone::Hand(P0)));
        assert_eq!(engine.state().power_of(target), 2);
    }

    #[test]
    fn test_merge_absorbs_power() {
        let mut engine = engine();
        let owner = card(&mut engine, P0, Zone::Location(LEFT, P0));
        let target = card(&mut engine, P0, Zone::Location(LEFT, P0));
        run(&mut engine, ActionKind::MergeCards, owner, &[target], AbilityAmount::default());
        assert_eq!(engine.state().power_of(owner), 4);
        assert_eq!(engine.state().zones.zone_of(target), Some(Zone::Banished));
    }

    #[test]
    fn test_draw_stops_at_empty_deck() {
        let mut engine = engine();
        card(&mut engine, P0, Zone::Deck(P0));
        engine.perform(Action::draw(P0, 3)).unwrap();
        engine.run_until_idle().unwrap();
        assert_eq!(engine.state().hand(P0).len(), 1);
        assert!(engine.state().deck(P0).is_empty());
    }

    #[test]
    fn test_create_in_hand_marks_created() {
        let mut engine = engine();
        let owner = card(&mut engine, P0, Zone::Location(LEFT, P0));
        let player = crate::core::EntityId::player(P0);
        run(&mut engine, ActionKind::CreateCardInHand, owner, &[player], AbilityAmount::card("Rock"));

        let hand = engine.state().hand(P0).to_vec();
        assert_eq!(hand.len(), 1);
        let created = engine.state().card(hand[0]).unwrap();
        assert!(created.created);
        assert_eq!(created.name(), "Rock");
    }

    #[test]
    fn test_create_unknown_card_is_skipped() {
        let mut engine = engine();
        let owner = card(&mut engine, P0, Zone::Location(LEFT, P0));
        let player = crate::core::EntityId::player(P0);
        run(&mut engine, ActionKind::CreateCardInHand, owner, &[player], AbilityAmount::card("Nope"));
        assert!(engine.state().hand(P0).is_empty());
    }
}
