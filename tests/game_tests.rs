//! Whole-game integration tests.
//!
//! These drive the engine only through `start_game`, `play_card` and
//! `end_turn`, the same surface a UI or a bot would use.

use std::rc::Rc;

use snap_engine::abilities::{AbilityAmount, AbilityDefinition, AbilityEffect, AbilityTargetDefinition, AbilityTrigger, TargetKind};
use snap_engine::cards::{CardDefinition, CardRegistry};
use snap_engine::core::{EngineConfig, EntityId, LocationPosition, Phase, PlayerId};
use snap_engine::engine::{Engine, GameResult};
use snap_engine::error::EngineError;
use snap_engine::zones::Zone;

const P0: PlayerId = PlayerId(0);
const P1: PlayerId = PlayerId(1);
const LEFT: LocationPosition = LocationPosition(0);

fn stocked(config: EngineConfig, deck: &[(i64, i64)]) -> Engine {
    let mut engine = Engine::new(config, CardRegistry::new()).unwrap();
    for player in PlayerId::both() {
        for &(cost, power) in deck {
            let def = Rc::new(CardDefinition::new(format!("C{cost}P{power}"), cost, power));
            engine.add_card(def, player, Zone::Deck(player));
        }
    }
    engine
}

fn curve() -> Vec<(i64, i64)> {
    (1..=6).flat_map(|cost| [(cost, cost + 1), (cost, cost)]).collect()
}

/// Play the cheapest affordable card to the first side with room.
fn play_cheapest(engine: &mut Engine, player: PlayerId) -> Option<EntityId> {
    let state = engine.state();
    let energy = state.energy[player].current;
    let card = state
        .hand(player)
        .iter()
        .copied()
        .filter(|&c| state.card(c).is_some_and(|c| c.cost() <= energy))
        .min_by_key(|&c| state.card(c).map_or(i64::MAX, |c| c.cost()))?;
    let position = state.positions().find(|&p| !state.is_location_full(p, player))?;
    engine.play_card(card, position).unwrap();
    Some(card)
}

fn play_out(engine: &mut Engine) {
    engine.start_game().unwrap();
    while !engine.state().game_over {
        let first = engine.state().priority_player;
        for player in [first, first.opponent()] {
            play_cheapest(engine, player);
        }
        engine.end_turn().unwrap();
    }
}

#[test]
fn test_full_game_reaches_a_result() {
    let mut engine = stocked(EngineConfig::default().with_seed(7), &curve());
    play_out(&mut engine);

    let state = engine.state();
    assert_eq!(state.turn, 6);
    assert_eq!(state.phase, Phase::End);
    assert_eq!(state.energy[P0].max, 6, "one max energy per turn");
    assert!(!state.play_history.is_empty());
    assert!(engine.result().is_some());
}

#[test]
fn test_same_seed_same_game() {
    let history = |seed| {
        let mut engine = stocked(EngineConfig::default().with_seed(seed), &curve());
        play_out(&mut engine);
        let plays: Vec<EntityId> = engine.state().play_history.iter().map(|r| r.card).collect();
        (plays, engine.result())
    };
    assert_eq!(history(11), history(11));
}

#[test]
fn test_operations_rejected_after_game_over() {
    let config = EngineConfig {
        max_turns: 1,
        ..EngineConfig::default()
    };
    let mut engine = stocked(config, &curve());
    engine.start_game().unwrap();
    engine.end_turn().unwrap();
    assert!(engine.state().game_over);

    assert!(matches!(engine.end_turn(), Err(EngineError::WrongPhase { .. })));
    let card = engine.state().hand(P0)[0];
    assert!(matches!(
        engine.play_card(card, LEFT),
        Err(EngineError::IllegalPlay { reason: "the game is over", .. })
    ));
}

#[test]
fn test_board_leader_wins() {
    let config = EngineConfig {
        max_turns: 1,
        ..EngineConfig::default()
    };
    let mut engine = stocked(config, &[(1, 3), (1, 3), (1, 3), (1, 3)]);
    engine.start_game().unwrap();
    let card = engine.state().hand(P0)[0];
    engine.play_card(card, LEFT).unwrap();
    engine.end_turn().unwrap();

    assert_eq!(engine.result(), Some(GameResult::Winner(P0)));
    assert!(engine.result().unwrap().is_winner(P0));
}

#[test]
fn test_empty_board_is_a_draw() {
    let config = EngineConfig {
        max_turns: 1,
        ..EngineConfig::default()
    };
    let mut engine = stocked(config, &[]);
    engine.start_game().unwrap();
    engine.end_turn().unwrap();
    assert_eq!(engine.result(), Some(GameResult::Draw));
}

#[test]
fn test_turn_triggers_fire_each_turn() {
    let mut engine = stocked(EngineConfig::default(), &curve());
    engine.start_game().unwrap();

    let grow = |trigger| {
        AbilityDefinition::new(trigger, AbilityEffect::GainPower)
            .with_amount(AbilityAmount::constant(1))
            .with_target(AbilityTargetDefinition::new(TargetKind::SelfCard))
    };
    let def = CardDefinition::new("Sprout", 0, 0)
        .with_ability(grow(AbilityTrigger::EndTurn))
        .with_ability(grow(AbilityTrigger::StartTurn));
    let sprout = engine.add_card(Rc::new(def), P0, Zone::Hand(P0));
    engine.play_card(sprout, LEFT).unwrap();
    assert_eq!(engine.state().power_of(sprout), 0);

    engine.end_turn().unwrap();
    assert_eq!(engine.state().power_of(sprout), 2, "one end-of-turn and one start-of-turn trigger");

    engine.end_turn().unwrap();
    assert_eq!(engine.state().power_of(sprout), 4);
}

#[test]
fn test_performer_delay_only_adds_steps() {
    let mut engine = stocked(EngineConfig::default().with_performer_delay(3), &curve());
    engine.start_game().unwrap();
    assert_eq!(engine.state().phase, Phase::Action);
    assert_eq!(engine.state().hand(P1).len(), 4);
}

#[test]
fn test_driver_budget_reports_stall() {
    let config = EngineConfig {
        max_driver_steps: 5,
        ..EngineConfig::default()
    };
    let mut engine = stocked(config, &curve());
    assert!(matches!(engine.start_game(), Err(EngineError::Stalled(5))));
}
