//! Phases, energy and the end of the game.
//!
//! Phases chain through system subscribers: every `EndPhase` queues the
//! `BeginPhase` that follows it, and every `BeginPhase` other than `Action`
//! queues its own `EndPhase`. The Action phase is where players play cards;
//! it ends when `Engine::end_turn` submits its `EndPhase`.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::core::action::{Action, ActionKind};
use crate::core::player::PlayerId;
use crate::core::state::{GameState, Phase};
use crate::engine::Engine;
use crate::pipeline::{ActionFilter, ActionPipeline, Performed, PipelineHost, ReactionTiming};
use crate::zones::Zone;

pub fn install(pipeline: &mut ActionPipeline<Engine>) {
    pipeline.attach_performer(ActionKind::BeginPhase, begin_phase);
    pipeline.attach_performer(ActionKind::EndPhase, end_phase);
    pipeline.attach_performer(ActionKind::GainMaxEnergy, gain_max_energy);
    pipeline.attach_performer(ActionKind::RefillEnergy, refill_energy);

    pipeline.subscribe(
        ActionFilter::Kind(ActionKind::EndPhase),
        ReactionTiming::Post,
        |engine: &mut Engine, action: &Action| {
            let Some(phase) = action.phase else {
                return;
            };
            if !engine.state().game_over {
                engine.pipeline_mut().add_reaction(Action::begin_phase(phase.next()));
            }
        },
    );
    pipeline.subscribe(
        ActionFilter::Kind(ActionKind::BeginPhase),
        ReactionTiming::Post,
        |engine: &mut Engine, action: &Action| match action.phase {
            Some(Phase::Action) | None => {}
            Some(phase) => engine.pipeline_mut().add_reaction(Action::end_phase(phase)),
        },
    );
    pipeline.subscribe(
        ActionFilter::Kind(ActionKind::RefillEnergy),
        ReactionTiming::Post,
        |engine: &mut Engine, _: &Action| {
            for player in PlayerId::both() {
                engine.pipeline_mut().add_reaction(Action::draw(player, 1));
            }
        },
    );
}

fn begin_phase(engine: &mut Engine, action: &mut Action) -> Performed {
    let Some(phase) = action.phase else {
        return Performed::Done;
    };
    engine.state_mut().phase = phase;
    match phase {
        Phase::Start => {
            let starting_hand = engine.config().starting_hand as i64;
            let state = engine.state_mut();
            for player in PlayerId::both() {
                let GameState { zones, rng, .. } = &mut *state;
                zones.shuffle(Zone::Deck(player), rng);
            }
            for player in PlayerId::both() {
                engine
                    .pipeline_mut()
                    .add_reaction(Action::draw(player, starting_hand));
            }
        }
        Phase::Preparation => {
            let per_turn = engine.config().energy_per_turn;
            let state = engine.state_mut();
            state.turn += 1;
            for (_, energy) in state.energy.iter_mut() {
                energy.max += per_turn;
            }
            state.priority_player = match leader(state) {
                Some(player) => player,
                None => PlayerId(state.rng.index(2) as u8),
            };
            debug!(turn = state.turn, priority = %state.priority_player, "turn started");
            engine
                .pipeline_mut()
                .add_reaction(Action::new(ActionKind::RefillEnergy));
        }
        Phase::Action | Phase::Reveal | Phase::End => {}
    }
    Performed::Done
}

fn end_phase(engine: &mut Engine, action: &mut Action) -> Performed {
    if action.phase != Some(Phase::End) {
        return Performed::Done;
    }
    let max_turns = engine.config().max_turns;
    let state = engine.state_mut();
    if state.turn >= max_turns {
        state.game_over = true;
        info!(turn = state.turn, winner = ?leader(state), "game over");
    }
    Performed::Done
}

fn gain_max_energy(engine: &mut Engine, action: &mut Action) -> Performed {
    if let Some(player) = action.player {
        engine.state_mut().energy.get_mut(player).max += action.value;
    }
    Performed::Done
}

fn refill_energy(engine: &mut Engine, _: &mut Action) -> Performed {
    for (_, energy) in engine.state_mut().energy.iter_mut() {
        energy.current = energy.max;
    }
    Performed::Done
}

/// Player ahead on the board: more locations won, then more total power.
///
/// A location is won by the side with strictly more power there.
#[must_use]
pub fn leader(state: &GameState) -> Option<PlayerId> {
    let p0 = PlayerId(0);
    let p1 = p0.opponent();
    let mut won = [0u8; 2];
    let mut power = [0i64; 2];
    for position in state.positions() {
        let ours = state.location_power(position, p0);
        let theirs = state.location_power(position, p1);
        power[0] += ours;
        power[1] += theirs;
        match ours.cmp(&theirs) {
            Ordering::Greater => won[0] += 1,
            Ordering::Less => won[1] += 1,
            Ordering::Equal => {}
        }
    }
    match won[0].cmp(&won[1]).then(power[0].cmp(&power[1])) {
        Ordering::Greater => Some(p0),
        Ordering::Less => Some(p1),
        Ordering::Equal => None,
    }
}
