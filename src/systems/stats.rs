//! Power, cost and keyword performers.

use tracing::debug;

use super::sourced_buff;
use crate::cards::{BuffKind, Capabilities};
use crate::core::action::{Action, ActionKind};
use crate::core::entity::EntityId;
use crate::engine::Engine;
use crate::pipeline::{ActionPipeline, Performed};

pub fn install(pipeline: &mut ActionPipeline<Engine>) {
    pipeline.attach_performer(ActionKind::GainPower, gain_power);
    pipeline.attach_performer(ActionKind::StealPower, steal_power);
    pipeline.attach_performer(ActionKind::SetPower, set_power);
    pipeline.attach_performer(ActionKind::IncreaseCost, increase_cost);
    pipeline.attach_performer(ActionKind::AddPowerToLocation, add_power_to_location);
    pipeline.attach_performer(ActionKind::AddKeyword, add_keyword);
}

fn buff_targets(engine: &mut Engine, action: &Action, kind: &BuffKind, amount: i64) {
    for &target in &action.targets {
        if !engine.state().has_capability(target, Capabilities::BUFF_OBTAINABLE) {
            debug!(target = %target, kind = kind.name(), "target cannot hold buffs");
            continue;
        }
        engine
            .state_mut()
            .apply_buff(target, sourced_buff(action, kind.clone(), amount));
    }
}

fn gain_power(engine: &mut Engine, action: &mut Action) -> Performed {
    buff_targets(engine, action, &BuffKind::AdditionalPower, action.value);
    Performed::Done
}

/// Each target loses `value` power and the owner gains it.
fn steal_power(engine: &mut Engine, action: &mut Action) -> Performed {
    let Some(owner) = action.owner else {
        return Performed::Done;
    };
    for &target in action.targets.iter().filter(|&&t| t != owner) {
        if !engine.state().has_capability(target, Capabilities::BUFF_OBTAINABLE) {
            continue;
        }
        let state = engine.state_mut();
        state.apply_buff(target, sourced_buff(action, BuffKind::AdditionalPower, -action.value));
        state.apply_buff(owner, sourced_buff(action, BuffKind::AdditionalPower, action.value));
    }
    Performed::Done
}

fn set_power(engine: &mut Engine, action: &mut Action) -> Performed {
    buff_targets(engine, action, &BuffKind::SetPower, action.value);
    Performed::Done
}

fn increase_cost(engine: &mut Engine, action: &mut Action) -> Performed {
    buff_targets(engine, action, &BuffKind::AdditionalCost, action.value);
    Performed::Done
}

/// Buff the location side each target sits on (or is).
fn add_power_to_location(engine: &mut Engine, action: &mut Action) -> Performed {
    let mut sides: Vec<EntityId> = Vec::new();
    for &target in &action.targets {
        let state = engine.state();
        let side = state
            .side_of(target)
            .and_then(|(position, player)| state.location_entity(position, player));
        match side {
            Some(side) if !sides.contains(&side) => sides.push(side),
            Some(_) => {}
            None => debug!(target = %target, "target is not on the board"),
        }
    }
    for side in sides {
        engine
            .state_mut()
            .apply_buff(side, sourced_buff(action, BuffKind::AdditionalPower, action.value));
    }
    Performed::Done
}

fn add_keyword(engine: &mut Engine, action: &mut Action) -> Performed {
    let keyword = action.amount.value.trim().to_string();
    if keyword.is_empty() {
        debug!(ability = ?action.ability, "keyword effect without a keyword");
        return Performed::Done;
    }
    let kind = match keyword.as_str() {
        "Indestructible" => BuffKind::Indestructible,
        "Unmovable" => BuffKind::Unmovable,
        _ => BuffKind::Keyword(keyword),
    };
    buff_targets(engine, action, &kind, 0);
    Performed::Done
}
