//! Requirement evaluation over resolved candidates.
//!
//! Each candidate yields a typed value for the requirement's type. Boolean
//! values are matched against the requirement's boolean directly; keyword
//! requirements are a keyword lookup; everything else goes through the
//! comparator. Numeric comparators parse both payloads as integers, and
//! string comparators compare or search the raw payloads.

use tracing::warn;

use crate::abilities::{
    AbilityAmount, AbilityRequirement, Comparator, RequirementCondition, RequirementType,
};
use crate::cards::ContainerKind;
use crate::core::config::LocationPosition;
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;
use crate::core::state::{Entity, GameState};

/// Check `requirement` against `candidates`.
///
/// `All` holds when every candidate is satisfied (vacuously true for none);
/// `Any` needs at least one.
#[must_use]
pub fn is_requirement_met(
    state: &GameState,
    requirement: &AbilityRequirement,
    candidates: &[EntityId],
) -> bool {
    let mut satisfied = candidates
        .iter()
        .map(|&candidate| is_candidate_satisfied(state, requirement, candidate));
    match requirement.req_condition {
        RequirementCondition::All => satisfied.all(|ok| ok),
        RequirementCondition::Any => satisfied.any(|ok| ok),
    }
}

fn is_candidate_satisfied(state: &GameState, requirement: &AbilityRequirement, candidate: EntityId) -> bool {
    if requirement.req_type == RequirementType::HasKeyword {
        return state
            .card(candidate)
            .is_some_and(|card| card.has_keyword(&requirement.req_amount.value));
    }

    let Some(value) = candidate_value(state, candidate, requirement.req_type) else {
        return false;
    };

    if value.is_boolean() {
        return value.as_bool().is_some() && value.as_bool() == requirement.req_amount.as_bool();
    }

    compare(requirement.req_comparator, &value, &requirement.req_amount)
}

/// Value of `req_type` for one entity, or `None` if the entity has no such value.
#[must_use]
pub fn candidate_value(state: &GameState, entity: EntityId, req_type: RequirementType) -> Option<AbilityAmount> {
    use RequirementType as R;

    let owner = state.owner_of(entity);
    let side = state.side_of(entity);
    let turn = i64::from(state.turn);

    let side_count = |s: Option<(LocationPosition, PlayerId)>| {
        s.map(|(pos, player)| state.cards_at(pos, player).len() as i64)
    };
    let side_full = |s: Option<(LocationPosition, PlayerId)>| {
        s.is_some_and(|(pos, player)| state.is_location_full(pos, player))
    };
    let power_difference = |s: Option<(LocationPosition, PlayerId)>| {
        s.map(|(pos, player)| state.location_power(pos, player) - state.location_power(pos, player.opponent()))
    };

    let value = match (state.entity(entity)?, req_type) {
        (_, R::None) => AbilityAmount::constant(0),
        (_, R::CurrentTurn) => AbilityAmount::constant(turn),
        (_, R::CurrentMaxEnergy) => AbilityAmount::constant(state.energy[owner?].max),

        (Entity::Card(card), R::Power) => AbilityAmount::constant(card.power()),
        (Entity::Card(card), R::Cost) => AbilityAmount::constant(card.base_cost()),
        (Entity::Card(card), R::CurrentCost) => AbilityAmount::constant(card.cost()),
        (Entity::Card(card), R::CardName) => AbilityAmount::text(card.name()),
        (Entity::Card(card), R::IsCreated) => AbilityAmount::boolean(card.created),
        (Entity::Card(card), R::BuffPresent) => AbilityAmount::text(card.buffs.names()),

        (Entity::Location(_), R::Power) => AbilityAmount::constant(state.power_of(entity)),
        (Entity::Location(location), R::BuffPresent) => AbilityAmount::text(location.buffs.names()),

        (Entity::Card(_) | Entity::Location(_), R::NumberOfCards) => AbilityAmount::constant(side_count(side)?),
        (Entity::Card(_) | Entity::Location(_), R::LocationFull) => AbilityAmount::boolean(side_full(side)),
        (Entity::Card(_) | Entity::Location(_), R::LocationOccupied) => {
            AbilityAmount::boolean(side_count(side).is_some_and(|n| n > 0))
        }
        (Entity::Card(_) | Entity::Location(_), R::LocationPowerDifference) => {
            AbilityAmount::constant(power_difference(side)?)
        }

        (Entity::Player(player), R::NumberOfCards) => AbilityAmount::constant(state.hand(*player).len() as i64),
        (Entity::Container(container), R::NumberOfCards) => {
            let cards = match container.kind {
                ContainerKind::Hand => state.hand(container.player),
                ContainerKind::Deck => state.deck(container.player),
            };
            AbilityAmount::constant(cards.len() as i64)
        }

        _ => return None,
    };
    Some(value)
}

fn compare(comparator: Comparator, value: &AbilityAmount, target: &AbilityAmount) -> bool {
    match comparator {
        Comparator::None => true,
        Comparator::Equal => value.value == target.value,
        Comparator::NotEqual => value.value != target.value,
        Comparator::Contains => value.value.contains(target.value.as_str()),
        Comparator::DoesNotContain => !value.value.contains(target.value.as_str()),
        numeric => {
            let (Some(lhs), Some(rhs)) = (value.as_int(), target.as_int()) else {
                warn!(value = %value.value, target = %target.value, ?numeric, "non-numeric comparison");
                return false;
            };
            match numeric {
                Comparator::Greater => lhs > rhs,
                Comparator::Less => lhs < rhs,
                Comparator::GreaterOrEqual => lhs >= rhs,
                Comparator::LessOrEqual => lhs <= rhs,
                _ => false,
            }
        }
    }
}
