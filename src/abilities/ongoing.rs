//! Ongoing abilities.
//!
//! An ongoing ability keeps its effect applied to a target set that is
//! re-derived whenever something it depends on may have changed. Rather than
//! replaying the effect, each update diffs the fresh resolution against
//! `current_targets`:
//!
//! - entities that left the set lose this ability's buff;
//! - entities that joined get a fresh effect action;
//! - with a `ForEachTarget` amount, entities still in the set whose buff no
//!   longer matches the recomputed amount have it replaced.
//!
//! At any quiescent point every entity in `current_targets` carries exactly
//! one buff sourced from the ability, and nothing else does. Two effects
//! buff something other than what they target: `AddPowerToLocation` buffs
//! the location side, so its targets are tracked as sides; `StealPower`
//! also buffs the owner, once per target, and that share goes whenever a
//! target's buff does.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::ability::AbilityId;
use super::definition::{
    AbilityDefinition, AbilityEffect, AbilityTargetDefinition, RequirementType, TargetKind, TargetSort,
};
use super::system::AbilitySystem;
use crate::cards::Stat;
use crate::core::action::{Action, ActionKind, ActionTags};
use crate::core::entity::EntityId;
use crate::engine::Engine;
use crate::pipeline::{ActionFilter, PipelineHost, Reaction, ReactionTiming, SubscriptionId};

/// Actions that can change an ongoing ability's targets or amount.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenedSet {
    pub tags: ActionTags,
    pub kinds: SmallVec<[ActionKind; 2]>,
}

impl ListenedSet {
    /// What a single target definition depends on.
    #[must_use]
    pub fn for_target(def: &AbilityTargetDefinition) -> Self {
        use TargetKind as K;

        let board = ActionTags::LOCATION_CARDS_UPDATED;
        let hand = ActionTags::HAND_UPDATED;
        let deck = ActionTags::DECK_UPDATED;

        let mut set = Self::default();
        set.tags = match def.target {
            K::Hand | K::EnemyHand | K::PlayerHandContainer => hand,
            K::Deck | K::EnemyDeck | K::PlayerDeckContainer => deck,
            K::PlayerDirectLocationCards
            | K::EnemyDirectLocationCards
            | K::AllDirectLocationCards
            | K::AllPlayerPlayedCards
            | K::AllEnemyPlayedCards
            | K::AllPlayedCards => board,
            K::AllPlayerCards | K::AllEnemyCards => board | hand | deck | ActionTags::CARD_CREATED,
            K::PlayerDirectLocation
            | K::AllPlayerLocation
            | K::EnemyDirectLocation
            | K::AllEnemyLocation
            | K::DirectLocation
            | K::AllLocation => board | ActionTags::POWER_CHANGED,
            K::NextPlayedCard => {
                set.kinds.push(ActionKind::RevealCard);
                ActionTags::empty()
            }
            K::SelfCard
            | K::Player
            | K::EnemyPlayer
            | K::TriggeredActionTargets
            | K::TriggeredActionSource
            | K::CreatedCard
            | K::Chosen(_) => ActionTags::empty(),
        };

        if def.target_sort != TargetSort::None || !def.target_requirement.is_empty() {
            set.tags |= ActionTags::POWER_CHANGED | ActionTags::COST_CHANGED;
        }
        if def
            .target_requirement
            .iter()
            .any(|r| matches!(r.req_type, RequirementType::HasKeyword | RequirementType::BuffPresent))
        {
            set.add_kind(ActionKind::AddKeyword);
        }
        set
    }

    /// Union over an ability's target specs, its `ForEachTarget` amount spec
    /// and its activation requirement targets.
    #[must_use]
    pub fn for_definition(def: &AbilityDefinition) -> Self {
        let mut set = Self::default();
        for target in &def.target_definition {
            set.merge(&Self::for_target(target));
        }
        if let Some(for_each) = def.amount.as_ref().and_then(|a| a.for_each()) {
            set.merge(&Self::for_target(&for_each.target));
        }
        if def.effect == Some(AbilityEffect::AddPowerToLocation) {
            set.tags |= ActionTags::LOCATION_CARDS_UPDATED;
        }
        if !def.activation_requirements.is_empty() {
            if let Some(target) = &def.activation_requirement_targets {
                set.merge(&Self::for_target(target));
            }
            set.tags |= ActionTags::POWER_CHANGED | ActionTags::COST_CHANGED;
            if def
                .activation_requirements
                .iter()
                .any(|r| r.req_type == RequirementType::CurrentTurn)
            {
                set.add_kind(ActionKind::BeginPhase);
            }
        }
        set
    }

    fn add_kind(&mut self, kind: ActionKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub fn merge(&mut self, other: &ListenedSet) {
        self.tags |= other.tags;
        for &kind in &other.kinds {
            self.add_kind(kind);
        }
    }

    #[must_use]
    pub fn matches(&self, action: &Action) -> bool {
        action.tags().intersects(self.tags) || self.kinds.contains(&action.kind)
    }
}

/// Runtime state of an active ongoing ability.
#[derive(Clone, Debug)]
pub struct OngoingAbility {
    pub ability: AbilityId,
    pub owner: EntityId,
    pub listened: ListenedSet,
    pub current_targets: Vec<EntityId>,
    pub subscription: Option<SubscriptionId>,
}

/// Activation, re-evaluation and teardown of ongoing abilities.
pub struct OngoingController;

impl OngoingController {
    /// Start listening and apply the effect to the initial target set.
    pub fn activate(engine: &mut Engine, id: AbilityId) {
        if engine.abilities().ongoing(id).is_some() {
            return;
        }
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        let owner = ability.owner;
        let listened = ListenedSet::for_definition(&ability.definition);
        let Some(player) = engine.state().owner_of(owner) else {
            return;
        };

        let handler: Reaction<Engine> = Rc::new(move |engine: &mut Engine, action: &Action| {
            Self::on_action(engine, id, action);
        });
        let subscription = engine
            .pipeline_mut()
            .subscribe_owned(ActionFilter::Any, ReactionTiming::Post, player, handler);

        let targets = Self::desired_targets(engine, id);
        debug!(ability = %id, owner = %owner, targets = targets.len(), "ongoing activated");
        engine.abilities_mut().add_ongoing(OngoingAbility {
            ability: id,
            owner,
            listened,
            current_targets: targets.clone(),
            subscription: Some(subscription),
        });
        Self::apply(engine, id, targets);
    }

    fn on_action(engine: &mut Engine, id: AbilityId, action: &Action) {
        let listening = engine
            .abilities()
            .ongoing(id)
            .is_some_and(|o| o.listened.matches(action));
        if listening {
            Self::update_targets(engine, id);
        }
    }

    /// Re-derive the target set and reconcile buffs with it.
    pub fn update_targets(engine: &mut Engine, id: AbilityId) {
        let Some(ongoing) = engine.abilities().ongoing(id) else {
            return;
        };
        let current = ongoing.current_targets.clone();
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        let owner = ability.owner;
        let definition = Rc::clone(&ability.definition);

        let fresh = Self::desired_targets(engine, id);
        let mut unaffected: Vec<EntityId> = fresh.iter().copied().filter(|e| !current.contains(e)).collect();
        let affected: Vec<EntityId> = current.iter().copied().filter(|e| !fresh.contains(e)).collect();

        if let Some(amount) = definition.amount.as_ref().filter(|a| a.for_each().is_some()) {
            let value = engine.amount_value(amount, owner, None);
            let expected = if definition.effect == Some(AbilityEffect::StealPower) {
                -value
            } else {
                value
            };
            for &entity in fresh.iter().filter(|e| current.contains(e)) {
                match engine.state().ability_buff_amount(entity, id) {
                    Some(existing) if existing != expected => {
                        trace!(ability = %id, entity = %entity, existing, expected, "re-amount");
                        Self::remove_buff(engine, id, owner, entity, true);
                        unaffected.push(entity);
                    }
                    _ => {}
                }
            }
        }

        for &entity in &affected {
            Self::remove_buff(engine, id, owner, entity, false);
        }
        if let Some(ongoing) = engine.abilities_mut().ongoing_mut(id) {
            ongoing.current_targets = fresh;
        }
        if !affected.is_empty() || !unaffected.is_empty() {
            debug!(ability = %id, removed = affected.len(), added = unaffected.len(), "ongoing targets updated");
        }
        Self::apply(engine, id, unaffected);
    }

    /// Stop listening and strip every buff the ability granted.
    pub fn deactivate(engine: &mut Engine, id: AbilityId) {
        let Some(ongoing) = engine.abilities_mut().remove_ongoing(id) else {
            return;
        };
        if let Some(subscription) = ongoing.subscription {
            engine.pipeline_mut().unsubscribe(subscription);
        }
        for &entity in &ongoing.current_targets {
            Self::remove_buff(engine, id, ongoing.owner, entity, false);
        }
        debug!(ability = %id, released = ongoing.current_targets.len(), "ongoing deactivated");
    }

    /// Resolution of the target spec, deduplicated; empty while the
    /// activation requirements are unmet. Location effects resolve to the
    /// sides their targets sit on.
    fn desired_targets(engine: &mut Engine, id: AbilityId) -> Vec<EntityId> {
        let Some(ability) = engine.abilities().get(id) else {
            return Vec::new();
        };
        let owner = ability.owner;
        let definition = Rc::clone(&ability.definition);
        if !AbilitySystem::requirements_met(engine, &definition, owner, None) {
            return Vec::new();
        }
        let resolved = engine.resolve_targets(&definition.target_definition, owner, None);
        let by_side = definition.effect == Some(AbilityEffect::AddPowerToLocation);
        let mut targets = Vec::with_capacity(resolved.len());
        for entity in resolved {
            let holder = if by_side {
                let state = engine.state();
                match state
                    .side_of(entity)
                    .and_then(|(position, player)| state.location_entity(position, player))
                {
                    Some(side) => side,
                    None => continue,
                }
            } else {
                entity
            };
            if !targets.contains(&holder) {
                targets.push(holder);
            }
        }
        targets
    }

    fn apply(engine: &mut Engine, id: AbilityId, targets: Vec<EntityId>) {
        if targets.is_empty() {
            return;
        }
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        let owner = ability.owner;
        let definition = Rc::clone(&ability.definition);
        let Some(effect) = definition.effect else {
            warn!(ability = %id, "ongoing ability without a top-level effect");
            return;
        };
        let amount = definition.amount.clone().unwrap_or_default();
        if let Some(action) = AbilitySystem::build_effect_action(
            engine,
            id,
            owner,
            effect,
            &amount,
            &definition.target_definition,
            Some(targets),
            None,
        ) {
            engine.dispatch(action);
        }
    }

    /// Remove `id`'s buff from `entity`, and the owner's share of a steal.
    /// Unless replacing, announce the stat change.
    fn remove_buff(engine: &mut Engine, id: AbilityId, owner: EntityId, entity: EntityId, replacing: bool) {
        let steals = engine
            .abilities()
            .get(id)
            .is_some_and(|a| a.definition.effect == Some(AbilityEffect::StealPower));
        if steals {
            if entity == owner {
                return;
            }
            Self::remove_one(engine, id, owner, owner, replacing);
        }
        Self::remove_one(engine, id, owner, entity, replacing);
    }

    fn remove_one(engine: &mut Engine, id: AbilityId, owner: EntityId, holder: EntityId, replacing: bool) {
        let Some((_, stat)) = engine.state_mut().remove_ability_buff(holder, id) else {
            return;
        };
        if replacing {
            return;
        }
        let tags = match stat {
            Some(Stat::Power) => ActionTags::POWER_CHANGED,
            Some(Stat::Cost) => ActionTags::COST_CHANGED,
            None => return,
        };
        let notice = Action::new(ActionKind::UpdateStat)
            .with_owner(owner)
            .with_target(holder)
            .with_tags(tags);
        engine.dispatch(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityAmount, AbilityEffect, AbilityTrigger};

    #[test]
    fn test_enemy_cards_listen_to_every_zone() {
        let set = ListenedSet::for_target(&AbilityTargetDefinition::new(TargetKind::AllEnemyCards));
        let destroy = Action::new(ActionKind::DestroyCard);
        let draw = Action::new(ActionKind::DrawCard);
        let power = Action::new(ActionKind::GainPower);
        assert!(set.matches(&destroy));
        assert!(set.matches(&draw));
        assert!(!set.matches(&power));
    }

    #[test]
    fn test_self_target_listens_to_nothing() {
        let set = ListenedSet::for_target(&AbilityTargetDefinition::new(TargetKind::SelfCard));
        assert!(set.tags.is_empty());
        assert!(set.kinds.is_empty());
    }

    #[test]
    fn test_for_each_amount_adds_nested_dependencies() {
        let def = AbilityDefinition::new(AbilityTrigger::Ongoing, AbilityEffect::GainPower)
            .with_target(AbilityTargetDefinition::new(TargetKind::SelfCard))
            .with_amount(AbilityAmount::for_each_target(
                AbilityTargetDefinition::new(TargetKind::Hand),
                1,
            ));
        let set = ListenedSet::for_definition(&def);
        assert!(set.tags.contains(ActionTags::HAND_UPDATED));
        assert!(set.matches(&Action::new(ActionKind::DrawCard)));
    }

    #[test]
    fn test_next_played_listens_by_kind() {
        let set = ListenedSet::for_target(&AbilityTargetDefinition::new(TargetKind::NextPlayedCard));
        assert!(set.matches(&Action::new(ActionKind::RevealCard)));
        assert!(!set.matches(&Action::new(ActionKind::UpdateStat)));
    }

    #[test]
    fn test_sorted_targets_listen_to_stat_changes() {
        let def = AbilityTargetDefinition::new(TargetKind::SelfCard).with_sort(TargetSort::Power);
        let set = ListenedSet::for_target(&def);
        let notice = Action::new(ActionKind::UpdateStat).with_tags(ActionTags::POWER_CHANGED);
        assert!(set.matches(&notice));
    }
}
