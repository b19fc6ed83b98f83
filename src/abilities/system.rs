//! Ability activation.
//!
//! `AbilitySystem` is the glue between card abilities and the pipeline:
//!
//! - **Setup** registers a card's abilities in declaration order, validating
//!   each; invalid ones stay registered but never fire. Chained
//!   (`AfterAbilityTriggered`) abilities subscribe to their predecessor here.
//! - **Reveal** fires `OnReveal` abilities, activates `Ongoing` ones and
//!   installs live listeners for the remaining on-board triggers.
//! - **Trigger** checks the trigger source and activation requirements, then
//!   queues the effect action as a reaction (legacy shape) or starts a
//!   program task (program shape).
//!
//! Every failure here is logged and skipped; one broken ability never stops
//! the flow it fired in.

use std::rc::Rc;

use tracing::{debug, error};

use super::ability::AbilityId;
use super::amount::AbilityAmount;
use super::definition::{
    AbilityDefinition, AbilityEffect, AbilityTargetDefinition, AbilityTrigger, AbilityTriggerDefinition,
    TargetKind, TargetRange,
};
use super::ongoing::OngoingController;
use crate::cards::CardDefinition;
use crate::core::action::{Action, ActionTags};
use crate::core::entity::EntityId;
use crate::engine::Engine;
use crate::pipeline::{ActionFilter, PipelineHost, Reaction, ReactionTiming};
use crate::snap::{compile_definition, validate_logged, ProgramTask};
use crate::targeting::is_requirement_met;
use crate::zones::Zone;

pub struct AbilitySystem;

impl AbilitySystem {
    /// Register every ability on `card` for `owner`, in declaration order.
    pub fn set_up_abilities(engine: &mut Engine, card: &CardDefinition, owner: EntityId) -> Vec<AbilityId> {
        card.abilities
            .iter()
            .map(|definition| Self::install(engine, Rc::new(definition.clone()), owner))
            .collect()
    }

    /// Register one ability. Chained and on-created abilities subscribe now.
    pub fn install(engine: &mut Engine, definition: Rc<AbilityDefinition>, owner: EntityId) -> AbilityId {
        let activatable = validate_logged(&definition);
        let program = compile_definition(&definition);
        let trigger = definition.trigger_kind();
        let id = engine.abilities_mut().register(owner, definition, program);

        if !activatable {
            if let Some(ability) = engine.abilities_mut().get_mut(id) {
                ability.activatable = false;
            }
            return id;
        }
        match trigger {
            AbilityTrigger::AfterAbilityTriggered => Self::subscribe_chain(engine, id),
            AbilityTrigger::OnCreated => Self::subscribe_listener(engine, id),
            _ => {}
        }
        id
    }

    /// Activate every ability `card` owns, as it hits the board.
    pub fn activate_on_reveal(engine: &mut Engine, card: EntityId, triggered: Option<&Action>) {
        let ids = engine.abilities().ids_of(card).to_vec();
        for id in ids {
            Self::activate(engine, id, triggered);
        }
    }

    /// Fire, start or arm one ability of a card that is now on the board.
    pub fn activate(engine: &mut Engine, id: AbilityId, triggered: Option<&Action>) {
        let turn = engine.state().turn;
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        if !ability.can_fire(turn) {
            return;
        }
        match ability.definition.trigger_kind() {
            AbilityTrigger::OnReveal => {
                Self::trigger_reaction(engine, id, None, triggered);
            }
            AbilityTrigger::Ongoing => OngoingController::activate(engine, id),
            trigger if trigger.listens_on_board() => Self::subscribe_listener(engine, id),
            _ => {}
        }
    }

    /// Validate and fire one activation of `id`.
    ///
    /// Returns false if the trigger source or an activation requirement
    /// rejected it. `targets` overrides target resolution for legacy abilities.
    pub fn trigger_reaction(
        engine: &mut Engine,
        id: AbilityId,
        targets: Option<Vec<EntityId>>,
        triggered: Option<&Action>,
    ) -> bool {
        let Some(ability) = engine.abilities().get(id) else {
            return false;
        };
        if !ability.activatable {
            debug!(ability = %id, "trigger ignored: ability is not activatable");
            return false;
        }
        let owner = ability.owner;
        let definition = Rc::clone(&ability.definition);
        let program = Rc::clone(&ability.program);

        if let Some(triggered) = triggered {
            let source = definition.trigger_source();
            if !source.is_empty() {
                let valid = engine.resolve_targets(source, owner, Some(triggered));
                if !triggered.targets.iter().any(|t| valid.contains(t)) {
                    debug!(ability = %id, owner = %owner, "trigger abandoned: source does not match");
                    return false;
                }
            }
        }
        if !Self::requirements_met(engine, &definition, owner, triggered) {
            debug!(ability = %id, owner = %owner, "trigger abandoned: activation requirements unmet");
            return false;
        }

        if definition.is_program() {
            engine.abilities_mut().context_mut(owner).ability_used();
            engine.spawn_program(ProgramTask::new(id, owner, program, triggered.cloned()));
        } else if let Some(effect) = definition.effect {
            let amount = definition.amount.clone().unwrap_or_default();
            let resolved = match targets {
                Some(targets) => targets,
                None => engine.resolve_targets(&definition.target_definition, owner, triggered),
            };
            let awaits_next_play = resolved.is_empty()
                && effect.targets_played_card()
                && definition.targets_kind(&TargetKind::NextPlayedCard);

            if let Some(action) = Self::build_effect_action(
                engine,
                id,
                owner,
                effect,
                &amount,
                &definition.target_definition,
                Some(resolved),
                triggered,
            ) {
                engine.dispatch(action);
            }
            if awaits_next_play {
                Self::install_next_played(engine, id);
            }
        }

        if engine.abilities().get(id).is_some_and(|a| a.exhaust) {
            Self::exhaust(engine, id);
        }
        true
    }

    /// Build the action an effect produces, `None` if nothing would happen.
    ///
    /// Draw and GainMaxEnergy act on the owner's player and skip target
    /// resolution; every other effect needs at least one target.
    #[allow(clippy::too_many_arguments)]
    pub fn build_effect_action(
        engine: &mut Engine,
        ability: AbilityId,
        owner: EntityId,
        effect: AbilityEffect,
        amount: &AbilityAmount,
        target_definition: &[AbilityTargetDefinition],
        targets: Option<Vec<EntityId>>,
        triggered: Option<&Action>,
    ) -> Option<Action> {
        let Some(kind) = effect.action_kind() else {
            error!(ability = %ability, ?effect, "effect has no action mapping");
            return None;
        };
        let value = engine.amount_value(amount, owner, triggered);

        if effect.is_player_scoped() {
            let player = engine.state().owner_of(owner)?;
            let mut action = Action::new(kind)
                .with_owner(owner)
                .with_player(player)
                .with_value(value)
                .with_tags(ActionTags::ABILITY_EFFECT);
            action.ability = Some(ability);
            action.amount = amount.clone();
            return Some(action);
        }

        let targets = match targets {
            Some(targets) => targets,
            None => engine.resolve_targets(target_definition, owner, triggered),
        };
        if targets.is_empty() {
            debug!(ability = %ability, ?effect, "no targets; effect skipped");
            return None;
        }
        Some(Action::effect(kind, owner, ability, targets, amount.clone(), value))
    }

    /// Every activation requirement holds against its requirement targets.
    ///
    /// Without declared requirement targets the owner is the candidate.
    pub(crate) fn requirements_met(
        engine: &mut Engine,
        definition: &AbilityDefinition,
        owner: EntityId,
        triggered: Option<&Action>,
    ) -> bool {
        if definition.activation_requirements.is_empty() {
            return true;
        }
        let candidates = match &definition.activation_requirement_targets {
            Some(target) => engine.resolve_targets(std::slice::from_ref(target), owner, triggered),
            None => vec![owner],
        };
        definition
            .activation_requirements
            .iter()
            .all(|req| is_requirement_met(engine.state(), req, &candidates))
    }

    fn on_trigger(engine: &mut Engine, id: AbilityId, action: &Action) {
        let turn = engine.state().turn;
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        if ability.expires_after_turn.is_some_and(|t| turn > t) {
            debug!(ability = %id, "temporary ability expired");
            Self::release(engine, id);
            engine.abilities_mut().unregister(id);
            return;
        }
        if !ability.can_fire(turn) {
            return;
        }
        let owner = ability.owner;
        let trigger = ability.definition.trigger_kind();
        if !trigger.accepts(action, owner, engine.state()) {
            return;
        }
        Self::trigger_reaction(engine, id, None, Some(action));

        let departed = matches!(trigger, AbilityTrigger::Destroyed | AbilityTrigger::Banished)
            && !engine.state().zones.zone_of(owner).is_some_and(Zone::is_board);
        if departed {
            Self::release(engine, id);
        }
    }

    /// Install the live listener for `id`'s trigger. No-op if it already has one.
    fn subscribe_listener(engine: &mut Engine, id: AbilityId) {
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        if ability.subscription().is_some() {
            return;
        }
        let Some((filter, timing)) = ability.definition.trigger_kind().listener() else {
            return;
        };
        let Some(player) = engine.state().owner_of(ability.owner) else {
            return;
        };
        let handler: Reaction<Engine> = Rc::new(move |engine: &mut Engine, action: &Action| {
            Self::on_trigger(engine, id, action);
        });
        let subscription = engine
            .pipeline_mut()
            .subscribe_owned(filter, timing, player, handler);
        if let Some(ability) = engine.abilities_mut().get_mut(id) {
            ability.hold_subscription(subscription);
        }
    }

    /// Fire `id` right after the previous ability on its card produces an effect.
    fn subscribe_chain(engine: &mut Engine, id: AbilityId) {
        let Some(previous) = engine.abilities().previous(id) else {
            let owner = engine.abilities().get(id).map(|a| a.owner);
            error!(ability = %id, ?owner, "chained ability has no predecessor");
            if let Some(ability) = engine.abilities_mut().get_mut(id) {
                ability.activatable = false;
            }
            return;
        };
        let Some(player) = engine
            .abilities()
            .get(id)
            .and_then(|a| engine.state().owner_of(a.owner))
        else {
            return;
        };
        let handler: Reaction<Engine> = Rc::new(move |engine: &mut Engine, action: &Action| {
            if action.ability == Some(previous) {
                Self::on_trigger(engine, id, action);
            }
        });
        let subscription = engine.pipeline_mut().subscribe_owned(
            ActionFilter::Tags(ActionTags::ABILITY_EFFECT),
            ReactionTiming::Post,
            player,
            handler,
        );
        if let Some(ability) = engine.abilities_mut().get_mut(id) {
            ability.hold_subscription(subscription);
        }
    }

    /// Install a one-shot copy of `id` that fires on the owner's next play this turn.
    fn install_next_played(engine: &mut Engine, id: AbilityId) {
        let Some(ability) = engine.abilities().get(id) else {
            return;
        };
        let owner = ability.owner;
        let mut definition = (*ability.definition).clone();
        definition.trigger_definition = Some(
            AbilityTriggerDefinition::new(AbilityTrigger::BeforeCardPlayed)
                .with_source(AbilityTargetDefinition::new(TargetKind::AllPlayerCards)),
        );
        definition.target_definition =
            vec![AbilityTargetDefinition::new(TargetKind::TriggeredActionTargets).with_range(TargetRange::First)];
        definition.exhaust = true;

        let turn = engine.state().turn;
        let clone = Self::install(engine, Rc::new(definition), owner);
        if let Some(ability) = engine.abilities_mut().get_mut(clone) {
            ability.expires_after_turn = Some(turn);
        }
        Self::subscribe_listener(engine, clone);
        debug!(ability = %id, clone = %clone, "waiting for the next played card");
    }

    /// Unsubscribe after a successful single-use trigger.
    fn exhaust(engine: &mut Engine, id: AbilityId) {
        Self::release(engine, id);
        let temporary = match engine.abilities_mut().get_mut(id) {
            Some(ability) => {
                ability.spent = true;
                ability.expires_after_turn.is_some()
            }
            None => return,
        };
        if temporary {
            engine.abilities_mut().unregister(id);
        }
        debug!(ability = %id, "ability exhausted");
    }

    /// Drop `id`'s live listener, if any.
    pub fn release(engine: &mut Engine, id: AbilityId) {
        let subscription = engine
            .abilities_mut()
            .get_mut(id)
            .and_then(|a| a.release_subscription());
        if let Some(subscription) = subscription {
            engine.pipeline_mut().unsubscribe(subscription);
        }
    }

    /// Tear down a card leaving the board.
    ///
    /// Ongoing abilities stop and board listeners are released; they are
    /// armed again if the card is played again. With a `departure` the card
    /// is gone for good: chained and on-created listeners go too, and
    /// temporary abilities are unregistered. The listener for the departure
    /// trigger itself stays until it has seen the action.
    pub fn tear_down(engine: &mut Engine, card: EntityId, departure: Option<AbilityTrigger>) {
        for id in engine.abilities().ongoing_of(card) {
            OngoingController::deactivate(engine, id);
        }
        let ids = engine.abilities().ids_of(card).to_vec();
        for id in ids {
            let Some(ability) = engine.abilities().get(id) else {
                continue;
            };
            let trigger = ability.definition.trigger_kind();
            let temporary = ability.expires_after_turn.is_some();
            if departure == Some(trigger) {
                continue;
            }
            if trigger.listens_on_board() || departure.is_some() {
                Self::release(engine, id);
            }
            if temporary && departure.is_some() {
                engine.abilities_mut().unregister(id);
            }
        }
    }
}
