//! The engine: one match's state plus everything that acts on it.
//!
//! `Engine` owns the game state, the action pipeline, the ability runtime,
//! pending choices, the card registry and the stack of running ability
//! programs. It is the pipeline's host, so every performer and subscriber
//! receives `&mut Engine`.
//!
//! ## Driving
//!
//! Nothing runs on its own. `step` advances the flow in progress by one
//! frame transition; when no flow is in progress it advances the newest
//! running program instead. `run_until_idle` steps until neither has work
//! left, or until the only remaining work waits on a choice.
//!
//! ```
//! use std::rc::Rc;
//! use snap_engine::cards::{CardDefinition, CardRegistry};
//! use snap_engine::core::{EngineConfig, LocationPosition, Phase, PlayerId};
//! use snap_engine::engine::Engine;
//! use snap_engine::zones::Zone;
//!
//! let mut engine = Engine::new(EngineConfig::default(), CardRegistry::new()).unwrap();
//! let scout = Rc::new(CardDefinition::new("Scout", 1, 2));
//! let p0 = PlayerId::new(0);
//! for _ in 0..5 {
//!     engine.add_card(Rc::clone(&scout), p0, Zone::Deck(p0));
//! }
//!
//! engine.start_game().unwrap();
//! assert_eq!(engine.state().phase, Phase::Action);
//!
//! let card = engine.state().hand(p0)[0];
//! engine.play_card(card, LocationPosition::new(0)).unwrap();
//! assert_eq!(engine.state().location_power(LocationPosition::new(0), p0), 2);
//! ```

use std::rc::Rc;

use tracing::{debug, trace};

use crate::abilities::{AbilityAmount, AbilityRequirement, AbilityRuntime, AbilitySystem, AbilityTargetDefinition};
use crate::cards::{CardDefinition, CardRegistry};
use crate::core::action::Action;
use crate::core::config::{EngineConfig, LocationPosition};
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;
use crate::core::state::{GameState, Phase};
use crate::error::EngineError;
use crate::pipeline::{ActionPipeline, PipelineHost, Step, SubmissionId};
use crate::snap::{AbilityChoiceDefinition, Choice, ChoiceBroker, ChoiceId, Opened, ProgramTask, TaskStatus};
use crate::systems;
use crate::targeting::{is_requirement_met, TargetQuery, TargetResolver};
use crate::zones::{Zone, ZonePosition};

/// Result of a finished match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
}

impl GameResult {
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        matches!(self, GameResult::Winner(p) if *p == player)
    }
}

/// Outcome of one `Engine::step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStep {
    /// No flow and no runnable program.
    Idle,
    Advanced,
    /// A performer is suspended.
    Waiting,
    /// The newest program waits on this choice.
    AwaitingChoice(ChoiceId),
}

#[derive(Debug)]
pub struct Engine {
    state: GameState,
    pipeline: ActionPipeline<Engine>,
    abilities: AbilityRuntime,
    choices: ChoiceBroker,
    cards: CardRegistry,
    config: EngineConfig,
    /// Running programs; the last one runs first.
    programs: Vec<ProgramTask>,
}

impl PipelineHost for Engine {
    fn pipeline(&self) -> &ActionPipeline<Self> {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut ActionPipeline<Self> {
        &mut self.pipeline
    }

    /// Priority player's cards first, then the opponent's, then system subscribers.
    fn subscriber_rank(&self, owner: Option<PlayerId>) -> u8 {
        if !self.config.active_player_first {
            return 0;
        }
        match owner {
            Some(player) if player == self.state.priority_player => 0,
            Some(_) => 1,
            None => 2,
        }
    }
}

impl Engine {
    /// Build an engine with the default performers installed.
    pub fn new(config: EngineConfig, cards: CardRegistry) -> Result<Self, EngineError> {
        config.validate()?;
        let mut pipeline = ActionPipeline::new();
        systems::install(&mut pipeline);
        Ok(Self {
            state: GameState::new(&config),
            pipeline,
            abilities: AbilityRuntime::new(),
            choices: ChoiceBroker::new(),
            cards,
            config,
            programs: Vec::new(),
        })
    }

    // === Accessors ===

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn abilities(&self) -> &AbilityRuntime {
        &self.abilities
    }

    pub fn abilities_mut(&mut self) -> &mut AbilityRuntime {
        &mut self.abilities
    }

    #[must_use]
    pub fn choices(&self) -> &ChoiceBroker {
        &self.choices
    }

    pub fn choices_mut(&mut self) -> &mut ChoiceBroker {
        &mut self.choices
    }

    #[must_use]
    pub fn cards(&self) -> &CardRegistry {
        &self.cards
    }

    /// Oldest choice waiting for the player.
    #[must_use]
    pub fn pending_choice(&self) -> Option<&dyn Choice> {
        self.choices.current()
    }

    #[must_use]
    pub fn running_programs(&self) -> usize {
        self.programs.len()
    }

    // === Submitting and driving ===

    /// Submit a top-level action. `None` if a flow is already in progress.
    pub fn perform(&mut self, action: Action) -> Option<SubmissionId> {
        self.pipeline.perform(action)
    }

    /// Join the flow in progress as a reaction, or start a flow if there is none.
    pub fn dispatch(&mut self, action: Action) {
        if self.pipeline.is_performing() {
            self.pipeline.add_reaction(action);
        } else if self.pipeline.perform(action).is_none() {
            debug!("dispatch dropped");
        }
    }

    /// Queue a running program.
    pub(crate) fn spawn_program(&mut self, task: ProgramTask) {
        trace!(ability = %task.ability, depth = self.programs.len(), "program queued");
        self.programs.push(task);
    }

    /// Advance the flow in progress, or else the newest program, by one step.
    pub fn step(&mut self) -> EngineStep {
        if self.pipeline.is_performing() {
            return match ActionPipeline::step(self) {
                Step::Waiting => EngineStep::Waiting,
                Step::Advanced | Step::Idle => EngineStep::Advanced,
            };
        }

        let Some(index) = self.programs.len().checked_sub(1) else {
            return EngineStep::Idle;
        };
        let mut task = self.programs.remove(index);
        match task.advance(self) {
            TaskStatus::Waiting => {
                self.programs.insert(index, task);
                EngineStep::Advanced
            }
            TaskStatus::AwaitingChoice(id) => {
                self.programs.insert(index, task);
                EngineStep::AwaitingChoice(id)
            }
            TaskStatus::Finished | TaskStatus::Aborted => EngineStep::Advanced,
        }
    }

    /// Step until idle or blocked on a choice. Returns the steps taken.
    pub fn run_until_idle(&mut self) -> Result<usize, EngineError> {
        let budget = self.config.max_driver_steps;
        for steps in 0..budget {
            match self.step() {
                EngineStep::Idle | EngineStep::AwaitingChoice(_) => return Ok(steps),
                EngineStep::Advanced | EngineStep::Waiting => {}
            }
        }
        Err(EngineError::Stalled(budget))
    }

    fn is_busy(&self) -> bool {
        self.pipeline.is_performing() || !self.programs.is_empty()
    }

    // === Player-facing operations ===

    /// Confirm a pending choice with `selection`, then resume.
    pub fn confirm_choice(&mut self, id: ChoiceId, selection: &[EntityId]) -> Result<(), EngineError> {
        self.choices.confirm_with(id, selection)?;
        self.run_until_idle()?;
        Ok(())
    }

    /// Create an instance of a registered card in `zone`.
    pub fn spawn_card(&mut self, name: &str, owner: PlayerId, zone: Zone) -> Result<EntityId, EngineError> {
        let definition = self.cards.require(name)?;
        Ok(self.add_card(definition, owner, zone))
    }

    /// Create a card instance in `zone` and register its abilities.
    ///
    /// Cards placed straight onto the board are not revealed.
    pub fn add_card(&mut self, definition: Rc<CardDefinition>, owner: PlayerId, zone: Zone) -> EntityId {
        let card = self
            .state
            .spawn_card(Rc::clone(&definition), owner, zone, ZonePosition::Top);
        AbilitySystem::set_up_abilities(self, &definition, card);
        card
    }

    /// Deal opening hands and run to the first Action phase.
    pub fn start_game(&mut self) -> Result<(), EngineError> {
        if self.is_busy() {
            return Err(EngineError::Busy);
        }
        self.perform(Action::begin_phase(Phase::Start))
            .ok_or(EngineError::Busy)?;
        self.run_until_idle()?;
        Ok(())
    }

    /// Play `card` from its owner's hand to `position` and resolve the play.
    pub fn play_card(&mut self, card: EntityId, position: LocationPosition) -> Result<(), EngineError> {
        if self.is_busy() {
            return Err(EngineError::Busy);
        }
        let illegal = |reason: &'static str| EngineError::IllegalPlay { card, reason };
        let Some(instance) = self.state.card(card) else {
            return Err(EngineError::UnknownEntity(card));
        };
        let player = instance.owner;
        if self.state.game_over {
            return Err(illegal("the game is over"));
        }
        if self.state.phase != Phase::Action {
            return Err(illegal("not in the action phase"));
        }
        if self.state.zones.zone_of(card) != Some(Zone::Hand(player)) {
            return Err(illegal("card is not in hand"));
        }
        if position.0 >= self.state.location_count() {
            return Err(illegal("no such location"));
        }
        if self.state.is_location_full(position, player) {
            return Err(illegal("location is full"));
        }
        if instance.cost() > self.state.energy[player].current {
            return Err(illegal("not enough energy"));
        }

        self.perform(Action::reveal(card, Some(position)).with_player(player))
            .ok_or(EngineError::Busy)?;
        self.run_until_idle()?;
        Ok(())
    }

    /// Close the Action phase and run through to the next one.
    pub fn end_turn(&mut self) -> Result<(), EngineError> {
        if self.is_busy() {
            return Err(EngineError::Busy);
        }
        if self.state.game_over || self.state.phase != Phase::Action {
            return Err(EngineError::WrongPhase {
                operation: "end the turn",
                phase: self.state.phase,
            });
        }
        self.perform(Action::end_phase(Phase::Action))
            .ok_or(EngineError::Busy)?;
        self.run_until_idle()?;
        Ok(())
    }

    /// Result once the game is over.
    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        if !self.state.game_over {
            return None;
        }
        Some(match systems::turn::leader(&self.state) {
            Some(player) => GameResult::Winner(player),
            None => GameResult::Draw,
        })
    }

    // === Resolution helpers ===

    /// Resolve target definitions for `owner`, reading its bound variables.
    pub(crate) fn resolve_targets(
        &mut self,
        defs: &[AbilityTargetDefinition],
        owner: EntityId,
        triggered: Option<&Action>,
    ) -> Vec<EntityId> {
        let query = TargetQuery::new(owner)
            .triggered_by(triggered)
            .with_vars(self.abilities.context(owner));
        TargetResolver::get_targets(&mut self.state, defs, query)
    }

    pub(crate) fn amount_value(&mut self, amount: &AbilityAmount, owner: EntityId, triggered: Option<&Action>) -> i64 {
        let query = TargetQuery::new(owner)
            .triggered_by(triggered)
            .with_vars(self.abilities.context(owner));
        TargetResolver::amount_value(&mut self.state, amount, query)
    }

    /// Resolve `target` and evaluate `requirement` against it.
    pub(crate) fn requirement_met(
        &mut self,
        requirement: &AbilityRequirement,
        target: &AbilityTargetDefinition,
        owner: EntityId,
        triggered: Option<&Action>,
    ) -> bool {
        let candidates = self.resolve_targets(std::slice::from_ref(target), owner, triggered);
        is_requirement_met(&self.state, requirement, &candidates)
    }

    pub(crate) fn open_choice(&mut self, definition: AbilityChoiceDefinition, options: &[EntityId]) -> Opened {
        self.choices.open(definition, options, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionKind;

    const P0: PlayerId = PlayerId(0);
    const P1: PlayerId = PlayerId(1);

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), CardRegistry::new()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig::default().with_location_capacity(0);
        assert!(matches!(
            Engine::new(config, CardRegistry::new()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_subscriber_rank_follows_priority() {
        let mut engine = engine();
        engine.state_mut().priority_player = P1;
        assert_eq!(engine.subscriber_rank(Some(P1)), 0);
        assert_eq!(engine.subscriber_rank(Some(P0)), 1);
        assert_eq!(engine.subscriber_rank(None), 2);
    }

    #[test]
    fn test_rank_is_flat_when_disabled() {
        let config = EngineConfig::default().with_active_player_first(false);
        let engine = Engine::new(config, CardRegistry::new()).unwrap();
        assert_eq!(engine.subscriber_rank(Some(P0)), engine.subscriber_rank(None));
    }

    #[test]
    fn test_dispatch_outside_flow_performs() {
        let mut engine = engine();
        engine.dispatch(Action::new(ActionKind::RefillEnergy));
        assert!(engine.pipeline().is_performing());
        engine.run_until_idle().unwrap();
        assert!(!engine.pipeline().is_performing());
    }

    #[test]
    fn test_play_card_validation() {
        let mut engine = engine();
        let card = engine.add_card(Rc::new(CardDefinition::new("Giant", 6, 9)), P0, Zone::Hand(P0));
        let err = engine.play_card(card, LocationPosition(0)).unwrap_err();
        assert!(matches!(err, EngineError::IllegalPlay { reason: "not in the action phase", .. }));

        engine.state_mut().phase = Phase::Action;
        let err = engine.play_card(card, LocationPosition(0)).unwrap_err();
        assert!(matches!(err, EngineError::IllegalPlay { reason: "not enough energy", .. }));

        let err = engine.play_card(card, LocationPosition(9)).unwrap_err();
        assert!(matches!(err, EngineError::IllegalPlay { reason: "no such location", .. }));
    }

    #[test]
    fn test_play_card_spends_energy_and_records_play() {
        let mut engine = engine();
        let card = engine.add_card(Rc::new(CardDefinition::new("Scout", 1, 2)), P0, Zone::Hand(P0));
        engine.state_mut().phase = Phase::Action;
        engine.state_mut().energy[P0].current = 3;
        engine.play_card(card, LocationPosition(1)).unwrap();

        let state = engine.state();
        assert_eq!(state.zones.zone_of(card), Some(Zone::Location(LocationPosition(1), P0)));
        assert_eq!(state.energy[P0].current, 2);
        assert_eq!(state.play_history.len(), 1);
        assert!(state.card(card).unwrap().revealed);
    }

    #[test]
    fn test_result_only_after_game_over() {
        let mut engine = engine();
        assert_eq!(engine.result(), None);
        engine.state_mut().game_over = true;
        assert_eq!(engine.result(), Some(GameResult::Draw));
    }
}
