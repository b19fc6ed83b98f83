//! Choices: suspension points that wait for an external selection.
//!
//! A Choice node resolves its option set, then hands it to a strategy. The
//! entity-kind strategies (`CardChoice`, `LocationChoice`, `PlayerChoice`)
//! keep only options of their kind and wait in the `ChoiceBroker` until the
//! UI confirms a selection. `GenericChoice` resolves immediately to the first
//! option and is used for resources and any unmatched combination.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::definition::{AbilityChoiceDefinition, ChoiceKind};
use crate::core::entity::EntityId;
use crate::core::state::{Entity, GameState};
use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChoiceId(pub u64);

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Choice({})", self.0)
    }
}

/// A selection strategy over a fixed option set.
pub trait Choice: fmt::Debug {
    fn id(&self) -> ChoiceId;

    fn definition(&self) -> &AbilityChoiceDefinition;

    fn options(&self) -> &[EntityId];

    fn selection(&self) -> &[EntityId];

    /// Add `entity` to the selection. False if it is not an option.
    fn select(&mut self, entity: EntityId) -> bool;

    fn deselect(&mut self, entity: EntityId) -> bool;

    /// Resolves without waiting for confirmation.
    fn auto_resolves(&self) -> bool {
        false
    }

    /// Whether the current selection may be confirmed.
    fn is_ready(&self) -> bool {
        self.definition().optional || self.options().is_empty() || !self.selection().is_empty()
    }
}

/// State shared by every strategy.
#[derive(Clone, Debug)]
struct ChoiceCore {
    id: ChoiceId,
    definition: AbilityChoiceDefinition,
    options: Vec<EntityId>,
    selected: Vec<EntityId>,
}

impl ChoiceCore {
    fn select(&mut self, entity: EntityId) -> bool {
        if !self.options.contains(&entity) {
            return false;
        }
        if !self.selected.contains(&entity) {
            self.selected.push(entity);
        }
        true
    }

    fn deselect(&mut self, entity: EntityId) -> bool {
        let before = self.selected.len();
        self.selected.retain(|&e| e != entity);
        self.selected.len() != before
    }
}

macro_rules! entity_choice {
    ($(#[$meta:meta])* $name:ident, $keep:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(ChoiceCore);

        impl $name {
            #[must_use]
            pub fn new(
                id: ChoiceId,
                definition: AbilityChoiceDefinition,
                candidates: &[EntityId],
                state: &GameState,
            ) -> Self {
                let keep: fn(Option<&Entity>) -> bool = $keep;
                let options = candidates
                    .iter()
                    .copied()
                    .filter(|&e| keep(state.entity(e)))
                    .collect();
                Self(ChoiceCore {
                    id,
                    definition,
                    options,
                    selected: Vec::new(),
                })
            }
        }

        impl Choice for $name {
            fn id(&self) -> ChoiceId {
                self.0.id
            }

            fn definition(&self) -> &AbilityChoiceDefinition {
                &self.0.definition
            }

            fn options(&self) -> &[EntityId] {
                &self.0.options
            }

            fn selection(&self) -> &[EntityId] {
                &self.0.selected
            }

            fn select(&mut self, entity: EntityId) -> bool {
                self.0.select(entity)
            }

            fn deselect(&mut self, entity: EntityId) -> bool {
                self.0.deselect(entity)
            }
        }
    };
}

entity_choice!(
    /// Choose among card instances.
    CardChoice,
    |e| matches!(e, Some(Entity::Card(_)))
);
entity_choice!(
    /// Choose among location sides.
    LocationChoice,
    |e| matches!(e, Some(Entity::Location(_)))
);
entity_choice!(
    /// Choose a player.
    PlayerChoice,
    |e| matches!(e, Some(Entity::Player(_)))
);

/// Fallback strategy: the first option, chosen immediately.
#[derive(Clone, Debug)]
pub struct GenericChoice(ChoiceCore);

impl GenericChoice {
    #[must_use]
    pub fn new(id: ChoiceId, definition: AbilityChoiceDefinition, candidates: &[EntityId]) -> Self {
        let options = candidates.to_vec();
        let selected = options.first().copied().into_iter().collect();
        Self(ChoiceCore {
            id,
            definition,
            options,
            selected,
        })
    }
}

impl Choice for GenericChoice {
    fn id(&self) -> ChoiceId {
        self.0.id
    }

    fn definition(&self) -> &AbilityChoiceDefinition {
        &self.0.definition
    }

    fn options(&self) -> &[EntityId] {
        &self.0.options
    }

    fn selection(&self) -> &[EntityId] {
        &self.0.selected
    }

    fn select(&mut self, entity: EntityId) -> bool {
        self.0.select(entity)
    }

    fn deselect(&mut self, entity: EntityId) -> bool {
        self.0.deselect(entity)
    }

    fn auto_resolves(&self) -> bool {
        true
    }
}

/// Result of opening a choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opened {
    /// Resolved on the spot.
    Resolved(Vec<EntityId>),
    /// Waiting for `confirm`.
    Pending(ChoiceId),
}

/// Holds pending choices until they are confirmed.
#[derive(Debug, Default)]
pub struct ChoiceBroker {
    pending: Vec<Box<dyn Choice>>,
    resolved: FxHashMap<ChoiceId, Vec<EntityId>>,
    next_id: u64,
}

impl ChoiceBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the strategy for `definition` over `candidates`.
    ///
    /// A strategy left with no options resolves to an empty selection.
    pub fn open(&mut self, definition: AbilityChoiceDefinition, candidates: &[EntityId], state: &GameState) -> Opened {
        let id = ChoiceId(self.next_id);
        self.next_id += 1;

        let choice: Box<dyn Choice> = match definition.choice_type {
            ChoiceKind::Card => Box::new(CardChoice::new(id, definition, candidates, state)),
            ChoiceKind::Location => Box::new(LocationChoice::new(id, definition, candidates, state)),
            ChoiceKind::Player => Box::new(PlayerChoice::new(id, definition, candidates, state)),
            ChoiceKind::Resource => Box::new(GenericChoice::new(id, definition, candidates)),
        };

        if choice.auto_resolves() || choice.options().is_empty() {
            debug!(choice = %id, name = %choice.definition().choice_name, "choice resolved without input");
            return Opened::Resolved(choice.selection().to_vec());
        }
        debug!(choice = %id, options = choice.options().len(), "choice pending");
        self.pending.push(choice);
        Opened::Pending(id)
    }

    /// Oldest pending choice.
    #[must_use]
    pub fn current(&self) -> Option<&dyn Choice> {
        self.pending.first().map(Box::as_ref)
    }

    pub fn pending(&self) -> impl Iterator<Item = &dyn Choice> {
        self.pending.iter().map(Box::as_ref)
    }

    #[must_use]
    pub fn is_pending(&self, id: ChoiceId) -> bool {
        self.pending.iter().any(|c| c.id() == id)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn find_mut(&mut self, id: ChoiceId) -> Result<&mut Box<dyn Choice>, EngineError> {
        self.pending
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(EngineError::NoSuchChoice(id))
    }

    pub fn select(&mut self, id: ChoiceId, entity: EntityId) -> Result<(), EngineError> {
        if self.find_mut(id)?.select(entity) {
            Ok(())
        } else {
            Err(EngineError::InvalidSelection(id))
        }
    }

    pub fn deselect(&mut self, id: ChoiceId, entity: EntityId) -> Result<bool, EngineError> {
        Ok(self.find_mut(id)?.deselect(entity))
    }

    /// Confirm the current selection of `id`.
    pub fn confirm(&mut self, id: ChoiceId) -> Result<(), EngineError> {
        let index = self
            .pending
            .iter()
            .position(|c| c.id() == id)
            .ok_or(EngineError::NoSuchChoice(id))?;
        if !self.pending[index].is_ready() {
            return Err(EngineError::InvalidSelection(id));
        }
        let choice = self.pending.remove(index);
        debug!(choice = %id, selected = choice.selection().len(), "choice confirmed");
        self.resolved.insert(id, choice.selection().to_vec());
        Ok(())
    }

    /// Replace the selection of `id` with `selection` and confirm it.
    ///
    /// Nothing changes if any entity is not an option.
    pub fn confirm_with(&mut self, id: ChoiceId, selection: &[EntityId]) -> Result<(), EngineError> {
        let choice = self.find_mut(id)?;
        if selection.iter().any(|e| !choice.options().contains(e)) {
            return Err(EngineError::InvalidSelection(id));
        }
        let previous = choice.selection().to_vec();
        for entity in previous {
            choice.deselect(entity);
        }
        for &entity in selection {
            choice.select(entity);
        }
        self.confirm(id)
    }

    /// Collect a confirmed selection. `None` while still pending.
    pub fn take(&mut self, id: ChoiceId) -> Option<Vec<EntityId>> {
        self.resolved.remove(&id)
    }

    /// Drop a pending choice without resolving it.
    pub fn cancel(&mut self, id: ChoiceId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|c| c.id() != id);
        self.pending.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityTargetDefinition, TargetKind};
    use crate::cards::CardDefinition;
    use crate::core::{EngineConfig, LocationPosition, PlayerId};
    use crate::zones::{Zone, ZonePosition};
    use std::rc::Rc;

    fn setup() -> (GameState, EntityId, EntityId) {
        let mut state = GameState::new(&EngineConfig::default());
        let card = state.spawn_card(
            Rc::new(CardDefinition::new("Target", 1, 1)),
            PlayerId(1),
            Zone::Location(LocationPosition(0), PlayerId(1)),
            ZonePosition::Top,
        );
        let location = state
            .location_entity(LocationPosition(0), PlayerId(1))
            .unwrap();
        (state, card, location)
    }

    fn definition(kind: ChoiceKind) -> AbilityChoiceDefinition {
        AbilityChoiceDefinition::new("pick", kind, AbilityTargetDefinition::new(TargetKind::AllDirectLocationCards))
    }

    #[test]
    fn test_card_choice_filters_options() {
        let (state, card, location) = setup();
        let mut broker = ChoiceBroker::new();
        let Opened::Pending(id) = broker.open(definition(ChoiceKind::Card), &[card, location], &state) else {
            panic!("card choice should wait");
        };
        assert_eq!(broker.current().unwrap().options(), &[card]);

        assert!(matches!(broker.select(id, location), Err(EngineError::InvalidSelection(_))));
        broker.select(id, card).unwrap();
        broker.confirm(id).unwrap();
        assert!(!broker.has_pending());
        assert_eq!(broker.take(id), Some(vec![card]));
        assert_eq!(broker.take(id), None);
    }

    #[test]
    fn test_resource_choice_auto_selects_first() {
        let (state, card, location) = setup();
        let mut broker = ChoiceBroker::new();
        let opened = broker.open(definition(ChoiceKind::Resource), &[location, card], &state);
        assert_eq!(opened, Opened::Resolved(vec![location]));
        assert!(!broker.has_pending());
    }

    #[test]
    fn test_no_options_resolves_empty() {
        let (state, card, _) = setup();
        let mut broker = ChoiceBroker::new();
        let opened = broker.open(definition(ChoiceKind::Player), &[card], &state);
        assert_eq!(opened, Opened::Resolved(Vec::new()));
    }

    #[test]
    fn test_confirm_requires_selection_unless_optional() {
        let (state, card, _) = setup();
        let mut broker = ChoiceBroker::new();
        let Opened::Pending(id) = broker.open(definition(ChoiceKind::Card), &[card], &state) else {
            panic!("card choice should wait");
        };
        assert!(matches!(broker.confirm(id), Err(EngineError::InvalidSelection(_))));

        let Opened::Pending(optional) = broker.open(definition(ChoiceKind::Card).optional(), &[card], &state) else {
            panic!("card choice should wait");
        };
        broker.confirm(optional).unwrap();
        assert_eq!(broker.take(optional), Some(Vec::new()));
    }

    #[test]
    fn test_confirm_with_rejects_foreign_entities() {
        let (state, card, location) = setup();
        let mut broker = ChoiceBroker::new();
        let Opened::Pending(id) = broker.open(definition(ChoiceKind::Card), &[card], &state) else {
            panic!("card choice should wait");
        };
        assert!(matches!(
            broker.confirm_with(id, &[location]),
            Err(EngineError::InvalidSelection(_))
        ));
        assert!(broker.is_pending(id));
        broker.confirm_with(id, &[card]).unwrap();
        assert!(matches!(broker.confirm(id), Err(EngineError::NoSuchChoice(_))));
    }
}
