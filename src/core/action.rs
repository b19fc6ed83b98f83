//! Actions: the units of game-state change the pipeline executes.
//!
//! An `Action` is inert data. It names what should happen (`ActionKind`),
//! who caused it, what it targets, and by how much. The pipeline runs it
//! through pre, perform and post phases; listeners fill its three reaction
//! lists while it flows.
//!
//! ## Tags
//!
//! Every kind carries a fixed `ActionTags` mask describing what it can
//! change ("hand updated", "power changed", ...). Listeners that care about
//! a class of changes test the mask instead of enumerating kinds.
//!
//! ```
//! use snap_engine::core::{Action, ActionKind, ActionTags, EntityId};
//!
//! let action = Action::new(ActionKind::DestroyCard).with_target(EntityId(12));
//! assert!(action.tags().contains(ActionTags::LOCATION_CARDS_UPDATED));
//! assert!(!action.tags().contains(ActionTags::HAND_UPDATED));
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::config::LocationPosition;
use super::entity::EntityId;
use super::player::PlayerId;
use super::state::Phase;
use crate::abilities::{AbilityAmount, AbilityId};

bitflags! {
    /// What an action may have changed.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ActionTags: u16 {
        /// Produced by an ability's effect.
        const ABILITY_EFFECT = 1 << 0;
        const POWER_CHANGED = 1 << 1;
        const COST_CHANGED = 1 << 2;
        /// Cards entered or left a location side.
        const LOCATION_CARDS_UPDATED = 1 << 3;
        const HAND_UPDATED = 1 << 4;
        const DECK_UPDATED = 1 << 5;
        /// New card instances were created.
        const CARD_CREATED = 1 << 6;
    }
}

/// Discriminant of an action. Performers and subscribers key on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    BeginPhase,
    EndPhase,
    RevealCard,
    DrawCard,
    RefillEnergy,
    GainMaxEnergy,
    /// Notification that a stat changed outside a dedicated action.
    UpdateStat,
    GainPower,
    StealPower,
    SetPower,
    AddPowerToLocation,
    IncreaseCost,
    DiscardCard,
    DestroyCard,
    MoveCard,
    ReturnCard,
    CreateCardInHand,
    CreateCardInDeck,
    CreateCardInLocation,
    AddCardToHand,
    AddCardToLocation,
    MergeCards,
    AddKeyword,
    AddTemporaryAbility,
}

impl ActionKind {
    /// Fixed tag mask for this kind.
    #[must_use]
    pub fn tags(self) -> ActionTags {
        use ActionKind::*;

        let effect = ActionTags::ABILITY_EFFECT;
        let board = ActionTags::LOCATION_CARDS_UPDATED;
        let hand = ActionTags::HAND_UPDATED;
        let deck = ActionTags::DECK_UPDATED;
        let created = ActionTags::CARD_CREATED;

        match self {
            BeginPhase | EndPhase | RefillEnergy | UpdateStat => ActionTags::empty(),
            RevealCard => board | hand,
            DrawCard => effect | hand | deck,
            GainMaxEnergy | AddKeyword | AddTemporaryAbility => effect,
            GainPower | StealPower | SetPower | AddPowerToLocation => {
                effect | ActionTags::POWER_CHANGED
            }
            IncreaseCost => effect | ActionTags::COST_CHANGED,
            DiscardCard => effect | hand,
            DestroyCard | MoveCard => effect | board,
            ReturnCard => effect | board | hand,
            CreateCardInHand => effect | created | hand,
            CreateCardInDeck => effect | created | deck,
            CreateCardInLocation => effect | created | board,
            AddCardToHand => effect | hand | deck,
            AddCardToLocation => effect | board | hand | deck,
            MergeCards => effect | board | ActionTags::POWER_CHANGED,
        }
    }
}

/// Target list storage; most actions hit one to four entities.
pub type TargetList = SmallVec<[EntityId; 4]>;

/// One unit of game-state change.
#[derive(Clone, Debug)]
pub struct Action {
    pub kind: ActionKind,
    /// Entity whose ability produced this action.
    pub owner: Option<EntityId>,
    pub ability: Option<AbilityId>,
    /// Subject player for player-scoped actions (draws, energy, phases).
    pub player: Option<PlayerId>,
    pub targets: TargetList,
    /// Declared amount, kept for payload kinds (card names, JSON).
    pub amount: AbilityAmount,
    /// Numeric amount resolved when the action was built.
    pub value: i64,
    pub location: Option<LocationPosition>,
    pub phase: Option<Phase>,
    /// Entities created while performing; read by `CreatedCard` targets.
    pub created: Vec<EntityId>,
    /// Tags in addition to the kind's fixed mask.
    pub extra_tags: ActionTags,
    pub pre_reactions: Vec<Action>,
    pub perform_reactions: Vec<Action>,
    pub post_reactions: Vec<Action>,
}

impl Action {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            owner: None,
            ability: None,
            player: None,
            targets: TargetList::new(),
            amount: AbilityAmount::default(),
            value: 0,
            location: None,
            phase: None,
            created: Vec::new(),
            extra_tags: ActionTags::empty(),
            pre_reactions: Vec::new(),
            perform_reactions: Vec::new(),
            post_reactions: Vec::new(),
        }
    }

    /// Action produced by an ability's effect.
    #[must_use]
    pub fn effect(
        kind: ActionKind,
        owner: EntityId,
        ability: AbilityId,
        targets: impl IntoIterator<Item = EntityId>,
        amount: AbilityAmount,
        value: i64,
    ) -> Self {
        let mut action = Self::new(kind);
        action.owner = Some(owner);
        action.ability = Some(ability);
        action.targets = targets.into_iter().collect();
        action.amount = amount;
        action.value = value;
        action
    }

    /// Play `card` to `location` and reveal it.
    #[must_use]
    pub fn reveal(card: EntityId, location: Option<LocationPosition>) -> Self {
        let mut action = Self::new(ActionKind::RevealCard).with_target(card);
        action.location = location;
        action
    }

    #[must_use]
    pub fn draw(player: PlayerId, count: i64) -> Self {
        Self::new(ActionKind::DrawCard)
            .with_player(player)
            .with_value(count)
    }

    #[must_use]
    pub fn begin_phase(phase: Phase) -> Self {
        let mut action = Self::new(ActionKind::BeginPhase);
        action.phase = Some(phase);
        action
    }

    #[must_use]
    pub fn end_phase(phase: Phase) -> Self {
        let mut action = Self::new(ActionKind::EndPhase);
        action.phase = Some(phase);
        action
    }

    #[must_use]
    pub fn with_target(mut self, target: EntityId) -> Self {
        self.targets.push(target);
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: LocationPosition) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: ActionTags) -> Self {
        self.extra_tags |= tags;
        self
    }

    /// Kind mask plus any extra tags.
    #[must_use]
    pub fn tags(&self) -> ActionTags {
        self.kind.tags() | self.extra_tags
    }

    #[must_use]
    pub fn targets_entity(&self, entity: EntityId) -> bool {
        self.targets.contains(&entity)
    }
}
