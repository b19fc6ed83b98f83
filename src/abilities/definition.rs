//! Declarative ability definitions.
//!
//! These types are what card data (designer assets or JSON from an
//! ability-generation service) deserializes into. They are immutable once
//! loaded; `Ability` binds one to an owning card at runtime.
//!
//! ## Shapes
//!
//! An ability is either:
//! - **Legacy**: one `effect` with `amount` and `target_definition`, or
//! - **Program**: a flat `components` list compiled by the Snap interpreter.
//!
//! ```
//! use snap_engine::abilities::{
//!     AbilityAmount, AbilityDefinition, AbilityEffect, AbilityTargetDefinition, AbilityTrigger,
//!     TargetKind, TargetRange,
//! };
//!
//! let def = AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::GainPower)
//!     .with_amount(AbilityAmount::constant(-2))
//!     .with_target(
//!         AbilityTargetDefinition::new(TargetKind::EnemyDirectLocationCards)
//!             .with_range(TargetRange::Random),
//!     );
//!
//! assert!(!def.is_program());
//! assert_eq!(def.trigger_kind(), AbilityTrigger::OnReveal);
//! ```

use serde::{Deserialize, Serialize};

use super::amount::AbilityAmount;
use crate::snap::SnapComponentDefinition;

/// When an ability fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityTrigger {
    OnReveal,
    Ongoing,
    GameStart,
    EndTurn,
    EndGame,
    InHand,
    InDeck,
    Destroyed,
    Discarded,
    Moved,
    Banished,
    StartTurn,
    Activate,
    BeforeCardPlayed,
    AfterCardPlayed,
    AfterAbilityTriggered,
    OnCreated,
    #[default]
    None,
}

impl AbilityTrigger {
    /// Triggers that only matter while the card is not on the board.
    #[must_use]
    pub fn is_off_board(self) -> bool {
        matches!(self, AbilityTrigger::InHand | AbilityTrigger::InDeck)
    }
}

/// What an ability does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityEffect {
    GainPower,
    LosePower,
    StealPower,
    Afflict,
    Draw,
    Discard,
    Destroy,
    Move,
    GainEnergy,
    GainMaxEnergy,
    LoseEnergy,
    AddPowerToLocation,
    CreateCardInHand,
    CreateCardInDeck,
    CreateCardInLocation,
    RemoveAbility,
    ReduceCost,
    IncreaseCost,
    Merge,
    Return,
    AddCardToLocation,
    AddCardToHand,
    SetPower,
    SetCost,
    CopyAndActivate,
    AddKeyword,
    AddTemporaryAbility,
}

/// Raw candidate set a target definition starts from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    #[serde(rename = "Self")]
    SelfCard,
    Deck,
    Hand,
    EnemyDeck,
    EnemyHand,
    PlayerDirectLocationCards,
    EnemyDirectLocationCards,
    AllDirectLocationCards,
    AllPlayerCards,
    AllEnemyCards,
    AllPlayerPlayedCards,
    AllEnemyPlayedCards,
    AllPlayedCards,
    PlayerDirectLocation,
    AllPlayerLocation,
    EnemyDirectLocation,
    AllEnemyLocation,
    DirectLocation,
    AllLocation,
    NextPlayedCard,
    TriggeredActionTargets,
    TriggeredActionSource,
    CreatedCard,
    PlayerHandContainer,
    PlayerDeckContainer,
    Player,
    EnemyPlayer,
    /// Entities bound to a named variable by a Choice node.
    Chosen(String),
}

/// How many of the sorted candidates survive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRange {
    /// Same as `All`.
    #[default]
    None,
    First,
    Last,
    All,
    Random,
    AllRequirementsMet,
    RandomRequirementsMet,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSort {
    #[default]
    None,
    Power,
    BaseCost,
    CurrentCost,
    PlayedOrder,
    LocationOrder,
}

/// Value a requirement reads from each candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementType {
    #[default]
    None,
    Power,
    Cost,
    CurrentCost,
    NumberOfCards,
    CurrentTurn,
    CurrentMaxEnergy,
    LocationPowerDifference,
    HasKeyword,
    IsCreated,
    CardName,
    BuffPresent,
    LocationFull,
    LocationOccupied,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    None,
    Equal,
    NotEqual,
    Greater,
    Less,
    #[serde(rename = "GEQ")]
    GreaterOrEqual,
    #[serde(rename = "LEQ")]
    LessOrEqual,
    Contains,
    DoesNotContain,
}

/// How per-candidate results aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementCondition {
    #[default]
    All,
    Any,
}

/// A predicate over a resolved target set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbilityRequirement {
    pub req_type: RequirementType,
    pub req_comparator: Comparator,
    pub req_condition: RequirementCondition,
    pub req_amount: AbilityAmount,
}

impl AbilityRequirement {
    #[must_use]
    pub fn new(req_type: RequirementType, comparator: Comparator, amount: AbilityAmount) -> Self {
        Self {
            req_type,
            req_comparator: comparator,
            req_condition: RequirementCondition::All,
            req_amount: amount,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: RequirementCondition) -> Self {
        self.req_condition = condition;
        self
    }
}

/// Declarative target specification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityTargetDefinition {
    pub target: TargetKind,
    #[serde(default)]
    pub target_range: TargetRange,
    #[serde(default)]
    pub target_sort: TargetSort,
    #[serde(default)]
    pub target_requirement: Vec<AbilityRequirement>,
    #[serde(default)]
    pub exclude_self: bool,
}

impl AbilityTargetDefinition {
    #[must_use]
    pub fn new(target: TargetKind) -> Self {
        Self {
            target,
            target_range: TargetRange::All,
            target_sort: TargetSort::None,
            target_requirement: Vec::new(),
            exclude_self: false,
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: TargetRange) -> Self {
        self.target_range = range;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: TargetSort) -> Self {
        self.target_sort = sort;
        self
    }

    #[must_use]
    pub fn with_requirement(mut self, requirement: AbilityRequirement) -> Self {
        self.target_requirement.push(requirement);
        self
    }

    #[must_use]
    pub fn excluding_self(mut self) -> Self {
        self.exclude_self = true;
        self
    }
}

/// Trigger kind plus an optional trigger-source target spec.
///
/// When `source` is non-empty, a triggering action only activates the
/// ability if its targets intersect the resolution of `source`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityTriggerDefinition {
    pub trigger: AbilityTrigger,
    #[serde(default, rename = "triggerSource")]
    pub source: Vec<AbilityTargetDefinition>,
}

impl AbilityTriggerDefinition {
    #[must_use]
    pub fn new(trigger: AbilityTrigger) -> Self {
        Self {
            trigger,
            source: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: AbilityTargetDefinition) -> Self {
        self.source.push(source);
        self
    }
}

/// Immutable ability template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbilityDefinition {
    pub trigger_definition: Option<AbilityTriggerDefinition>,
    pub effect: Option<AbilityEffect>,
    pub amount: Option<AbilityAmount>,
    pub target_definition: Vec<AbilityTargetDefinition>,
    pub activation_requirements: Vec<AbilityRequirement>,
    pub activation_requirement_targets: Option<AbilityTargetDefinition>,
    /// Program body; empty for the legacy shape.
    #[serde(rename = "snapComponents")]
    pub components: Vec<SnapComponentDefinition>,
    pub exhaust: bool,
    pub description: String,
}

impl AbilityDefinition {
    /// Legacy-shape definition with no targets or amount yet.
    #[must_use]
    pub fn new(trigger: AbilityTrigger, effect: AbilityEffect) -> Self {
        Self {
            trigger_definition: Some(AbilityTriggerDefinition::new(trigger)),
            effect: Some(effect),
            ..Self::default()
        }
    }

    /// Program-shape definition.
    #[must_use]
    pub fn program(trigger: AbilityTrigger, components: Vec<SnapComponentDefinition>) -> Self {
        Self {
            trigger_definition: Some(AbilityTriggerDefinition::new(trigger)),
            components,
            ..Self::default()
        }
    }

    /// Parse a single definition from JSON.
    pub fn from_json(json: &str) -> Result<Self, crate::error::EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_amount(mut self, amount: AbilityAmount) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: AbilityTargetDefinition) -> Self {
        self.target_definition.push(target);
        self
    }

    #[must_use]
    pub fn with_trigger_source(mut self, source: AbilityTargetDefinition) -> Self {
        let trigger = self.trigger_definition.get_or_insert_with(Default::default);
        trigger.source.push(source);
        self
    }

    #[must_use]
    pub fn with_activation_requirement(
        mut self,
        requirement: AbilityRequirement,
        targets: AbilityTargetDefinition,
    ) -> Self {
        self.activation_requirements.push(requirement);
        self.activation_requirement_targets = Some(targets);
        self
    }

    #[must_use]
    pub fn exhausting(mut self) -> Self {
        self.exhaust = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Trigger kind, `None` if the definition has no trigger.
    #[must_use]
    pub fn trigger_kind(&self) -> AbilityTrigger {
        self.trigger_definition
            .as_ref()
            .map_or(AbilityTrigger::None, |t| t.trigger)
    }

    #[must_use]
    pub fn trigger_source(&self) -> &[AbilityTargetDefinition] {
        self.trigger_definition
            .as_ref()
            .map_or(&[], |t| t.source.as_slice())
    }

    #[must_use]
    pub fn is_program(&self) -> bool {
        !self.components.is_empty()
    }

    /// Check whether any top-level target spec is of `kind`.
    #[must_use]
    pub fn targets_kind(&self, kind: &TargetKind) -> bool {
        self.target_definition.iter().any(|t| &t.target == kind)
    }
}
