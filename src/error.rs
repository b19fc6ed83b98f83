//! Error types.
//!
//! Engine paths that run inside a flow never fail hard: they log and skip.
//! These errors surface only from the fallible public entry points
//! (loading definitions, confirming choices, driving the engine).

use thiserror::Error;

use crate::abilities::AbilityEffect;
use crate::snap::ChoiceId;

/// Structural problems in an ability definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("ability has no trigger definition")]
    MissingTrigger,

    #[error("ability has no effect")]
    MissingEffect,

    #[error("action {component:?} has an empty target definition")]
    EmptyTargets { component: Option<usize> },

    #[error("action {component:?} has no amount")]
    MissingAmount { component: Option<usize> },

    #[error("effect {effect:?} in action {component:?} has no action mapping")]
    UnmappedEffect {
        effect: AbilityEffect,
        component: Option<usize>,
    },
}

/// Errors returned by the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid ability definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown card definition `{0}`")]
    UnknownCard(String),

    #[error("entity {0} does not exist")]
    UnknownEntity(crate::core::EntityId),

    #[error("choice {0:?} is not pending")]
    NoSuchChoice(ChoiceId),

    #[error("selection for choice {0:?} is not among its options")]
    InvalidSelection(ChoiceId),

    #[error("the pipeline is busy")]
    Busy,

    #[error("cannot play {card}: {reason}")]
    IllegalPlay {
        card: crate::core::EntityId,
        reason: &'static str,
    },

    #[error("cannot {operation} during the {phase:?} phase")]
    WrongPhase {
        operation: &'static str,
        phase: crate::core::Phase,
    },

    #[error("engine did not settle within {0} steps")]
    Stalled(usize),

    #[error("invalid configuration: {0}")]
    Config(String),
}
