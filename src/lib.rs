//! # snap-engine
//!
//! Reactive rules engine for a Snap-style collectible card game: two
//! players, a row of locations, cards whose abilities react to everything
//! that happens on the board.
//!
//! ## Design Principles
//!
//! 1. **Everything is an action**: every state change is an `Action` that
//!    flows through pre, perform and post phases. Abilities react by queuing
//!    more actions, which resolve depth-first inside the phase that spawned
//!    them.
//!
//! 2. **Data-driven abilities**: abilities are declarative definitions
//!    loaded from JSON, either a single effect or a small program with
//!    If/Else, While and Choice nodes.
//!
//! 3. **Instance-owned, explicitly driven**: the pipeline, its subscribers
//!    and the ability registry live on one `Engine`. Nothing is global and
//!    nothing runs until the caller steps the engine.
//!
//! 4. **Skip, don't fail**: a malformed ability or a trigger that finds no
//!    targets is logged and skipped; it never stops the flow it fired in.
//!
//! ## Modules
//!
//! - `core`: entity ids, players, state, actions, RNG, configuration
//! - `zones`: ordered zone tracking
//! - `cards`: definitions, instances, buffs and the card registry
//! - `pipeline`: the pre/perform/post action pipeline
//! - `targeting`: target resolution and requirement evaluation
//! - `abilities`: ability definitions, runtime, activation and ongoing abilities
//! - `snap`: the ability-program interpreter and choices
//! - `systems`: default performers and the phase loop
//! - `engine`: the driver tying it together
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod abilities;
pub mod cards;
pub mod core;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod snap;
pub mod systems;
pub mod targeting;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    Action, ActionKind, ActionTags, EngineConfig, EntityId, GameRng, GameState, LocationPosition, Phase,
    PlayerId, PlayerMap,
};

pub use crate::zones::{Zone, ZoneManager, ZonePosition};

pub use crate::cards::{Buff, BuffKind, BuffLedger, CardDefinition, CardRegistry, SnapCard};

pub use crate::pipeline::{ActionFilter, ActionPipeline, PipelineHost, ReactionTiming, SubmissionId, SubscriptionId};

pub use crate::targeting::{is_requirement_met, TargetQuery, TargetResolver};

pub use crate::abilities::{
    AbilityAmount, AbilityDefinition, AbilityEffect, AbilityId, AbilitySystem, AbilityTargetDefinition,
    AbilityTrigger, OngoingController,
};

pub use crate::snap::{ChoiceBroker, ChoiceId, ProgramTask, SnapComponentDefinition};

pub use crate::engine::{Engine, EngineStep, GameResult};

pub use crate::error::{DefinitionError, EngineError};
