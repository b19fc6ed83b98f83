//! Abilities: definitions, runtime registry and activation.
//!
//! ## Key Types
//!
//! - `AbilityDefinition`: immutable template loaded from card data
//! - `AbilityAmount`: typed amount payload (constant, for-each, boolean, card name)
//! - `Ability` / `AbilityRuntime`: abilities bound to owners
//! - `AbilitySystem`: setup, reveal activation and trigger validation
//! - `OngoingController`: target re-evaluation for ongoing abilities

pub mod ability;
pub mod amount;
pub mod definition;
pub mod mapping;
pub mod ongoing;
pub mod system;

pub use ability::{Ability, AbilityId, AbilityRuntime};
pub use amount::{AbilityAmount, AmountKind, ForEachTarget};
pub use definition::{
    AbilityDefinition, AbilityEffect, AbilityRequirement, AbilityTargetDefinition, AbilityTrigger,
    AbilityTriggerDefinition, Comparator, RequirementCondition, RequirementType, TargetKind, TargetRange,
    TargetSort,
};
pub use ongoing::{ListenedSet, OngoingAbility, OngoingController};
pub use system::AbilitySystem;
