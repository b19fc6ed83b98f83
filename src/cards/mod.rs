//! Card system: definitions, runtime entities, buffs and the registry.
//!
//! ## Key Types
//!
//! - `CardDefinition`: static card data and its ability list
//! - `SnapCard`: a card instance with its buff ledger and play state
//! - `LocationCard`, `CardContainer`: the other addressable entities
//! - `Targetable` / `Capabilities`: the capability surface effects query
//! - `BuffLedger`: ordered, attributed stat modifiers
//! - `CardRegistry`: definition lookup by name

pub mod buffs;
pub mod definition;
pub mod instance;
pub mod registry;

pub use buffs::{Buff, BuffKind, BuffLedger, BuffSource, Stat};
pub use definition::CardDefinition;
pub use instance::{CardContainer, Capabilities, ContainerKind, LocationCard, SnapCard, Targetable};
pub use registry::CardRegistry;
