//! Core engine types: entities, players, state, actions, RNG, configuration.

pub mod action;
pub mod config;
pub mod entity;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{Action, ActionKind, ActionTags, TargetList};
pub use config::{EngineConfig, LocationPosition};
pub use entity::EntityId;
pub use player::{PlayerId, PlayerMap, PLAYER_COUNT};
pub use rng::GameRng;
pub use state::{Energy, Entity, GameState, Phase, PlayRecord};
