//! Engine configuration.
//!
//! `EngineConfig` fixes the board geometry and the limits the engine enforces.
//! It is plain data: build it with the `with_*` methods, or load it from JSON.
//!
//! ```
//! use snap_engine::core::EngineConfig;
//!
//! let config = EngineConfig::default()
//!     .with_seed(7)
//!     .with_max_loop_iterations(16);
//! assert_eq!(config.location_count, 3);
//! assert!(config.validate().is_ok());
//!
//! let loaded = EngineConfig::from_json(r#"{ "location_capacity": 2 }"#).unwrap();
//! assert_eq!(loaded.location_capacity, 2);
//! assert_eq!(loaded.location_count, 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Index of a location along the board, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationPosition(pub u8);

impl LocationPosition {
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All positions for a board with `count` locations.
    pub fn all(count: u8) -> impl Iterator<Item = LocationPosition> {
        (0..count).map(LocationPosition)
    }
}

impl std::fmt::Display for LocationPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Location({})", self.0)
    }
}

/// Engine-wide settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of locations on the board.
    pub location_count: u8,
    /// Cards each player may hold at one location.
    pub location_capacity: usize,
    /// Cards drawn before the first turn.
    pub starting_hand: usize,
    pub max_hand_size: usize,
    /// Max energy granted at the start of each turn.
    pub energy_per_turn: i64,
    /// The match ends after this turn.
    pub max_turns: u32,
    /// Upper bound on iterations of a single `While` node.
    pub max_loop_iterations: u32,
    /// Step budget for `Engine::run_until_idle`.
    pub max_driver_steps: usize,
    /// Ticks a timed performer (draws, reveals) suspends for.
    pub performer_delay_ticks: u32,
    /// Order shared-trigger subscribers priority player first.
    pub active_player_first: bool,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            location_count: 3,
            location_capacity: 4,
            starting_hand: 3,
            max_hand_size: 7,
            energy_per_turn: 1,
            max_turns: 6,
            max_loop_iterations: 64,
            max_driver_steps: 100_000,
            performer_delay_ticks: 0,
            active_player_first: true,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.location_count == 0 {
            return Err(EngineError::Config("location_count must be positive".into()));
        }
        if self.location_capacity == 0 {
            return Err(EngineError::Config("location_capacity must be positive".into()));
        }
        if self.max_loop_iterations == 0 {
            return Err(EngineError::Config("max_loop_iterations must be positive".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_location_capacity(mut self, capacity: usize) -> Self {
        self.location_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_max_loop_iterations(mut self, cap: u32) -> Self {
        self.max_loop_iterations = cap;
        self
    }

    #[must_use]
    pub fn with_performer_delay(mut self, ticks: u32) -> Self {
        self.performer_delay_ticks = ticks;
        self
    }

    #[must_use]
    pub fn with_active_player_first(mut self, enabled: bool) -> Self {
        self.active_player_first = enabled;
        self
    }

    /// Positions of every location on the board.
    pub fn positions(&self) -> impl Iterator<Item = LocationPosition> {
        LocationPosition::all(self.location_count)
    }
}
