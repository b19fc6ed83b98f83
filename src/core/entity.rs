//! Entity identification.
//!
//! Every addressable object in a match (player, card instance, location
//! side, hand, deck) has a unique `EntityId`.
//!
//! ## ID Layout
//!
//! - `0..PLAYER_COUNT`: reserved for the two players
//! - `PLAYER_COUNT..`: allocated by `GameState` in creation order
//!
//! ```
//! use snap_engine::core::{EntityId, PlayerId};
//!
//! let p1 = EntityId::player(PlayerId::new(1));
//! assert!(p1.is_player());
//! assert_eq!(p1.as_player(), Some(PlayerId::new(1)));
//!
//! let card = EntityId(10);
//! assert!(!card.is_player());
//! ```

use serde::{Deserialize, Serialize};

use super::player::{PlayerId, PLAYER_COUNT};

/// Unique identifier for any game entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// First ID handed out to non-player entities.
    pub const FIRST_NON_PLAYER: u32 = PLAYER_COUNT as u32;

    /// Entity ID of a player.
    #[must_use]
    pub const fn player(id: PlayerId) -> Self {
        Self(id.0 as u32)
    }

    /// Check if this ID is one of the reserved player IDs.
    #[must_use]
    pub const fn is_player(self) -> bool {
        self.0 < Self::FIRST_NON_PLAYER
    }

    /// Convert to a `PlayerId` if this is a player entity.
    #[must_use]
    pub const fn as_player(self) -> Option<PlayerId> {
        if self.is_player() {
            Some(PlayerId(self.0 as u8))
        } else {
            None
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_entities() {
        assert!(EntityId(0).is_player());
        assert!(EntityId(1).is_player());
        assert!(!EntityId(2).is_player());
        assert_eq!(EntityId(2).as_player(), None);
    }

    #[test]
    fn test_player_roundtrip() {
        for player in PlayerId::both() {
            assert_eq!(EntityId::player(player).as_player(), Some(player));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntityId(42)), "Entity(42)");
    }
}
