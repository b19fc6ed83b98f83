//! Zone manager for card instances.
//!
//! Every zone is ordered. For decks the last element is the top card; for
//! hands and location sides the order is arrival order, which is what the
//! `LocationOrder` sort key and "first/last played here" ranges read.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::LocationPosition;
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;
use crate::core::rng::GameRng;

/// A place a card instance can be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Deck(PlayerId),
    Hand(PlayerId),
    /// One player's side of a location.
    Location(LocationPosition, PlayerId),
    Discard(PlayerId),
    Destroyed(PlayerId),
    Banished,
}

impl Zone {
    /// Player this zone belongs to, if any.
    #[must_use]
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Zone::Deck(p)
            | Zone::Hand(p)
            | Zone::Location(_, p)
            | Zone::Discard(p)
            | Zone::Destroyed(p) => Some(p),
            Zone::Banished => None,
        }
    }

    #[must_use]
    pub fn is_board(self) -> bool {
        matches!(self, Zone::Location(..))
    }

    /// Location position for board zones.
    #[must_use]
    pub fn position(self) -> Option<LocationPosition> {
        match self {
            Zone::Location(position, _) => Some(position),
            _ => None,
        }
    }
}

/// Position for inserting a card into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// End of the zone (top of deck).
    Top,
    /// Start of the zone.
    Bottom,
    Index(usize),
}

/// Tracks which zone each card instance is in, and the order within it.
///
/// ```
/// use snap_engine::zones::{Zone, ZoneManager, ZonePosition};
/// use snap_engine::core::{EntityId, PlayerId};
///
/// let p0 = PlayerId::new(0);
/// let mut zones = ZoneManager::new();
/// zones.add(EntityId(10), Zone::Deck(p0), ZonePosition::Top);
/// zones.add(EntityId(11), Zone::Deck(p0), ZonePosition::Top);
///
/// assert_eq!(zones.pop_top(Zone::Deck(p0)), Some(EntityId(11)));
/// assert_eq!(zones.len(Zone::Deck(p0)), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ZoneManager {
    /// entity -> zone
    locations: FxHashMap<EntityId, Zone>,
    order: FxHashMap<Zone, Vec<EntityId>>,
}

impl ZoneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an entity that is not yet tracked. Returns false if it already is.
    pub fn add(&mut self, entity: EntityId, zone: Zone, position: ZonePosition) -> bool {
        if self.locations.contains_key(&entity) {
            return false;
        }
        self.locations.insert(entity, zone);
        Self::insert(self.order.entry(zone).or_default(), entity, position);
        true
    }

    /// Move a tracked entity. Returns the zone it left.
    pub fn move_to(&mut self, entity: EntityId, zone: Zone, position: ZonePosition) -> Option<Zone> {
        let old = self.locations.get(&entity).copied()?;
        if old == zone {
            return Some(old);
        }
        if let Some(order) = self.order.get_mut(&old) {
            order.retain(|&e| e != entity);
        }
        self.locations.insert(entity, zone);
        Self::insert(self.order.entry(zone).or_default(), entity, position);
        Some(old)
    }

    /// Stop tracking an entity.
    pub fn remove(&mut self, entity: EntityId) -> Option<Zone> {
        let zone = self.locations.remove(&entity)?;
        if let Some(order) = self.order.get_mut(&zone) {
            order.retain(|&e| e != entity);
        }
        Some(zone)
    }

    fn insert(order: &mut Vec<EntityId>, entity: EntityId, position: ZonePosition) {
        match position {
            ZonePosition::Top => order.push(entity),
            ZonePosition::Bottom => order.insert(0, entity),
            ZonePosition::Index(i) => order.insert(i.min(order.len()), entity),
        }
    }

    #[must_use]
    pub fn zone_of(&self, entity: EntityId) -> Option<Zone> {
        self.locations.get(&entity).copied()
    }

    #[must_use]
    pub fn cards(&self, zone: Zone) -> &[EntityId] {
        self.order.get(&zone).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self, zone: Zone) -> usize {
        self.cards(zone).len()
    }

    #[must_use]
    pub fn is_empty(&self, zone: Zone) -> bool {
        self.cards(zone).is_empty()
    }

    /// Index of an entity within its zone.
    #[must_use]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        let zone = self.zone_of(entity)?;
        self.cards(zone).iter().position(|&e| e == entity)
    }

    #[must_use]
    pub fn top(&self, zone: Zone) -> Option<EntityId> {
        self.cards(zone).last().copied()
    }

    /// Remove and return the top card.
    pub fn pop_top(&mut self, zone: Zone) -> Option<EntityId> {
        let entity = self.order.get_mut(&zone)?.pop()?;
        self.locations.remove(&entity);
        Some(entity)
    }

    pub fn shuffle(&mut self, zone: Zone, rng: &mut GameRng) {
        if let Some(order) = self.order.get_mut(&zone) {
            rng.shuffle(order);
        }
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.locations.contains_key(&entity)
    }
}
