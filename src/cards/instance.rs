//! Runtime entities: card instances, location cards and card containers.
//!
//! All three implement `Targetable`. Code that acts on targets asks for a
//! capability (`Capabilities::DESTRUCTIBLE`, `BUFF_OBTAINABLE`, ...) rather
//! than matching on the concrete entity type.

use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::buffs::{BuffKind, BuffLedger};
use super::definition::CardDefinition;
use crate::abilities::{AbilityId, AbilityTrigger};
use crate::core::config::LocationPosition;
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;

bitflags! {
    /// What can be done to an entity.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const TARGETABLE = 1 << 0;
        const DESTRUCTIBLE = 1 << 1;
        const DISCARDABLE = 1 << 2;
        const MOVEABLE = 1 << 3;
        const BUFF_OBTAINABLE = 1 << 4;
        const CARD_CONTAINER = 1 << 5;
    }
}

/// Capability surface shared by every addressable entity.
pub trait Targetable {
    fn entity_id(&self) -> EntityId;

    /// Owning player; `None` for neutral entities.
    fn owner(&self) -> Option<PlayerId>;

    fn capabilities(&self) -> Capabilities;

    fn buffs(&self) -> Option<&BuffLedger> {
        None
    }

    fn buffs_mut(&mut self) -> Option<&mut BuffLedger> {
        None
    }

    fn has(&self, capability: Capabilities) -> bool {
        self.capabilities().contains(capability)
    }
}

/// A card instance.
#[derive(Clone, Debug)]
pub struct SnapCard {
    pub entity_id: EntityId,
    pub owner: PlayerId,
    pub definition: Rc<CardDefinition>,
    pub buffs: BuffLedger,
    pub revealed: bool,
    /// Global play sequence number, set when revealed.
    pub played_order: Option<u32>,
    /// Created mid-game rather than dealt from a deck list.
    pub created: bool,
}

impl SnapCard {
    #[must_use]
    pub fn new(entity_id: EntityId, owner: PlayerId, definition: Rc<CardDefinition>) -> Self {
        Self {
            entity_id,
            owner,
            definition,
            buffs: BuffLedger::new(),
            revealed: false,
            played_order: None,
            created: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub fn base_power(&self) -> i64 {
        self.definition.power
    }

    #[must_use]
    pub fn base_cost(&self) -> i64 {
        self.definition.cost
    }

    #[must_use]
    pub fn power(&self) -> i64 {
        self.buffs.power(self.definition.power)
    }

    #[must_use]
    pub fn cost(&self) -> i64 {
        self.buffs.cost(self.definition.cost)
    }

    /// Keyword lookup over keyword buffs and the card's OnReveal/Ongoing abilities.
    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        if self.buffs.has_keyword(keyword) {
            return true;
        }
        self.definition.abilities.iter().any(|a| match a.trigger_kind() {
            AbilityTrigger::OnReveal => keyword == "OnReveal",
            AbilityTrigger::Ongoing => keyword == "Ongoing",
            _ => false,
        })
    }

    /// Forget play state, as when the card returns to hand.
    ///
    /// Buffs granted by the abilities in `kept` survive; those are ongoing
    /// effects that still reach the card wherever it lands.
    pub fn reset(&mut self, kept: &[AbilityId]) {
        self.buffs
            .remove_where(|b| !kept.iter().any(|&ability| b.is_from_ability(ability)));
        self.revealed = false;
        self.played_order = None;
    }
}

impl Targetable for SnapCard {
    fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.owner)
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps =
            Capabilities::TARGETABLE | Capabilities::DISCARDABLE | Capabilities::BUFF_OBTAINABLE;
        if !self.buffs.has(&BuffKind::Indestructible) {
            caps |= Capabilities::DESTRUCTIBLE;
        }
        if !self.buffs.has(&BuffKind::Unmovable) {
            caps |= Capabilities::MOVEABLE;
        }
        caps
    }

    fn buffs(&self) -> Option<&BuffLedger> {
        Some(&self.buffs)
    }

    fn buffs_mut(&mut self) -> Option<&mut BuffLedger> {
        Some(&mut self.buffs)
    }
}

/// One player's side of a location, addressable as a pseudo-card.
#[derive(Clone, Debug)]
pub struct LocationCard {
    pub entity_id: EntityId,
    pub position: LocationPosition,
    pub player: PlayerId,
    pub buffs: BuffLedger,
}

impl LocationCard {
    /// Power the location itself adds to its side.
    #[must_use]
    pub fn bonus_power(&self) -> i64 {
        self.buffs.power(0)
    }
}

impl Targetable for LocationCard {
    fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.player)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TARGETABLE | Capabilities::BUFF_OBTAINABLE
    }

    fn buffs(&self) -> Option<&BuffLedger> {
        Some(&self.buffs)
    }

    fn buffs_mut(&mut self) -> Option<&mut BuffLedger> {
        Some(&mut self.buffs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Hand,
    Deck,
}

/// A player's hand or deck as a targetable entity.
#[derive(Clone, Debug)]
pub struct CardContainer {
    pub entity_id: EntityId,
    pub kind: ContainerKind,
    pub player: PlayerId,
}

impl Targetable for CardContainer {
    fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.player)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TARGETABLE | Capabilities::CARD_CONTAINER
    }
}
