//! Game state: entities, zones, turn progression and play history.
//!
//! ## Entities
//!
//! `GameState` owns every addressable entity. At construction it creates the
//! two player entities, one `LocationCard` per (position, player) side and a
//! hand and deck `CardContainer` per player. Card instances are added with
//! `spawn_card`.
//!
//! ## History
//!
//! `play_history` is an `im::Vector`, so cloning the state for a snapshot
//! shares the history instead of copying it.

use std::rc::Rc;

use im::Vector;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::config::{EngineConfig, LocationPosition};
use super::entity::EntityId;
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use crate::abilities::AbilityId;
use crate::cards::{
    Buff, BuffLedger, CardContainer, CardDefinition, Capabilities, ContainerKind, LocationCard,
    SnapCard, Stat, Targetable,
};
use crate::zones::{Zone, ZoneManager, ZonePosition};

/// Turn phases, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Start,
    Preparation,
    Action,
    Reveal,
    End,
}

impl Phase {
    /// Phase that follows this one; `End` wraps to `Preparation` of the next turn.
    #[must_use]
    pub fn next(self) -> Phase {
        match self {
            Phase::Start => Phase::Preparation,
            Phase::Preparation => Phase::Action,
            Phase::Action => Phase::Reveal,
            Phase::Reveal => Phase::End,
            Phase::End => Phase::Preparation,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Energy {
    pub current: i64,
    pub max: i64,
}

/// One card play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub card: EntityId,
    pub player: PlayerId,
    pub turn: u32,
    pub order: u32,
}

/// Any addressable entity.
#[derive(Clone, Debug)]
pub enum Entity {
    Player(PlayerId),
    Card(SnapCard),
    Location(LocationCard),
    Container(CardContainer),
}

impl Targetable for Entity {
    fn entity_id(&self) -> EntityId {
        match self {
            Entity::Player(p) => EntityId::player(*p),
            Entity::Card(c) => c.entity_id(),
            Entity::Location(l) => l.entity_id(),
            Entity::Container(c) => c.entity_id(),
        }
    }

    fn owner(&self) -> Option<PlayerId> {
        match self {
            Entity::Player(p) => Some(*p),
            Entity::Card(c) => c.owner(),
            Entity::Location(l) => l.owner(),
            Entity::Container(c) => c.owner(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            Entity::Player(_) => Capabilities::TARGETABLE,
            Entity::Card(c) => c.capabilities(),
            Entity::Location(l) => l.capabilities(),
            Entity::Container(c) => c.capabilities(),
        }
    }

    fn buffs(&self) -> Option<&BuffLedger> {
        match self {
            Entity::Card(c) => Some(&c.buffs),
            Entity::Location(l) => Some(&l.buffs),
            _ => None,
        }
    }

    fn buffs_mut(&mut self) -> Option<&mut BuffLedger> {
        match self {
            Entity::Card(c) => Some(&mut c.buffs),
            Entity::Location(l) => Some(&mut l.buffs),
            _ => None,
        }
    }
}

/// Complete match state.
#[derive(Clone, Debug)]
pub struct GameState {
    entities: FxHashMap<EntityId, Entity>,
    pub zones: ZoneManager,
    location_cards: FxHashMap<(LocationPosition, PlayerId), EntityId>,
    containers: FxHashMap<(ContainerKind, PlayerId), EntityId>,
    location_count: u8,
    location_capacity: usize,
    max_hand_size: usize,

    /// Turn number; 0 before the first turn starts.
    pub turn: u32,
    pub phase: Phase,
    pub energy: PlayerMap<Energy>,
    /// Player whose cards reveal and react first.
    pub priority_player: PlayerId,
    pub play_history: Vector<PlayRecord>,
    pub game_over: bool,
    pub rng: GameRng,

    next_played_order: u32,
    next_entity: u32,
}

impl GameState {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let mut state = Self {
            entities: FxHashMap::default(),
            zones: ZoneManager::new(),
            location_cards: FxHashMap::default(),
            containers: FxHashMap::default(),
            location_count: config.location_count,
            location_capacity: config.location_capacity,
            max_hand_size: config.max_hand_size,
            turn: 0,
            phase: Phase::Start,
            energy: PlayerMap::default(),
            priority_player: PlayerId(0),
            play_history: Vector::new(),
            game_over: false,
            rng: GameRng::new(config.seed),
            next_played_order: 0,
            next_entity: EntityId::FIRST_NON_PLAYER,
        };

        for player in PlayerId::both() {
            state
                .entities
                .insert(EntityId::player(player), Entity::Player(player));
        }
        for position in config.positions() {
            for player in PlayerId::both() {
                let id = state.alloc_id();
                state.entities.insert(
                    id,
                    Entity::Location(LocationCard {
                        entity_id: id,
                        position,
                        player,
                        buffs: BuffLedger::new(),
                    }),
                );
                state.location_cards.insert((position, player), id);
            }
        }
        for player in PlayerId::both() {
            for kind in [ContainerKind::Hand, ContainerKind::Deck] {
                let id = state.alloc_id();
                state.entities.insert(
                    id,
                    Entity::Container(CardContainer {
                        entity_id: id,
                        kind,
                        player,
                    }),
                );
                state.containers.insert((kind, player), id);
            }
        }
        state
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Create a card instance in `zone`.
    pub fn spawn_card(
        &mut self,
        definition: Rc<CardDefinition>,
        owner: PlayerId,
        zone: Zone,
        position: ZonePosition,
    ) -> EntityId {
        let id = self.alloc_id();
        self.entities
            .insert(id, Entity::Card(SnapCard::new(id, owner, definition)));
        self.zones.add(id, zone, position);
        id
    }

    // === Entity access ===

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    #[must_use]
    pub fn card(&self, id: EntityId) -> Option<&SnapCard> {
        match self.entities.get(&id) {
            Some(Entity::Card(card)) => Some(card),
            _ => None,
        }
    }

    pub fn card_mut(&mut self, id: EntityId) -> Option<&mut SnapCard> {
        match self.entities.get_mut(&id) {
            Some(Entity::Card(card)) => Some(card),
            _ => None,
        }
    }

    #[must_use]
    pub fn location_card(&self, id: EntityId) -> Option<&LocationCard> {
        match self.entities.get(&id) {
            Some(Entity::Location(location)) => Some(location),
            _ => None,
        }
    }

    #[must_use]
    pub fn container(&self, id: EntityId) -> Option<&CardContainer> {
        match self.entities.get(&id) {
            Some(Entity::Container(container)) => Some(container),
            _ => None,
        }
    }

    #[must_use]
    pub fn owner_of(&self, id: EntityId) -> Option<PlayerId> {
        self.entity(id).and_then(Targetable::owner)
    }

    #[must_use]
    pub fn has_capability(&self, id: EntityId, capability: Capabilities) -> bool {
        self.entity(id).is_some_and(|e| e.has(capability))
    }

    // === Board geometry ===

    pub fn positions(&self) -> impl Iterator<Item = LocationPosition> {
        LocationPosition::all(self.location_count)
    }

    #[must_use]
    pub fn location_count(&self) -> u8 {
        self.location_count
    }

    #[must_use]
    pub fn location_capacity(&self) -> usize {
        self.location_capacity
    }

    #[must_use]
    pub fn max_hand_size(&self) -> usize {
        self.max_hand_size
    }

    /// Entity representing `player`'s side of `position`.
    #[must_use]
    pub fn location_entity(&self, position: LocationPosition, player: PlayerId) -> Option<EntityId> {
        self.location_cards.get(&(position, player)).copied()
    }

    #[must_use]
    pub fn container_entity(&self, kind: ContainerKind, player: PlayerId) -> Option<EntityId> {
        self.containers.get(&(kind, player)).copied()
    }

    /// Board side an entity sits on: a card's location zone, or a location card's side.
    #[must_use]
    pub fn side_of(&self, id: EntityId) -> Option<(LocationPosition, PlayerId)> {
        if let Some(location) = self.location_card(id) {
            return Some((location.position, location.player));
        }
        match self.zones.zone_of(id)? {
            Zone::Location(position, player) => Some((position, player)),
            _ => None,
        }
    }

    #[must_use]
    pub fn cards_at(&self, position: LocationPosition, player: PlayerId) -> &[EntityId] {
        self.zones.cards(Zone::Location(position, player))
    }

    #[must_use]
    pub fn is_location_full(&self, position: LocationPosition, player: PlayerId) -> bool {
        self.cards_at(position, player).len() >= self.location_capacity
    }

    /// Total power on one side: card power plus the location card's own buffs.
    #[must_use]
    pub fn location_power(&self, position: LocationPosition, player: PlayerId) -> i64 {
        let cards: i64 = self
            .cards_at(position, player)
            .iter()
            .filter_map(|&id| self.card(id))
            .map(SnapCard::power)
            .sum();
        let bonus = self
            .location_entity(position, player)
            .and_then(|id| self.location_card(id))
            .map_or(0, LocationCard::bonus_power);
        cards + bonus
    }

    /// Power of any entity: card power, or total power for a location card.
    #[must_use]
    pub fn power_of(&self, id: EntityId) -> i64 {
        match self.entity(id) {
            Some(Entity::Card(card)) => card.power(),
            Some(Entity::Location(location)) => self.location_power(location.position, location.player),
            _ => 0,
        }
    }

    #[must_use]
    pub fn hand(&self, player: PlayerId) -> &[EntityId] {
        self.zones.cards(Zone::Hand(player))
    }

    #[must_use]
    pub fn deck(&self, player: PlayerId) -> &[EntityId] {
        self.zones.cards(Zone::Deck(player))
    }

    /// Cards on `player`'s side of every location, left to right.
    #[must_use]
    pub fn board_cards(&self, player: PlayerId) -> Vec<EntityId> {
        self.positions()
            .flat_map(|position| self.cards_at(position, player).iter().copied())
            .collect()
    }

    /// Live cards owned by `player`: deck, hand, then board.
    #[must_use]
    pub fn live_cards(&self, player: PlayerId) -> Vec<EntityId> {
        let mut cards: Vec<EntityId> = self.deck(player).to_vec();
        cards.extend_from_slice(self.hand(player));
        cards.extend(self.board_cards(player));
        cards
    }

    // === Play tracking ===

    /// Mark a card revealed and append it to the play history.
    pub fn record_play(&mut self, card: EntityId) -> Option<u32> {
        let order = self.next_played_order;
        let turn = self.turn;
        let entry = self.card_mut(card)?;
        entry.revealed = true;
        entry.played_order = Some(order);
        let player = entry.owner;
        self.next_played_order += 1;
        self.play_history.push_back(PlayRecord {
            card,
            player,
            turn,
            order,
        });
        Some(order)
    }

    /// First card the owner's player played after `owner` this turn.
    #[must_use]
    pub fn next_played_card(&self, owner: EntityId) -> Option<EntityId> {
        let card = self.card(owner)?;
        let after = card.played_order?;
        self.play_history
            .iter()
            .find(|r| r.player == card.owner && r.turn == self.turn && r.order > after)
            .map(|r| r.card)
    }

    // === Buffs ===

    /// Add a buff to a buff-capable entity. Returns false if it cannot hold buffs.
    pub fn apply_buff(&mut self, id: EntityId, buff: Buff) -> bool {
        match self.entity_mut(id).and_then(Targetable::buffs_mut) {
            Some(ledger) => {
                ledger.apply(buff);
                true
            }
            None => false,
        }
    }

    /// Remove the buff `ability` granted to `id`, reporting which stat it touched.
    pub fn remove_ability_buff(&mut self, id: EntityId, ability: AbilityId) -> Option<(Buff, Option<Stat>)> {
        let ledger = self.entity_mut(id).and_then(Targetable::buffs_mut)?;
        let buff = ledger.remove_from_ability(ability)?;
        let stat = buff.kind.stat();
        Some((buff, stat))
    }

    #[must_use]
    pub fn ability_buff_amount(&self, id: EntityId, ability: AbilityId) -> Option<i64> {
        self.entity(id)
            .and_then(Targetable::buffs)
            .and_then(|ledger| ledger.amount_from_ability(ability))
    }
}
