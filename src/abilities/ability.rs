//! Runtime abilities and the per-owner registry.
//!
//! An `Ability` binds an immutable `AbilityDefinition` to the card that owns
//! it. The `AbilityRuntime` keeps every live ability, indexed by owner in
//! registration order, which is also the order abilities sharing a trigger
//! activate in.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::definition::AbilityDefinition;
use super::ongoing::OngoingAbility;
use crate::core::entity::EntityId;
use crate::pipeline::SubscriptionId;
use crate::snap::{SnapContext, SnapNode};

/// Unique identifier for a registered ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

impl AbilityId {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ability({})", self.0)
    }
}

/// An ability bound to its owner.
#[derive(Clone, Debug)]
pub struct Ability {
    pub id: AbilityId,
    pub owner: EntityId,
    pub definition: Rc<AbilityDefinition>,
    /// Compiled body. Legacy definitions compile to a single action node.
    pub program: Rc<[SnapNode]>,
    /// Single use: unsubscribes after the first successful trigger.
    pub exhaust: bool,
    /// False when the definition failed validation; the ability never fires.
    pub activatable: bool,
    /// Temporary abilities stop firing once this turn has passed.
    pub expires_after_turn: Option<u32>,
    /// Set once an exhausting ability has fired.
    pub spent: bool,
    subscription: Option<SubscriptionId>,
}

impl Ability {
    #[must_use]
    pub fn new(id: AbilityId, owner: EntityId, definition: Rc<AbilityDefinition>, program: Rc<[SnapNode]>) -> Self {
        Self {
            id,
            owner,
            exhaust: definition.exhaust,
            definition,
            program,
            activatable: true,
            expires_after_turn: None,
            spent: false,
            subscription: None,
        }
    }

    #[must_use]
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// Store the live listener. Returns false if one is already held.
    pub fn hold_subscription(&mut self, id: SubscriptionId) -> bool {
        if self.subscription.is_some() {
            return false;
        }
        self.subscription = Some(id);
        true
    }

    /// Take the live listener, leaving none. A second call returns `None`.
    pub fn release_subscription(&mut self) -> Option<SubscriptionId> {
        self.subscription.take()
    }

    /// Whether the ability may fire on `turn`.
    #[must_use]
    pub fn can_fire(&self, turn: u32) -> bool {
        self.activatable && !self.spent && self.expires_after_turn.map_or(true, |t| turn <= t)
    }
}

/// Registry of live abilities, ongoing controllers and execution contexts.
#[derive(Debug, Default)]
pub struct AbilityRuntime {
    abilities: FxHashMap<AbilityId, Ability>,
    by_owner: FxHashMap<EntityId, Vec<AbilityId>>,
    ongoing: FxHashMap<AbilityId, OngoingAbility>,
    /// Activation order of ongoing abilities.
    ongoing_order: Vec<AbilityId>,
    contexts: FxHashMap<EntityId, SnapContext>,
    next_id: u32,
}

impl AbilityRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability for `owner`, returning its id.
    pub fn register(
        &mut self,
        owner: EntityId,
        definition: Rc<AbilityDefinition>,
        program: Rc<[SnapNode]>,
    ) -> AbilityId {
        let id = AbilityId(self.next_id);
        self.next_id += 1;
        self.abilities
            .insert(id, Ability::new(id, owner, definition, program));
        self.by_owner.entry(owner).or_default().push(id);
        id
    }

    /// Remove an ability. The caller releases its subscription.
    pub fn unregister(&mut self, id: AbilityId) -> Option<Ability> {
        let ability = self.abilities.remove(&id)?;
        if let Some(list) = self.by_owner.get_mut(&ability.owner) {
            list.retain(|&a| a != id);
        }
        Some(ability)
    }

    #[must_use]
    pub fn get(&self, id: AbilityId) -> Option<&Ability> {
        self.abilities.get(&id)
    }

    pub fn get_mut(&mut self, id: AbilityId) -> Option<&mut Ability> {
        self.abilities.get_mut(&id)
    }

    /// Abilities of `owner`, in registration order.
    pub fn abilities_of(&self, owner: EntityId) -> impl Iterator<Item = &Ability> {
        self.ids_of(owner)
            .iter()
            .filter_map(|id| self.abilities.get(id))
    }

    #[must_use]
    pub fn ids_of(&self, owner: EntityId) -> &[AbilityId] {
        self.by_owner.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Ability registered just before `id` on the same owner.
    #[must_use]
    pub fn previous(&self, id: AbilityId) -> Option<AbilityId> {
        let owner = self.abilities.get(&id)?.owner;
        let list = self.ids_of(owner);
        let index = list.iter().position(|&a| a == id)?;
        index.checked_sub(1).map(|i| list[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    // === Ongoing ===

    pub fn add_ongoing(&mut self, ongoing: OngoingAbility) {
        let id = ongoing.ability;
        if self.ongoing.insert(id, ongoing).is_none() {
            self.ongoing_order.push(id);
        }
    }

    pub fn remove_ongoing(&mut self, id: AbilityId) -> Option<OngoingAbility> {
        self.ongoing_order.retain(|&a| a != id);
        self.ongoing.remove(&id)
    }

    #[must_use]
    pub fn ongoing(&self, id: AbilityId) -> Option<&OngoingAbility> {
        self.ongoing.get(&id)
    }

    pub fn ongoing_mut(&mut self, id: AbilityId) -> Option<&mut OngoingAbility> {
        self.ongoing.get_mut(&id)
    }

    /// Active ongoing abilities, in activation order.
    pub fn active_ongoing(&self) -> impl Iterator<Item = &OngoingAbility> {
        self.ongoing_order
            .iter()
            .filter_map(|id| self.ongoing.get(id))
    }

    /// Ongoing abilities owned by `owner`.
    #[must_use]
    pub fn ongoing_of(&self, owner: EntityId) -> Vec<AbilityId> {
        self.active_ongoing()
            .filter(|o| o.owner == owner)
            .map(|o| o.ability)
            .collect()
    }

    /// Ongoing abilities whose current target set includes `entity`.
    #[must_use]
    pub fn ongoing_targeting(&self, entity: EntityId) -> Vec<AbilityId> {
        self.active_ongoing()
            .filter(|o| o.current_targets.contains(&entity))
            .map(|o| o.ability)
            .collect()
    }

    // === Contexts ===

    #[must_use]
    pub fn context(&self, owner: EntityId) -> Option<&SnapContext> {
        self.contexts.get(&owner)
    }

    pub fn context_mut(&mut self, owner: EntityId) -> &mut SnapContext {
        self.contexts.entry(owner).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityEffect, AbilityTrigger};

    fn definition() -> Rc<AbilityDefinition> {
        Rc::new(AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::GainPower))
    }

    #[test]
    fn test_registration_order_per_owner() {
        let mut runtime = AbilityRuntime::new();
        let a = runtime.register(EntityId(20), definition(), Rc::from(Vec::new()));
        let b = runtime.register(EntityId(21), definition(), Rc::from(Vec::new()));
        let c = runtime.register(EntityId(20), definition(), Rc::from(Vec::new()));

        assert_eq!(runtime.ids_of(EntityId(20)), &[a, c]);
        assert_eq!(runtime.ids_of(EntityId(21)), &[b]);
        assert_eq!(runtime.previous(c), Some(a));
        assert_eq!(runtime.previous(a), None);
    }

    #[test]
    fn test_unregister_removes_from_owner_list() {
        let mut runtime = AbilityRuntime::new();
        let a = runtime.register(EntityId(20), definition(), Rc::from(Vec::new()));
        assert!(runtime.unregister(a).is_some());
        assert!(runtime.unregister(a).is_none());
        assert!(runtime.ids_of(EntityId(20)).is_empty());
        assert!(runtime.is_empty());
    }

    #[test]
    fn test_release_subscription_is_idempotent() {
        let mut ability = Ability::new(AbilityId(0), EntityId(20), definition(), Rc::from(Vec::new()));
        assert!(ability.hold_subscription(SubscriptionId(4)));
        assert!(!ability.hold_subscription(SubscriptionId(5)));
        assert_eq!(ability.release_subscription(), Some(SubscriptionId(4)));
        assert_eq!(ability.release_subscription(), None);
    }

    #[test]
    fn test_expiry() {
        let mut ability = Ability::new(AbilityId(0), EntityId(20), definition(), Rc::from(Vec::new()));
        ability.expires_after_turn = Some(2);
        assert!(ability.can_fire(2));
        assert!(!ability.can_fire(3));
        ability.activatable = false;
        assert!(!ability.can_fire(1));
    }
}
