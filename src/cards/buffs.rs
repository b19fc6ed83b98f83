//! Buff ledger: ordered, attributed stat modifiers.
//!
//! Each buff-capable entity owns a `BuffLedger`. Effective stats fold the
//! ledger in insertion order starting from the base value, so an absolute
//! `SetPower` followed by `AdditionalPower(+1)` yields `set + 1`.
//!
//! ## Exclusivity
//!
//! Absolute buffs replace rather than stack. Applying `SetPower` first drops
//! every `SetPower` and `AdditionalPower` buff already present; `SetCost`
//! does the same for cost buffs.
//!
//! ```
//! use snap_engine::cards::{Buff, BuffKind, BuffLedger};
//!
//! let mut ledger = BuffLedger::new();
//! ledger.apply(Buff::new(BuffKind::AdditionalPower, 3));
//! ledger.apply(Buff::new(BuffKind::SetPower, 1));
//!
//! assert_eq!(ledger.len(), 1);
//! assert_eq!(ledger.power(5), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityId;
use crate::core::entity::EntityId;

/// Stat a buff modifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Power,
    Cost,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    AdditionalPower,
    AdditionalCost,
    SetPower,
    SetCost,
    Indestructible,
    Unmovable,
    /// Marks a card created mid-game.
    Created,
    Keyword(String),
}

impl BuffKind {
    #[must_use]
    pub fn stat(&self) -> Option<Stat> {
        match self {
            BuffKind::AdditionalPower | BuffKind::SetPower => Some(Stat::Power),
            BuffKind::AdditionalCost | BuffKind::SetCost => Some(Stat::Cost),
            _ => None,
        }
    }

    /// Name used by `BuffPresent` requirements.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            BuffKind::AdditionalPower => "AdditionalPower",
            BuffKind::AdditionalCost => "AdditionalCost",
            BuffKind::SetPower => "SetPower",
            BuffKind::SetCost => "SetCost",
            BuffKind::Indestructible => "Indestructible",
            BuffKind::Unmovable => "Unmovable",
            BuffKind::Created => "Created",
            BuffKind::Keyword(k) => k,
        }
    }

    /// Kinds displaced when a buff of this kind is applied.
    fn displaces(&self, other: &BuffKind) -> bool {
        match self {
            BuffKind::SetPower => other.stat() == Some(Stat::Power),
            BuffKind::SetCost => other.stat() == Some(Stat::Cost),
            _ => false,
        }
    }
}

/// Who granted a buff. Lookup only; never keeps the source alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuffSource {
    pub entity: EntityId,
    pub ability: Option<AbilityId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buff {
    pub kind: BuffKind,
    pub amount: i64,
    pub source: Option<BuffSource>,
}

impl Buff {
    #[must_use]
    pub fn new(kind: BuffKind, amount: i64) -> Self {
        Self {
            kind,
            amount,
            source: None,
        }
    }

    #[must_use]
    pub fn from_ability(mut self, entity: EntityId, ability: AbilityId) -> Self {
        self.source = Some(BuffSource {
            entity,
            ability: Some(ability),
        });
        self
    }

    #[must_use]
    pub fn from_entity(mut self, entity: EntityId) -> Self {
        self.source = Some(BuffSource {
            entity,
            ability: None,
        });
        self
    }

    #[must_use]
    pub fn is_from_ability(&self, ability: AbilityId) -> bool {
        self.source.and_then(|s| s.ability) == Some(ability)
    }
}

/// Per-entity ordered buff list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffLedger {
    buffs: Vec<Buff>,
}

impl BuffLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a buff, returning any buffs it displaced.
    pub fn apply(&mut self, buff: Buff) -> Vec<Buff> {
        let mut displaced = Vec::new();
        if matches!(buff.kind, BuffKind::SetPower | BuffKind::SetCost) {
            let (gone, kept) = std::mem::take(&mut self.buffs)
                .into_iter()
                .partition(|b| buff.kind.displaces(&b.kind));
            self.buffs = kept;
            displaced = gone;
        }
        self.buffs.push(buff);
        displaced
    }

    /// Remove the first buff granted by `ability`.
    pub fn remove_from_ability(&mut self, ability: AbilityId) -> Option<Buff> {
        let index = self.buffs.iter().position(|b| b.is_from_ability(ability))?;
        Some(self.buffs.remove(index))
    }

    /// Remove every buff matching `predicate`.
    pub fn remove_where(&mut self, predicate: impl Fn(&Buff) -> bool) -> Vec<Buff> {
        let (gone, kept) = std::mem::take(&mut self.buffs)
            .into_iter()
            .partition(|b| predicate(b));
        self.buffs = kept;
        gone
    }

    /// Amount of the first buff granted by `ability`.
    #[must_use]
    pub fn amount_from_ability(&self, ability: AbilityId) -> Option<i64> {
        self.buffs
            .iter()
            .find(|b| b.is_from_ability(ability))
            .map(|b| b.amount)
    }

    #[must_use]
    pub fn count_from_ability(&self, ability: AbilityId) -> usize {
        self.buffs.iter().filter(|b| b.is_from_ability(ability)).count()
    }

    /// Effective power from `base`.
    #[must_use]
    pub fn power(&self, base: i64) -> i64 {
        self.fold(Stat::Power, base)
    }

    /// Effective cost from `base`, never below zero.
    #[must_use]
    pub fn cost(&self, base: i64) -> i64 {
        self.fold(Stat::Cost, base).max(0)
    }

    fn fold(&self, stat: Stat, base: i64) -> i64 {
        self.buffs
            .iter()
            .filter(|b| b.kind.stat() == Some(stat))
            .fold(base, |value, buff| match buff.kind {
                BuffKind::SetPower | BuffKind::SetCost => buff.amount,
                _ => value + buff.amount,
            })
    }

    #[must_use]
    pub fn has(&self, kind: &BuffKind) -> bool {
        self.buffs.iter().any(|b| &b.kind == kind)
    }

    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.buffs
            .iter()
            .any(|b| matches!(&b.kind, BuffKind::Keyword(k) if k == keyword))
    }

    /// Comma-separated buff names, in ledger order.
    #[must_use]
    pub fn names(&self) -> String {
        self.buffs
            .iter()
            .map(|b| b.kind.name())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buff> {
        self.buffs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }

    /// Drop every buff.
    pub fn clear(&mut self) -> Vec<Buff> {
        std::mem::take(&mut self.buffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: EntityId = EntityId(10);

    #[test]
    fn test_additive_stacks_in_order() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::AdditionalPower, 2));
        ledger.apply(Buff::new(BuffKind::AdditionalPower, -3));
        assert_eq!(ledger.power(4), 3);
    }

    #[test]
    fn test_set_power_displaces_power_buffs_only() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::AdditionalPower, 2));
        ledger.apply(Buff::new(BuffKind::SetPower, 9));
        ledger.apply(Buff::new(BuffKind::AdditionalCost, 1));

        let displaced = ledger.apply(Buff::new(BuffKind::SetPower, 4));
        assert_eq!(displaced.len(), 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.power(1), 4);
        assert_eq!(ledger.cost(3), 4);
    }

    #[test]
    fn test_additional_after_set_adds_on_top() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::SetPower, 4));
        ledger.apply(Buff::new(BuffKind::AdditionalPower, 1));
        assert_eq!(ledger.power(10), 5);
    }

    #[test]
    fn test_cost_floor() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::AdditionalCost, -5));
        assert_eq!(ledger.cost(2), 0);
    }

    #[test]
    fn test_remove_by_ability() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::AdditionalPower, 2).from_ability(CARD, AbilityId(1)));
        ledger.apply(Buff::new(BuffKind::AdditionalPower, 3).from_ability(CARD, AbilityId(2)));

        assert_eq!(ledger.amount_from_ability(AbilityId(2)), Some(3));
        let removed = ledger.remove_from_ability(AbilityId(1)).unwrap();
        assert_eq!(removed.amount, 2);
        assert_eq!(ledger.remove_from_ability(AbilityId(1)), None);
        assert_eq!(ledger.power(0), 3);
    }

    #[test]
    fn test_keywords_and_names() {
        let mut ledger = BuffLedger::new();
        ledger.apply(Buff::new(BuffKind::Keyword("Armor".into()), 0));
        ledger.apply(Buff::new(BuffKind::Indestructible, 0));
        assert!(ledger.has_keyword("Armor"));
        assert!(!ledger.has_keyword("Indestructible"));
        assert!(ledger.has(&BuffKind::Indestructible));
        assert_eq!(ledger.names(), "Armor,Indestructible");
    }
}
