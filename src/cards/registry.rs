//! Card registry for definition lookup by name.
//!
//! `CreateCard*` effects name the card to create in their amount payload;
//! the registry turns that name back into a definition.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::definition::CardDefinition;
use crate::error::EngineError;

/// Registry of card definitions, keyed by card name.
///
/// ## Example
///
/// ```
/// use snap_engine::cards::{CardDefinition, CardRegistry};
///
/// let mut registry = CardRegistry::new();
/// registry.register(CardDefinition::new("Rock", 1, 0));
///
/// assert_eq!(registry.get("Rock").unwrap().cost, 1);
/// assert!(registry.get("Paper").is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<String, Rc<CardDefinition>>,
}

impl CardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON list of card definitions.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let cards: Vec<CardDefinition> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for card in cards {
            registry.register(card);
        }
        Ok(registry)
    }

    /// Register a definition, returning the one it replaced.
    pub fn register(&mut self, card: CardDefinition) -> Option<Rc<CardDefinition>> {
        self.cards.insert(card.name.clone(), Rc::new(card))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<CardDefinition>> {
        self.cards.get(name).cloned()
    }

    /// Look up a definition, failing on unknown names.
    pub fn require(&self, name: &str) -> Result<Rc<CardDefinition>, EngineError> {
        self.get(name)
            .ok_or_else(|| EngineError::UnknownCard(name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.values().map(Rc::as_ref)
    }
}
