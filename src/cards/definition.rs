//! Card definitions - immutable card data.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityDefinition;

/// Static card definition.
///
/// Field names follow the card-library JSON format.
///
/// ## Example
///
/// ```
/// use snap_engine::cards::CardDefinition;
///
/// let json = r#"{ "card_name": "Scout", "cost": 1, "power": 2, "series": 1 }"#;
/// let scout = CardDefinition::from_json(json).unwrap();
/// assert_eq!(scout.name, "Scout");
/// assert!(scout.abilities.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    #[serde(rename = "card_name")]
    pub name: String,
    pub cost: i64,
    pub power: i64,
    #[serde(default)]
    pub series: i32,
    /// Abilities in declaration order; this order is activation order.
    #[serde(default)]
    pub abilities: Vec<AbilityDefinition>,
}

impl CardDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, cost: i64, power: i64) -> Self {
        Self {
            name: name.into(),
            cost,
            power,
            series: 0,
            abilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ability(mut self, ability: AbilityDefinition) -> Self {
        self.abilities.push(ability);
        self
    }

    #[must_use]
    pub fn with_series(mut self, series: i32) -> Self {
        self.series = series;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, crate::error::EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityEffect, AbilityTrigger};

    #[test]
    fn test_builder() {
        let card = CardDefinition::new("Hawk", 1, 1)
            .with_series(2)
            .with_ability(AbilityDefinition::new(AbilityTrigger::Ongoing, AbilityEffect::GainPower));
        assert_eq!(card.series, 2);
        assert_eq!(card.abilities.len(), 1);
    }

    #[test]
    fn test_json_with_abilities() {
        let json = r#"{
            "card_name": "Medic", "cost": 2, "power": 1,
            "abilities": [{
                "triggerDefinition": { "trigger": "OnReveal" },
                "effect": "GainPower",
                "amount": { "type": "Constant", "value": "2" },
                "targetDefinition": [{ "target": "PlayerDirectLocationCards", "excludeSelf": true }]
            }]
        }"#;
        let card = CardDefinition::from_json(json).unwrap();
        let ability = &card.abilities[0];
        assert_eq!(ability.trigger_kind(), AbilityTrigger::OnReveal);
        assert_eq!(ability.effect, Some(AbilityEffect::GainPower));
        assert!(ability.target_definition[0].exclude_self);
    }
}
