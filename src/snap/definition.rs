//! Flat program definitions.
//!
//! A program is stored as an ordered list of components rather than a tree.
//! `EndCondition` closes the innermost `If` or `While`; `Else` splits an
//! `If` into its two branches. The interpreter rebuilds the nesting.
//!
//! ```
//! use snap_engine::snap::SnapComponentDefinition;
//!
//! let json = r#"[
//!     { "componentType": "If",
//!       "requirement": { "reqType": "Power", "reqComparator": "Greater",
//!                        "reqAmount": { "type": "Constant", "value": "3" } },
//!       "requirementTarget": { "target": "Self" } },
//!     { "componentType": "Else" },
//!     { "componentType": "EndCondition" }
//! ]"#;
//! let program: Vec<SnapComponentDefinition> = serde_json::from_str(json).unwrap();
//! assert_eq!(program.len(), 3);
//! assert!(program[2].is_end());
//! ```

use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityAmount, AbilityEffect, AbilityRequirement, AbilityTargetDefinition};

/// Entity kind a choice offers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    #[default]
    Card,
    Location,
    Player,
    /// Abstract resources; always resolved automatically.
    Resource,
}

/// A declared choice: its options come from `choice_targets`, and the
/// selection is bound to `choice_name` in the owner's context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbilityChoiceDefinition {
    pub choice_name: String,
    pub choice_type: ChoiceKind,
    pub choice_targets: Vec<AbilityTargetDefinition>,
    pub prompt: String,
    /// An optional choice may be confirmed with nothing selected.
    pub optional: bool,
}

impl AbilityChoiceDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ChoiceKind, targets: AbilityTargetDefinition) -> Self {
        Self {
            choice_name: name.into(),
            choice_type: kind,
            choice_targets: vec![targets],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// One component of a flat program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "componentType")]
pub enum SnapComponentDefinition {
    #[serde(rename_all = "camelCase")]
    Action {
        effect: AbilityEffect,
        #[serde(default)]
        amount: Option<AbilityAmount>,
        #[serde(default)]
        target_definition: Vec<AbilityTargetDefinition>,
    },
    #[serde(rename_all = "camelCase")]
    If {
        requirement: AbilityRequirement,
        requirement_target: AbilityTargetDefinition,
    },
    Else,
    #[serde(rename_all = "camelCase")]
    While {
        requirement: AbilityRequirement,
        requirement_target: AbilityTargetDefinition,
    },
    #[serde(rename_all = "camelCase")]
    Choice {
        choice_definition: AbilityChoiceDefinition,
    },
    EndCondition,
}

impl SnapComponentDefinition {
    #[must_use]
    pub fn action(effect: AbilityEffect, amount: AbilityAmount, target: AbilityTargetDefinition) -> Self {
        SnapComponentDefinition::Action {
            effect,
            amount: Some(amount),
            target_definition: vec![target],
        }
    }

    #[must_use]
    pub fn if_met(requirement: AbilityRequirement, target: AbilityTargetDefinition) -> Self {
        SnapComponentDefinition::If {
            requirement,
            requirement_target: target,
        }
    }

    #[must_use]
    pub fn while_met(requirement: AbilityRequirement, target: AbilityTargetDefinition) -> Self {
        SnapComponentDefinition::While {
            requirement,
            requirement_target: target,
        }
    }

    #[must_use]
    pub fn choice(definition: AbilityChoiceDefinition) -> Self {
        SnapComponentDefinition::Choice {
            choice_definition: definition,
        }
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, SnapComponentDefinition::EndCondition)
    }

    #[must_use]
    pub fn is_else(&self) -> bool {
        matches!(self, SnapComponentDefinition::Else)
    }

    /// Opens a block that a matching `EndCondition` closes.
    #[must_use]
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            SnapComponentDefinition::If { .. } | SnapComponentDefinition::While { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::TargetKind;

    #[test]
    fn test_action_component_json() {
        let json = r#"{
            "componentType": "Action",
            "effect": "GainPower",
            "amount": { "type": "Constant", "value": "2" },
            "targetDefinition": [ { "target": "Self" } ]
        }"#;
        let component: SnapComponentDefinition = serde_json::from_str(json).unwrap();
        let SnapComponentDefinition::Action { effect, amount, target_definition } = component else {
            panic!("expected action");
        };
        assert_eq!(effect, AbilityEffect::GainPower);
        assert_eq!(amount, Some(AbilityAmount::constant(2)));
        assert_eq!(target_definition[0].target, TargetKind::SelfCard);
    }

    #[test]
    fn test_action_without_amount_still_parses() {
        let json = r#"{ "componentType": "Action", "effect": "Destroy" }"#;
        let component: SnapComponentDefinition = serde_json::from_str(json).unwrap();
        assert!(matches!(
            component,
            SnapComponentDefinition::Action { amount: None, .. }
        ));
    }

    #[test]
    fn test_choice_component_json() {
        let json = r#"{
            "componentType": "Choice",
            "choiceDefinition": {
                "choiceName": "victim",
                "choiceType": "Card",
                "choiceTargets": [ { "target": "EnemyDirectLocationCards" } ],
                "prompt": "Pick a card"
            }
        }"#;
        let component: SnapComponentDefinition = serde_json::from_str(json).unwrap();
        let SnapComponentDefinition::Choice { choice_definition } = component else {
            panic!("expected choice");
        };
        assert_eq!(choice_definition.choice_name, "victim");
        assert_eq!(choice_definition.choice_type, ChoiceKind::Card);
        assert!(!choice_definition.optional);
    }

    #[test]
    fn test_block_markers() {
        assert!(SnapComponentDefinition::EndCondition.is_end());
        assert!(SnapComponentDefinition::Else.is_else());
        assert!(!SnapComponentDefinition::Else.opens_block());
    }
}
