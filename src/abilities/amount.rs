//! Typed ability amounts.
//!
//! An amount is a kind tag plus a string payload, exactly as it arrives from
//! card data. Interpretation is deferred to the reader: `as_int` for numeric
//! comparisons, `as_bool` for boolean requirements, `for_each` for the
//! nested target spec of a `ForEachTarget` amount.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::definition::AbilityTargetDefinition;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmountKind {
    #[default]
    Constant,
    /// `{"target": <target definition>, "value": <multiplier>}`
    ForEachTarget,
    Boolean,
    /// Card definition name.
    CardId,
}

/// Kind tag plus raw payload.
///
/// ```
/// use snap_engine::abilities::{AbilityAmount, AbilityTargetDefinition, TargetKind};
///
/// assert_eq!(AbilityAmount::constant(-2).as_int(), Some(-2));
/// assert_eq!(AbilityAmount::boolean(true).as_bool(), Some(true));
///
/// let per_card = AbilityAmount::for_each_target(
///     AbilityTargetDefinition::new(TargetKind::Hand),
///     2,
/// );
/// let spec = per_card.for_each().unwrap();
/// assert_eq!(spec.value, 2);
/// assert_eq!(spec.target.target, TargetKind::Hand);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityAmount {
    #[serde(rename = "type", default)]
    pub kind: AmountKind,
    #[serde(default)]
    pub value: String,
}

/// Decoded `ForEachTarget` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForEachTarget {
    pub target: AbilityTargetDefinition,
    pub value: i64,
}

impl AbilityAmount {
    #[must_use]
    pub fn constant(value: i64) -> Self {
        Self {
            kind: AmountKind::Constant,
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            kind: AmountKind::Boolean,
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: AmountKind::Constant,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn card(name: impl Into<String>) -> Self {
        Self {
            kind: AmountKind::CardId,
            value: name.into(),
        }
    }

    #[must_use]
    pub fn for_each_target(target: AbilityTargetDefinition, multiplier: i64) -> Self {
        let payload = serde_json::json!({ "target": target, "value": multiplier });
        Self {
            kind: AmountKind::ForEachTarget,
            value: payload.to_string(),
        }
    }

    /// Payload parsed as an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    /// Payload parsed as a boolean, case-insensitively.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.kind == AmountKind::Boolean
    }

    /// Decode the nested spec of a `ForEachTarget` amount.
    ///
    /// The multiplier may be a JSON number or a numeric string.
    #[must_use]
    pub fn for_each(&self) -> Option<ForEachTarget> {
        if self.kind != AmountKind::ForEachTarget {
            return None;
        }
        let payload: serde_json::Value = match serde_json::from_str(&self.value) {
            Ok(v) => v,
            Err(err) => {
                warn!(%err, payload = %self.value, "malformed ForEachTarget amount");
                return None;
            }
        };
        let target = serde_json::from_value(payload.get("target")?.clone())
            .map_err(|err| warn!(%err, "malformed ForEachTarget target"))
            .ok()?;
        let value = match payload.get("value")? {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(ForEachTarget { target, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::TargetKind;

    #[test]
    fn test_for_each_accepts_string_multiplier() {
        let amount = AbilityAmount {
            kind: AmountKind::ForEachTarget,
            value: r#"{"target": {"target": "Deck"}, "value": "3"}"#.into(),
        };
        let spec = amount.for_each().unwrap();
        assert_eq!(spec.value, 3);
        assert_eq!(spec.target.target, TargetKind::Deck);
    }

    #[test]
    fn test_for_each_on_constant_is_none() {
        assert!(AbilityAmount::constant(4).for_each().is_none());
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(AbilityAmount::text("three").as_int(), None);
        assert_eq!(AbilityAmount::text("maybe").as_bool(), None);
        let broken = AbilityAmount {
            kind: AmountKind::ForEachTarget,
            value: "{not json".into(),
        };
        assert!(broken.for_each().is_none());
    }

    #[test]
    fn test_bool_case_insensitive() {
        assert_eq!(AbilityAmount::text("True").as_bool(), Some(true));
        assert_eq!(AbilityAmount::text(" FALSE ").as_bool(), Some(false));
    }
}
