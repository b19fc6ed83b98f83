//! Compiling flat component lists into node trees.
//!
//! A single left-to-right scan with bracket matching: `If` and `While` open
//! a block that the `EndCondition` at the same depth closes, and an `Else`
//! at the same depth switches an `If` to its false branch. Stray `Else` and
//! `EndCondition` markers are skipped.
//!
//! ```
//! use snap_engine::abilities::{AbilityAmount, AbilityEffect, AbilityRequirement, AbilityTargetDefinition, TargetKind};
//! use snap_engine::snap::{compile, SnapComponentDefinition as C, SnapNode};
//!
//! let own = || AbilityTargetDefinition::new(TargetKind::SelfCard);
//! let program = compile(&[
//!     C::if_met(AbilityRequirement::default(), own()),
//!     C::action(AbilityEffect::GainPower, AbilityAmount::constant(1), own()),
//!     C::Else,
//!     C::action(AbilityEffect::GainPower, AbilityAmount::constant(-1), own()),
//!     C::EndCondition,
//! ]);
//!
//! let [SnapNode::If(node)] = &program[..] else { panic!("expected one If") };
//! assert_eq!(node.then_branch.len(), 1);
//! assert_eq!(node.else_branch.len(), 1);
//! ```

use std::rc::Rc;

use tracing::error;

use super::definition::SnapComponentDefinition as C;
use super::node::{ActionNode, ChoiceNode, IfNode, SnapNode, WhileNode};
use crate::abilities::AbilityDefinition;
use crate::error::DefinitionError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Top,
    /// True branch of an If; an Else at this depth ends it.
    Then,
    Block,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Closed {
    End,
    Else,
    Eof,
}

/// Compile a flat component list.
#[must_use]
pub fn compile(components: &[C]) -> Vec<SnapNode> {
    block(components, 0, Scope::Top).0
}

/// Compile an ability body: its component list, or the legacy single effect.
#[must_use]
pub fn compile_definition(definition: &AbilityDefinition) -> Rc<[SnapNode]> {
    if definition.is_program() {
        return compile(&definition.components).into();
    }
    let Some(effect) = definition.effect else {
        return Rc::from(Vec::new());
    };
    let node = SnapNode::Action(ActionNode {
        effect,
        amount: definition.amount.clone().unwrap_or_default(),
        targets: definition.target_definition.clone(),
    });
    Rc::from(vec![node])
}

fn block(components: &[C], mut index: usize, scope: Scope) -> (Vec<SnapNode>, usize, Closed) {
    let mut nodes = Vec::new();
    while let Some(component) = components.get(index) {
        index += 1;
        match component {
            C::EndCondition if scope != Scope::Top => return (nodes, index, Closed::End),
            C::Else if scope == Scope::Then => return (nodes, index, Closed::Else),
            C::EndCondition | C::Else => {}
            C::Action {
                effect,
                amount,
                target_definition,
            } => nodes.push(SnapNode::Action(ActionNode {
                effect: *effect,
                amount: amount.clone().unwrap_or_default(),
                targets: target_definition.clone(),
            })),
            C::If {
                requirement,
                requirement_target,
            } => {
                let (then_branch, next, closed) = block(components, index, Scope::Then);
                let (else_branch, next) = if closed == Closed::Else {
                    let (nodes, next, _) = block(components, next, Scope::Block);
                    (nodes, next)
                } else {
                    (Vec::new(), next)
                };
                index = next;
                nodes.push(SnapNode::If(IfNode {
                    requirement: requirement.clone(),
                    requirement_target: requirement_target.clone(),
                    then_branch: then_branch.into(),
                    else_branch: else_branch.into(),
                }));
            }
            C::While {
                requirement,
                requirement_target,
            } => {
                let (body, next, _) = block(components, index, Scope::Block);
                index = next;
                nodes.push(SnapNode::While(WhileNode {
                    requirement: requirement.clone(),
                    requirement_target: requirement_target.clone(),
                    body: body.into(),
                }));
            }
            C::Choice { choice_definition } => nodes.push(SnapNode::Choice(ChoiceNode {
                definition: choice_definition.clone(),
            })),
        }
    }
    (nodes, index, Closed::Eof)
}

/// Structural checks for an ability definition.
///
/// Every action, whether a program component or the legacy top level,
/// needs a non-empty target list, an amount and a mapped effect.
pub fn validate(definition: &AbilityDefinition) -> Result<(), DefinitionError> {
    if definition.trigger_definition.is_none() {
        return Err(DefinitionError::MissingTrigger);
    }
    if definition.is_program() {
        for (index, component) in definition.components.iter().enumerate() {
            if let C::Action {
                effect,
                amount,
                target_definition,
            } = component
            {
                check_action(Some(index), Some(*effect), amount.is_some(), target_definition.is_empty())?;
            }
        }
        return Ok(());
    }
    check_action(
        None,
        definition.effect,
        definition.amount.is_some(),
        definition.target_definition.is_empty(),
    )
}

fn check_action(
    component: Option<usize>,
    effect: Option<crate::abilities::AbilityEffect>,
    has_amount: bool,
    no_targets: bool,
) -> Result<(), DefinitionError> {
    let Some(effect) = effect else {
        return Err(DefinitionError::MissingEffect);
    };
    if no_targets {
        return Err(DefinitionError::EmptyTargets { component });
    }
    if !has_amount {
        return Err(DefinitionError::MissingAmount { component });
    }
    if effect.action_kind().is_none() {
        return Err(DefinitionError::UnmappedEffect { effect, component });
    }
    Ok(())
}

/// `validate`, logging the failure. Returns whether the definition is usable.
pub fn validate_logged(definition: &AbilityDefinition) -> bool {
    match validate(definition) {
        Ok(()) => true,
        Err(err) => {
            error!(description = %definition.description, %err, "ability definition rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{
        AbilityAmount, AbilityEffect, AbilityRequirement, AbilityTargetDefinition, AbilityTrigger, TargetKind,
    };

    fn own() -> AbilityTargetDefinition {
        AbilityTargetDefinition::new(TargetKind::SelfCard)
    }

    fn act(n: i64) -> C {
        C::action(AbilityEffect::GainPower, AbilityAmount::constant(n), own())
    }

    fn amount_of(node: &SnapNode) -> i64 {
        match node {
            SnapNode::Action(a) => a.amount.as_int().unwrap(),
            other => panic!("expected action, got {}", other.name()),
        }
    }

    fn cond() -> C {
        C::if_met(AbilityRequirement::default(), own())
    }

    #[test]
    fn test_if_followed_by_else_has_empty_true_branch() {
        let program = compile(&[cond(), C::Else, act(2), C::EndCondition, act(3)]);
        assert_eq!(program.len(), 2);
        let SnapNode::If(node) = &program[0] else { panic!() };
        assert!(node.then_branch.is_empty());
        assert_eq!(amount_of(&node.else_branch[0]), 2);
        assert_eq!(amount_of(&program[1]), 3);
    }

    #[test]
    fn test_if_followed_by_end_is_empty() {
        let program = compile(&[cond(), C::EndCondition, act(1)]);
        let SnapNode::If(node) = &program[0] else { panic!() };
        assert!(node.then_branch.is_empty());
        assert!(node.else_branch.is_empty());
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_nested_if_matches_same_depth() {
        // If { If { 1 } Else { 2 } 3 } Else { 4 }
        let program = compile(&[
            cond(),
            cond(),
            act(1),
            C::Else,
            act(2),
            C::EndCondition,
            act(3),
            C::Else,
            act(4),
            C::EndCondition,
        ]);
        assert_eq!(program.len(), 1);
        let SnapNode::If(outer) = &program[0] else { panic!() };
        assert_eq!(outer.then_branch.len(), 2);
        assert_eq!(amount_of(&outer.then_branch[1]), 3);
        assert_eq!(amount_of(&outer.else_branch[0]), 4);

        let SnapNode::If(inner) = &outer.then_branch[0] else { panic!() };
        assert_eq!(amount_of(&inner.then_branch[0]), 1);
        assert_eq!(amount_of(&inner.else_branch[0]), 2);
    }

    #[test]
    fn test_while_body_and_unterminated_block() {
        let while_met = C::while_met(AbilityRequirement::default(), own());
        let program = compile(&[while_met.clone(), act(1), C::EndCondition, act(2)]);
        assert_eq!(program.len(), 2);
        let SnapNode::While(node) = &program[0] else { panic!() };
        assert_eq!(node.body.len(), 1);

        let program = compile(&[while_met, act(1), act(2)]);
        let SnapNode::While(node) = &program[0] else { panic!() };
        assert_eq!(node.body.len(), 2);
    }

    #[test]
    fn test_stray_markers_are_skipped() {
        let program = compile(&[C::EndCondition, act(1), C::Else, act(2)]);
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_legacy_definition_compiles_to_single_action() {
        let def = AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::Destroy)
            .with_amount(AbilityAmount::constant(0))
            .with_target(own());
        let program = compile_definition(&def);
        assert_eq!(program.len(), 1);
        assert!(matches!(&program[0], SnapNode::Action(a) if a.effect == AbilityEffect::Destroy));
    }

    #[test]
    fn test_validation() {
        let good = AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::GainPower)
            .with_amount(AbilityAmount::constant(1))
            .with_target(own());
        assert_eq!(validate(&good), Ok(()));

        let mut no_trigger = good.clone();
        no_trigger.trigger_definition = None;
        assert_eq!(validate(&no_trigger), Err(DefinitionError::MissingTrigger));

        let no_targets = AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::GainPower)
            .with_amount(AbilityAmount::constant(1));
        assert_eq!(validate(&no_targets), Err(DefinitionError::EmptyTargets { component: None }));

        let unmapped = AbilityDefinition::new(AbilityTrigger::OnReveal, AbilityEffect::Afflict)
            .with_amount(AbilityAmount::constant(1))
            .with_target(own());
        assert!(matches!(validate(&unmapped), Err(DefinitionError::UnmappedEffect { .. })));

        let program = AbilityDefinition::program(
            AbilityTrigger::OnReveal,
            vec![
                act(1),
                C::Action {
                    effect: AbilityEffect::GainPower,
                    amount: None,
                    target_definition: vec![own()],
                },
            ],
        );
        assert_eq!(validate(&program), Err(DefinitionError::MissingAmount { component: Some(1) }));
    }
}
