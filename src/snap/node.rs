//! Executable program nodes.
//!
//! Every node exposes one operation, `execute`, which does its immediate
//! work against the engine and reports how the running task should proceed:
//! finished, waiting on a pipeline submission, waiting on a choice, or
//! descending into a child block. Suspension is the task's job; nodes never
//! block.

use std::rc::Rc;

use tracing::{debug, trace};

use super::choice::{ChoiceId, Opened};
use super::definition::AbilityChoiceDefinition;
use crate::abilities::{AbilityAmount, AbilityEffect, AbilityId, AbilityRequirement, AbilitySystem, AbilityTargetDefinition};
use crate::core::action::Action;
use crate::core::entity::EntityId;
use crate::engine::Engine;
use crate::pipeline::SubmissionId;

/// Identity of the ability a node runs on behalf of.
#[derive(Clone, Copy, Debug)]
pub struct NodeScope<'a> {
    pub ability: AbilityId,
    pub owner: EntityId,
    pub triggered: Option<&'a Action>,
}

/// How a task proceeds after `execute`.
#[derive(Clone, Debug)]
pub enum NodeOutcome {
    Done,
    /// Resume once this submission has finished.
    Submitted(SubmissionId),
    /// Resume once this choice has been confirmed; bind the result to `name`.
    AwaitChoice { id: ChoiceId, name: String },
    /// Run this block next, then continue after the node.
    Enter(Rc<[SnapNode]>),
    /// Start a loop over this node.
    Loop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionNode {
    pub effect: AbilityEffect,
    pub amount: AbilityAmount,
    pub targets: Vec<AbilityTargetDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfNode {
    pub requirement: AbilityRequirement,
    pub requirement_target: AbilityTargetDefinition,
    pub then_branch: Rc<[SnapNode]>,
    pub else_branch: Rc<[SnapNode]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhileNode {
    pub requirement: AbilityRequirement,
    pub requirement_target: AbilityTargetDefinition,
    pub body: Rc<[SnapNode]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceNode {
    pub definition: AbilityChoiceDefinition,
}

/// A compiled program node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapNode {
    Action(ActionNode),
    If(IfNode),
    While(WhileNode),
    Choice(ChoiceNode),
}

impl SnapNode {
    pub fn execute(&self, engine: &mut Engine, scope: NodeScope<'_>) -> NodeOutcome {
        match self {
            SnapNode::Action(node) => node.execute(engine, scope),
            SnapNode::If(node) => node.execute(engine, scope),
            SnapNode::While(_) => NodeOutcome::Loop,
            SnapNode::Choice(node) => node.execute(engine, scope),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SnapNode::Action(_) => "Action",
            SnapNode::If(_) => "If",
            SnapNode::While(_) => "While",
            SnapNode::Choice(_) => "Choice",
        }
    }
}

impl ActionNode {
    /// Build the effect action and submit it as a top-level flow.
    fn execute(&self, engine: &mut Engine, scope: NodeScope<'_>) -> NodeOutcome {
        let Some(action) = AbilitySystem::build_effect_action(
            engine,
            scope.ability,
            scope.owner,
            self.effect,
            &self.amount,
            &self.targets,
            None,
            scope.triggered,
        ) else {
            return NodeOutcome::Done;
        };
        match engine.perform(action) {
            Some(id) => NodeOutcome::Submitted(id),
            None => {
                debug!(ability = %scope.ability, effect = ?self.effect, "program action dropped");
                NodeOutcome::Done
            }
        }
    }
}

impl IfNode {
    fn execute(&self, engine: &mut Engine, scope: NodeScope<'_>) -> NodeOutcome {
        let met = engine.requirement_met(&self.requirement, &self.requirement_target, scope.owner, scope.triggered);
        trace!(ability = %scope.ability, met, "if");
        if met {
            NodeOutcome::Enter(Rc::clone(&self.then_branch))
        } else {
            NodeOutcome::Enter(Rc::clone(&self.else_branch))
        }
    }
}

impl WhileNode {
    /// Re-resolve the requirement target and evaluate it.
    pub fn holds(&self, engine: &mut Engine, scope: NodeScope<'_>) -> bool {
        engine.requirement_met(&self.requirement, &self.requirement_target, scope.owner, scope.triggered)
    }
}

impl ChoiceNode {
    fn execute(&self, engine: &mut Engine, scope: NodeScope<'_>) -> NodeOutcome {
        let options = engine.resolve_targets(&self.definition.choice_targets, scope.owner, scope.triggered);
        let name = self.definition.choice_name.clone();
        match engine.open_choice(self.definition.clone(), &options) {
            Opened::Resolved(selection) => {
                engine.abilities_mut().context_mut(scope.owner).set_variable(name, selection);
                NodeOutcome::Done
            }
            Opened::Pending(id) => NodeOutcome::AwaitChoice { id, name },
        }
    }
}
