//! Running programs.
//!
//! A `ProgramTask` is one activation of a program ability. It keeps an
//! explicit cursor stack instead of a call stack, so it can stop at any
//! suspension point (a submitted action, a pending choice) and resume on a
//! later engine step.

use std::rc::Rc;

use tracing::{debug, error, trace};

use super::choice::ChoiceId;
use super::node::{NodeOutcome, NodeScope, SnapNode, WhileNode};
use crate::abilities::AbilityId;
use crate::core::action::Action;
use crate::core::entity::EntityId;
use crate::engine::Engine;
use crate::pipeline::{PipelineHost, SubmissionId};

/// Where a task is blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Wait {
    Submission(SubmissionId),
    Choice { id: ChoiceId, name: String },
}

#[derive(Clone, Debug)]
enum Cursor {
    Block { nodes: Rc<[SnapNode]>, next: usize },
    Loop { nodes: Rc<[SnapNode]>, index: usize, iterations: u32 },
}

/// Result of advancing a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Blocked on a pipeline submission.
    Waiting,
    /// Blocked on an unconfirmed choice.
    AwaitingChoice(ChoiceId),
    Finished,
    /// Stopped early; the rest of the program is skipped.
    Aborted,
}

/// One running activation of a program ability.
#[derive(Clone, Debug)]
pub struct ProgramTask {
    pub ability: AbilityId,
    pub owner: EntityId,
    triggered: Option<Action>,
    cursors: Vec<Cursor>,
    wait: Option<Wait>,
}

impl ProgramTask {
    #[must_use]
    pub fn new(ability: AbilityId, owner: EntityId, program: Rc<[SnapNode]>, triggered: Option<Action>) -> Self {
        Self {
            ability,
            owner,
            triggered,
            cursors: vec![Cursor::Block {
                nodes: program,
                next: 0,
            }],
            wait: None,
        }
    }

    #[must_use]
    pub fn is_waiting_on_choice(&self) -> bool {
        matches!(self.wait, Some(Wait::Choice { .. }))
    }

    /// Run until the next suspension point or the end of the program.
    pub fn advance(&mut self, engine: &mut Engine) -> TaskStatus {
        if let Some(status) = self.poll_wait(engine) {
            return status;
        }

        let cap = engine.config().max_loop_iterations;
        let scope = NodeScope {
            ability: self.ability,
            owner: self.owner,
            triggered: self.triggered.as_ref(),
        };

        while let Some(cursor) = self.cursors.last_mut() {
            let node = match cursor {
                Cursor::Block { nodes, next } => {
                    let Some(node) = nodes.get(*next).cloned() else {
                        self.cursors.pop();
                        continue;
                    };
                    *next += 1;
                    node
                }
                Cursor::Loop {
                    nodes,
                    index,
                    iterations,
                } => {
                    let SnapNode::While(looped) = &nodes[*index] else {
                        self.cursors.pop();
                        continue;
                    };
                    let looped: WhileNode = looped.clone();
                    if !looped.holds(engine, scope) {
                        trace!(ability = %self.ability, iterations = *iterations, "loop finished");
                        self.cursors.pop();
                        continue;
                    }
                    *iterations += 1;
                    if *iterations > cap {
                        error!(ability = %self.ability, owner = %self.owner, cap, "loop iteration cap exceeded; program aborted");
                        self.cursors.clear();
                        return TaskStatus::Aborted;
                    }
                    let body = Rc::clone(&looped.body);
                    self.cursors.push(Cursor::Block { nodes: body, next: 0 });
                    continue;
                }
            };

            match node.execute(engine, scope) {
                NodeOutcome::Done => {}
                NodeOutcome::Enter(block) => self.cursors.push(Cursor::Block { nodes: block, next: 0 }),
                NodeOutcome::Loop => {
                    if let Some(Cursor::Block { nodes, next }) = self.cursors.last() {
                        let loop_cursor = Cursor::Loop {
                            nodes: Rc::clone(nodes),
                            index: next - 1,
                            iterations: 0,
                        };
                        self.cursors.push(loop_cursor);
                    }
                }
                NodeOutcome::Submitted(id) => {
                    self.wait = Some(Wait::Submission(id));
                    return TaskStatus::Waiting;
                }
                NodeOutcome::AwaitChoice { id, name } => {
                    self.wait = Some(Wait::Choice { id, name });
                    return TaskStatus::AwaitingChoice(id);
                }
            }
        }
        debug!(ability = %self.ability, "program finished");
        TaskStatus::Finished
    }

    /// Clear a satisfied wait, or report the one still blocking.
    fn poll_wait(&mut self, engine: &mut Engine) -> Option<TaskStatus> {
        match self.wait.take()? {
            Wait::Submission(id) => {
                if engine.pipeline().is_finished(id) {
                    None
                } else {
                    self.wait = Some(Wait::Submission(id));
                    Some(TaskStatus::Waiting)
                }
            }
            Wait::Choice { id, name } => match engine.choices_mut().take(id) {
                Some(selection) => {
                    engine
                        .abilities_mut()
                        .context_mut(self.owner)
                        .set_variable(name, selection);
                    None
                }
                None if engine.choices().is_pending(id) => {
                    self.wait = Some(Wait::Choice { id, name });
                    Some(TaskStatus::AwaitingChoice(id))
                }
                None => {
                    debug!(ability = %self.ability, choice = %id, "choice cancelled; program aborted");
                    Some(TaskStatus::Aborted)
                }
            },
        }
    }
}
