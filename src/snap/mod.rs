//! Ability programs.
//!
//! Program abilities are written as a flat list of components (actions,
//! If/Else, While, Choice) that the interpreter compiles into a tree of
//! `SnapNode`s. A triggered program runs as a `ProgramTask` driven by the
//! engine, suspending whenever it submits an action or waits on a choice.
//!
//! ## Key Types
//!
//! - `SnapComponentDefinition`: one flat component, as loaded from JSON
//! - `SnapNode`: a compiled node with a single `execute` operation
//! - `ProgramTask`: a resumable activation of a program
//! - `ChoiceBroker` / `Choice`: pending selections and their strategies
//! - `SnapContext`: named variables bound by choices

pub mod choice;
pub mod context;
pub mod definition;
pub mod interpreter;
pub mod node;
pub mod task;

pub use choice::{CardChoice, Choice, ChoiceBroker, ChoiceId, GenericChoice, LocationChoice, Opened, PlayerChoice};
pub use context::SnapContext;
pub use definition::{AbilityChoiceDefinition, ChoiceKind, SnapComponentDefinition};
pub use interpreter::{compile, compile_definition, validate, validate_logged};
pub use node::{ActionNode, ChoiceNode, IfNode, NodeOutcome, NodeScope, SnapNode, WhileNode};
pub use task::{ProgramTask, TaskStatus};
