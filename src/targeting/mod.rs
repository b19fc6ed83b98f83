//! Target resolution and requirement evaluation.

pub mod requirement;
pub mod resolver;

pub use requirement::{candidate_value, is_requirement_met};
pub use resolver::{TargetQuery, TargetResolver};
