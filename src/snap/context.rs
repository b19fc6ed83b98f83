//! Per-owner execution context.

use rustc_hash::FxHashMap;

use crate::core::entity::EntityId;

/// Named entity lists bound by Choice nodes, plus a usage counter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapContext {
    variables: FxHashMap<String, Vec<EntityId>>,
    usage_count: u32,
}

impl SnapContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding.
    pub fn set_variable(&mut self, name: impl Into<String>, entities: Vec<EntityId>) {
        self.variables.insert(name.into(), entities);
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&[EntityId]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    /// Count one program run.
    pub fn ability_used(&mut self) {
        self.usage_count += 1;
    }

    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }
}
