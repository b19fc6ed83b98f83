//! Subscriber table owned by one pipeline instance.

use std::fmt;

use super::{ActionFilter, Reaction, ReactionTiming, SubscriptionId};
use crate::core::action::Action;
use crate::core::player::PlayerId;

struct Subscription<H> {
    id: SubscriptionId,
    filter: ActionFilter,
    timing: ReactionTiming,
    owner: Option<PlayerId>,
    handler: Reaction<H>,
}

/// A matched subscriber, cloned out of the table for dispatch.
pub(crate) struct Matched<H> {
    pub id: SubscriptionId,
    pub owner: Option<PlayerId>,
    pub handler: Reaction<H>,
}

/// Subscribers in registration order.
pub struct SubscriberTable<H> {
    entries: Vec<Subscription<H>>,
    next_id: u64,
}

impl<H> Default for SubscriberTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<H> fmt::Debug for SubscriberTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberTable")
            .field("len", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<H> SubscriberTable<H> {
    pub fn insert(
        &mut self,
        filter: ActionFilter,
        timing: ReactionTiming,
        owner: Option<PlayerId>,
        handler: Reaction<H>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Subscription {
            id,
            filter,
            timing,
            owner,
            handler,
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|s| s.id == id)
    }

    /// Snapshot of subscribers for `action` at `timing`, in registration order.
    pub(crate) fn matching(&self, action: &Action, timing: ReactionTiming) -> Vec<Matched<H>> {
        self.entries
            .iter()
            .filter(|s| s.timing == timing && s.filter.matches(action))
            .map(|s| Matched {
                id: s.id,
                owner: s.owner,
                handler: s.handler.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
