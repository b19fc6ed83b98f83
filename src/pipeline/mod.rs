//! Action pipeline: ordered pre/perform/post execution with nested reactions.
//!
//! ## Design Philosophy
//!
//! The pipeline is an explicit state machine rather than a call stack. Each
//! submitted action becomes a frame; `ActionPipeline::step` advances the top
//! frame by one transition. Reactions queued during a phase become child
//! frames that run to completion (all three of their phases) before the
//! parent's phase is considered drained, so resolution is depth-first.
//!
//! Handlers receive the host (`&mut H`) rather than the pipeline, so they can
//! read and mutate game state and queue reactions. The pipeline is generic
//! over the host so it can be exercised without an engine.
//!
//! ## Single flight
//!
//! At most one top-level `perform` is in flight. A second call while busy is
//! dropped and returns `None`; callers poll `is_performing` first.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use snap_engine::core::{Action, ActionKind};
//! use snap_engine::pipeline::{ActionPipeline, Performed, PipelineHost};
//!
//! struct Host {
//!     pipeline: ActionPipeline<Host>,
//!     log: Vec<ActionKind>,
//! }
//!
//! impl PipelineHost for Host {
//!     fn pipeline(&self) -> &ActionPipeline<Self> { &self.pipeline }
//!     fn pipeline_mut(&mut self) -> &mut ActionPipeline<Self> { &mut self.pipeline }
//! }
//!
//! let mut host = Host { pipeline: ActionPipeline::new(), log: Vec::new() };
//! host.pipeline.attach_performer(ActionKind::DrawCard, |h: &mut Host, a: &mut Action| {
//!     h.log.push(a.kind);
//!     Performed::Done
//! });
//!
//! let id = host.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();
//! assert!(host.pipeline.perform(Action::new(ActionKind::DrawCard)).is_none());
//! ActionPipeline::run(&mut host);
//! assert!(host.pipeline.is_finished(id));
//! assert_eq!(host.log, vec![ActionKind::DrawCard]);
//! ```

mod flow;
pub mod registry;

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::action::{Action, ActionKind, ActionTags};
use crate::core::player::PlayerId;

pub use flow::Step;
use flow::Frame;
pub use registry::SubscriberTable;

/// When a subscriber runs relative to the performer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionTiming {
    Pre,
    Post,
}

/// Which actions a subscriber sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionFilter {
    Kind(ActionKind),
    /// Any action sharing at least one tag.
    Tags(ActionTags),
    Any,
}

impl ActionFilter {
    #[must_use]
    pub fn matches(&self, action: &Action) -> bool {
        match self {
            ActionFilter::Kind(kind) => action.kind == *kind,
            ActionFilter::Tags(tags) => action.tags().intersects(*tags),
            ActionFilter::Any => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Handle for one top-level `perform` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(pub u64);

/// Result of running a performer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Performed {
    Done,
    /// Suspend the perform phase for this many steps before draining it.
    Wait(u32),
}

pub type Reaction<H> = Rc<dyn Fn(&mut H, &Action)>;
pub type Performer<H> = Rc<dyn Fn(&mut H, &mut Action) -> Performed>;
type Completion<H> = Box<dyn FnOnce(&mut H)>;

/// Owner of a pipeline. Handlers get the host, not the pipeline.
pub trait PipelineHost: Sized + 'static {
    fn pipeline(&self) -> &ActionPipeline<Self>;

    fn pipeline_mut(&mut self) -> &mut ActionPipeline<Self>;

    /// Dispatch rank of a subscriber owned by `owner`; lower runs first.
    /// Ties keep registration order.
    fn subscriber_rank(&self, _owner: Option<PlayerId>) -> u8 {
        0
    }
}

struct InFlight<H> {
    id: SubmissionId,
    on_complete: Option<Completion<H>>,
}

/// Instance-owned action pipeline.
pub struct ActionPipeline<H> {
    subscribers: SubscriberTable<H>,
    performers: FxHashMap<ActionKind, Performer<H>>,
    frames: Vec<Frame>,
    /// Reactions queued by the handler currently running.
    pending: Vec<Action>,
    in_flight: Option<InFlight<H>>,
    next_submission: u64,
}

impl<H> Default for ActionPipeline<H> {
    fn default() -> Self {
        Self {
            subscribers: SubscriberTable::default(),
            performers: FxHashMap::default(),
            frames: Vec::new(),
            pending: Vec::new(),
            in_flight: None,
            next_submission: 0,
        }
    }
}

impl<H> fmt::Debug for ActionPipeline<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionPipeline")
            .field("subscribers", &self.subscribers)
            .field("performers", &self.performers.len())
            .field("depth", &self.frames.len())
            .field("busy", &self.in_flight.is_some())
            .finish()
    }
}

impl<H> ActionPipeline<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a top-level action. Dropped (returns `None`) while another is in flight.
    pub fn perform(&mut self, action: Action) -> Option<SubmissionId> {
        self.submit(action, None)
    }

    /// Like `perform`, running `on_complete` once the flow finishes.
    pub fn perform_then(
        &mut self,
        action: Action,
        on_complete: impl FnOnce(&mut H) + 'static,
    ) -> Option<SubmissionId> {
        self.submit(action, Some(Box::new(on_complete)))
    }

    fn submit(&mut self, action: Action, on_complete: Option<Completion<H>>) -> Option<SubmissionId> {
        if self.in_flight.is_some() {
            debug!(kind = ?action.kind, "perform dropped: pipeline busy");
            return None;
        }
        let id = SubmissionId(self.next_submission);
        self.next_submission += 1;
        debug!(kind = ?action.kind, submission = id.0, "perform");
        self.frames.push(Frame::new(action));
        self.in_flight = Some(InFlight { id, on_complete });
        Some(id)
    }

    /// Queue a reaction into the phase that is currently flowing.
    ///
    /// Outside a flow there is no phase to join; the action is logged and dropped.
    pub fn add_reaction(&mut self, action: Action) {
        if self.in_flight.is_none() {
            warn!(kind = ?action.kind, "reaction dropped: no action is flowing");
            return;
        }
        self.pending.push(action);
    }

    #[must_use]
    pub fn is_performing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True once submission `id` has run all of its phases.
    #[must_use]
    pub fn is_finished(&self, id: SubmissionId) -> bool {
        id.0 < self.next_submission && self.in_flight.as_ref().map(|f| f.id) != Some(id)
    }

    /// Nesting depth of the flow in progress.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // === Registration ===

    pub fn subscribe(
        &mut self,
        filter: ActionFilter,
        timing: ReactionTiming,
        handler: impl Fn(&mut H, &Action) + 'static,
    ) -> SubscriptionId {
        self.subscribers.insert(filter, timing, None, Rc::new(handler))
    }

    /// Subscribe on behalf of a player's card, for cross-owner ordering.
    pub fn subscribe_owned(
        &mut self,
        filter: ActionFilter,
        timing: ReactionTiming,
        owner: PlayerId,
        handler: Reaction<H>,
    ) -> SubscriptionId {
        self.subscribers.insert(filter, timing, Some(owner), handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.contains(id)
    }

    #[must_use]
    pub fn subscribers(&self) -> &SubscriberTable<H> {
        &self.subscribers
    }

    /// Attach the performer for `kind`, replacing any previous one.
    pub fn attach_performer(
        &mut self,
        kind: ActionKind,
        performer: impl Fn(&mut H, &mut Action) -> Performed + 'static,
    ) {
        self.performers.insert(kind, Rc::new(performer));
    }

    pub fn detach_performer(&mut self, kind: ActionKind) -> bool {
        self.performers.remove(&kind).is_some()
    }

    #[must_use]
    pub fn has_performer(&self, kind: ActionKind) -> bool {
        self.performers.contains_key(&kind)
    }
}
