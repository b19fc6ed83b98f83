//! Frame stepping.
//!
//! A frame walks `Pre -> DrainPre -> Perform -> [Waiting] -> DrainPerform ->
//! Post -> DrainPost`. Entering a drain stage moves that phase's reaction
//! list into the frame's queue; each queued reaction is pushed as a child
//! frame above its parent and must finish before the next one starts.

use std::collections::VecDeque;

use tracing::trace;

use super::{ActionPipeline, Performed, PipelineHost, ReactionTiming};
use crate::core::action::Action;

/// Outcome of one `ActionPipeline::step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Nothing is flowing.
    Idle,
    Advanced,
    /// A performer is suspended; time passed but no phase moved.
    Waiting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Pre,
    DrainPre,
    Perform,
    Waiting,
    DrainPerform,
    Post,
    DrainPost,
}

#[derive(Debug)]
pub(super) struct Frame {
    action: Action,
    stage: Stage,
    queue: VecDeque<Action>,
    wait: u32,
}

#[derive(Clone, Copy)]
enum Phase {
    Pre,
    Perform,
    Post,
}

impl Frame {
    pub(super) fn new(action: Action) -> Self {
        Self {
            action,
            stage: Stage::Pre,
            queue: VecDeque::new(),
            wait: 0,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Action> {
        match phase {
            Phase::Pre => &mut self.action.pre_reactions,
            Phase::Perform => &mut self.action.perform_reactions,
            Phase::Post => &mut self.action.post_reactions,
        }
    }

    /// Move a phase's reactions into the queue and start draining them.
    fn begin_drain(&mut self, phase: Phase) {
        self.queue = std::mem::take(self.list_mut(phase)).into();
        self.stage = match phase {
            Phase::Pre => Stage::DrainPre,
            Phase::Perform => Stage::DrainPerform,
            Phase::Post => Stage::DrainPost,
        };
    }
}

impl<H: PipelineHost> ActionPipeline<H> {
    /// Advance the flow in progress by one transition.
    pub fn step(host: &mut H) -> Step {
        let Some(mut frame) = host.pipeline_mut().frames.pop() else {
            return Step::Idle;
        };

        let outcome = match frame.stage {
            Stage::Pre => {
                Self::notify(host, &mut frame, ReactionTiming::Pre);
                frame.begin_drain(Phase::Pre);
                Step::Advanced
            }
            Stage::Perform => {
                Self::run_performer(host, &mut frame);
                Step::Advanced
            }
            Stage::Waiting => {
                frame.wait = frame.wait.saturating_sub(1);
                if frame.wait == 0 {
                    frame.begin_drain(Phase::Perform);
                }
                Step::Waiting
            }
            Stage::Post => {
                Self::notify(host, &mut frame, ReactionTiming::Post);
                frame.begin_drain(Phase::Post);
                Step::Advanced
            }
            Stage::DrainPre | Stage::DrainPerform | Stage::DrainPost => {
                if let Some(child) = frame.queue.pop_front() {
                    let pipeline = host.pipeline_mut();
                    pipeline.frames.push(frame);
                    pipeline.frames.push(Frame::new(child));
                    return Step::Advanced;
                }
                match frame.stage {
                    Stage::DrainPre => frame.stage = Stage::Perform,
                    Stage::DrainPerform => frame.stage = Stage::Post,
                    _ => {
                        Self::complete(host, frame);
                        return Step::Advanced;
                    }
                }
                Step::Advanced
            }
        };

        host.pipeline_mut().frames.push(frame);
        outcome
    }

    /// Step until nothing is flowing. Returns the number of steps taken.
    pub fn run(host: &mut H) -> usize {
        let mut steps = 0;
        while Self::step(host) != Step::Idle {
            steps += 1;
        }
        steps
    }

    fn notify(host: &mut H, frame: &mut Frame, timing: ReactionTiming) {
        let mut matched = host.pipeline().subscribers.matching(&frame.action, timing);
        matched.sort_by_key(|m| host.subscriber_rank(m.owner));

        let phase = match timing {
            ReactionTiming::Pre => Phase::Pre,
            ReactionTiming::Post => Phase::Post,
        };
        for m in matched {
            // An earlier handler in this round may have unsubscribed it.
            if !host.pipeline().subscribers.contains(m.id) {
                continue;
            }
            (m.handler)(host, &frame.action);
            Self::collect(host, frame, phase);
        }
    }

    fn run_performer(host: &mut H, frame: &mut Frame) {
        let performer = host.pipeline().performers.get(&frame.action.kind).cloned();
        let outcome = match performer {
            Some(performer) => {
                let outcome = performer(host, &mut frame.action);
                Self::collect(host, frame, Phase::Perform);
                outcome
            }
            None => {
                trace!(kind = ?frame.action.kind, "no performer attached");
                Performed::Done
            }
        };
        match outcome {
            Performed::Wait(ticks) if ticks > 0 => {
                frame.wait = ticks;
                frame.stage = Stage::Waiting;
            }
            _ => frame.begin_drain(Phase::Perform),
        }
    }

    /// Append reactions queued by the last handler to `phase`'s list.
    fn collect(host: &mut H, frame: &mut Frame, phase: Phase) {
        let pending = std::mem::take(&mut host.pipeline_mut().pending);
        frame.list_mut(phase).extend(pending);
    }

    fn complete(host: &mut H, frame: Frame) {
        trace!(kind = ?frame.action.kind, "flow complete");
        if !host.pipeline().frames.is_empty() {
            return;
        }
        let finished = host.pipeline_mut().in_flight.take();
        if let Some(on_complete) = finished.and_then(|f| f.on_complete) {
            on_complete(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionKind;
    use crate::pipeline::ActionFilter;

    struct Host {
        pipeline: ActionPipeline<Host>,
        trace: Vec<String>,
    }

    impl PipelineHost for Host {
        fn pipeline(&self) -> &ActionPipeline<Self> {
            &self.pipeline
        }

        fn pipeline_mut(&mut self) -> &mut ActionPipeline<Self> {
            &mut self.pipeline
        }
    }

    fn host() -> Host {
        Host {
            pipeline: ActionPipeline::new(),
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_step_idle_when_empty() {
        let mut h = host();
        assert_eq!(ActionPipeline::step(&mut h), Step::Idle);
    }

    #[test]
    fn test_waiting_performer_suspends() {
        let mut h = host();
        h.pipeline.attach_performer(ActionKind::DrawCard, |h: &mut Host, _: &mut Action| {
            h.trace.push("perform".into());
            Performed::Wait(2)
        });
        h.pipeline.subscribe(ActionFilter::Any, ReactionTiming::Post, |h: &mut Host, _: &Action| {
            h.trace.push("post".into());
        });

        let id = h.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();
        let mut waits = 0;
        loop {
            match ActionPipeline::step(&mut h) {
                Step::Idle => break,
                Step::Waiting => waits += 1,
                Step::Advanced => {}
            }
        }
        assert_eq!(waits, 2);
        assert_eq!(h.trace, vec!["perform", "post"]);
        assert!(h.pipeline.is_finished(id));
    }

    #[test]
    fn test_completion_callback_runs_once_idle() {
        let mut h = host();
        h.pipeline
            .perform_then(Action::new(ActionKind::EndPhase), |h: &mut Host| {
                let busy = h.pipeline.is_performing();
                h.trace.push(format!("done busy={busy}"));
            })
            .unwrap();
        ActionPipeline::run(&mut h);
        assert_eq!(h.trace, vec!["done busy=false"]);
    }

    #[test]
    fn test_reaction_outside_flow_is_dropped() {
        let mut h = host();
        h.pipeline.add_reaction(Action::new(ActionKind::DrawCard));
        assert!(!h.pipeline.is_performing());
        assert_eq!(ActionPipeline::step(&mut h), Step::Idle);
    }
}
