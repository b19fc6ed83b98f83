//! Action pipeline integration tests.
//!
//! These run the pipeline against a minimal host that records a trace, so
//! ordering can be checked without any game rules attached.

use std::rc::Rc;

use snap_engine::core::{Action, ActionKind, PlayerId};
use snap_engine::pipeline::{
    ActionFilter, ActionPipeline, Performed, PipelineHost, ReactionTiming, Step, SubscriptionId,
};

struct Host {
    pipeline: ActionPipeline<Host>,
    trace: Vec<String>,
    priority: PlayerId,
    victim: Option<SubscriptionId>,
}

impl PipelineHost for Host {
    fn pipeline(&self) -> &ActionPipeline<Self> {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut ActionPipeline<Self> {
        &mut self.pipeline
    }

    fn subscriber_rank(&self, owner: Option<PlayerId>) -> u8 {
        match owner {
            Some(player) if player == self.priority => 0,
            Some(_) => 1,
            None => 2,
        }
    }
}

fn host() -> Host {
    Host {
        pipeline: ActionPipeline::new(),
        trace: Vec::new(),
        priority: PlayerId::new(0),
        victim: None,
    }
}

fn log_perform(host: &mut Host, action: &mut Action) -> Performed {
    host.trace.push(format!("perform {:?}", action.kind));
    Performed::Done
}

fn attach_logging(host: &mut Host, kinds: &[ActionKind]) {
    for &kind in kinds {
        host.pipeline.attach_performer(kind, log_perform);
    }
}

/// Pre reactions finish before the performer, perform reactions before the
/// post subscribers, post reactions last.
#[test]
fn test_phase_order_with_nested_reactions() {
    let mut host = host();
    attach_logging(
        &mut host,
        &[ActionKind::GainPower, ActionKind::MoveCard, ActionKind::DestroyCard],
    );
    host.pipeline
        .attach_performer(ActionKind::DrawCard, |h: &mut Host, a: &mut Action| {
            h.trace.push(format!("perform {:?}", a.kind));
            h.pipeline.add_reaction(Action::new(ActionKind::MoveCard));
            Performed::Done
        });
    host.pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Pre, |h: &mut Host, a: &Action| {
            h.trace.push(format!("pre {:?}", a.kind));
            if a.kind == ActionKind::DrawCard {
                h.pipeline.add_reaction(Action::new(ActionKind::GainPower));
            }
        });
    host.pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Post, |h: &mut Host, a: &Action| {
            h.trace.push(format!("post {:?}", a.kind));
            if a.kind == ActionKind::DrawCard {
                h.pipeline.add_reaction(Action::new(ActionKind::DestroyCard));
            }
        });

    host.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();
    ActionPipeline::run(&mut host);

    let expected = [
        "pre DrawCard",
        "pre GainPower",
        "perform GainPower",
        "post GainPower",
        "perform DrawCard",
        "pre MoveCard",
        "perform MoveCard",
        "post MoveCard",
        "post DrawCard",
        "pre DestroyCard",
        "perform DestroyCard",
        "post DestroyCard",
    ];
    assert_eq!(host.trace, expected, "reactions should nest depth-first inside each phase");
    assert!(!host.pipeline.is_performing());
}

#[test]
fn test_depth_first_chain() {
    let mut host = host();
    attach_logging(
        &mut host,
        &[ActionKind::DrawCard, ActionKind::GainPower, ActionKind::SetPower],
    );
    host.pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Pre, |h: &mut Host, a: &Action| {
            let next = match a.kind {
                ActionKind::DrawCard => ActionKind::GainPower,
                ActionKind::GainPower => ActionKind::SetPower,
                _ => return,
            };
            h.pipeline.add_reaction(Action::new(next));
        });

    host.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();
    ActionPipeline::run(&mut host);

    assert_eq!(
        host.trace,
        ["perform SetPower", "perform GainPower", "perform DrawCard"],
        "the deepest reaction should perform first"
    );
}

#[test]
fn test_single_flight() {
    let mut host = host();
    attach_logging(&mut host, &[ActionKind::DrawCard]);

    let first = host.pipeline.perform(Action::new(ActionKind::DrawCard));
    let second = host.pipeline.perform(Action::new(ActionKind::DrawCard));
    assert!(first.is_some());
    assert!(second.is_none(), "a second top-level perform should be dropped");

    ActionPipeline::run(&mut host);
    assert_eq!(host.trace.len(), 1, "only the first submission should run");
    assert!(host.pipeline.is_finished(first.unwrap()));

    assert!(
        host.pipeline.perform(Action::new(ActionKind::DrawCard)).is_some(),
        "the pipeline should accept work again once idle"
    );
}

#[test]
fn test_waiting_performer_reports_waiting() {
    let mut host = host();
    host.pipeline
        .attach_performer(ActionKind::DrawCard, |_: &mut Host, _: &mut Action| Performed::Wait(2));
    let id = host.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();

    let steps: Vec<Step> = std::iter::from_fn(|| match ActionPipeline::step(&mut host) {
        Step::Idle => None,
        step => Some(step),
    })
    .collect();

    assert_eq!(steps.iter().filter(|s| **s == Step::Waiting).count(), 2);
    assert!(host.pipeline.is_finished(id));
}

#[test]
fn test_owned_subscribers_follow_rank() {
    let mut host = host();
    host.priority = PlayerId::new(1);

    host.pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Post, |h: &mut Host, _: &Action| {
            h.trace.push("system".into());
        });
    for player in [0u8, 1] {
        host.pipeline.subscribe_owned(
            ActionFilter::Kind(ActionKind::RevealCard),
            ReactionTiming::Post,
            PlayerId::new(player),
            Rc::new(move |h: &mut Host, _: &Action| h.trace.push(format!("player {player}"))),
        );
    }

    host.pipeline.perform(Action::new(ActionKind::RevealCard)).unwrap();
    ActionPipeline::run(&mut host);

    assert_eq!(
        host.trace,
        ["player 1", "player 0", "system"],
        "priority player's subscribers run first, system subscribers last"
    );
}

#[test]
fn test_unsubscribe_during_dispatch_round() {
    let mut host = host();
    host.pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Pre, |h: &mut Host, _: &Action| {
            h.trace.push("first".into());
            if let Some(id) = h.victim.take() {
                h.pipeline.unsubscribe(id);
            }
        });
    let second = host
        .pipeline
        .subscribe(ActionFilter::Any, ReactionTiming::Pre, |h: &mut Host, _: &Action| {
            h.trace.push("second".into());
        });
    host.victim = Some(second);

    host.pipeline.perform(Action::new(ActionKind::DrawCard)).unwrap();
    ActionPipeline::run(&mut host);

    assert_eq!(host.trace, ["first"], "a subscriber removed mid-round should not run");
    assert!(!host.pipeline.is_subscribed(second));
}

#[test]
fn test_tag_filter_matches_shared_tags() {
    let mut host = host();
    host.pipeline.subscribe(
        ActionFilter::Tags(snap_engine::core::ActionTags::POWER_CHANGED),
        ReactionTiming::Post,
        |h: &mut Host, a: &Action| h.trace.push(format!("{:?}", a.kind)),
    );

    for kind in [ActionKind::GainPower, ActionKind::DrawCard, ActionKind::MergeCards] {
        host.pipeline.perform(Action::new(kind)).unwrap();
        ActionPipeline::run(&mut host);
    }

    assert_eq!(host.trace, ["GainPower", "MergeCards"]);
}

#[test]
fn test_completion_runs_after_post_reactions() {
    let mut host = host();
    attach_logging(&mut host, &[ActionKind::DrawCard, ActionKind::GainPower]);
    host.pipeline.subscribe(
        ActionFilter::Kind(ActionKind::DrawCard),
        ReactionTiming::Post,
        |h: &mut Host, _: &Action| h.pipeline.add_reaction(Action::new(ActionKind::GainPower)),
    );

    host.pipeline
        .perform_then(Action::new(ActionKind::DrawCard), |h: &mut Host| h.trace.push("done".into()))
        .unwrap();
    ActionPipeline::run(&mut host);

    assert_eq!(host.trace, ["perform DrawCard", "perform GainPower", "done"]);
}
