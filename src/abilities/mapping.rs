//! Effect-to-action and trigger-to-listener tables.

use super::definition::{AbilityEffect, AbilityTrigger};
use crate::core::action::{Action, ActionKind, ActionTags};
use crate::core::entity::EntityId;
use crate::core::state::{GameState, Phase};
use crate::pipeline::{ActionFilter, ReactionTiming};
use crate::zones::Zone;

impl AbilityEffect {
    /// Action kind this effect produces, `None` if the effect has no mapping.
    ///
    /// `LosePower` and `ReduceCost` reuse the additive kinds; the sign lives
    /// in the amount.
    #[must_use]
    pub fn action_kind(self) -> Option<ActionKind> {
        use AbilityEffect as E;

        let kind = match self {
            E::GainPower | E::LosePower => ActionKind::GainPower,
            E::StealPower => ActionKind::StealPower,
            E::Draw => ActionKind::DrawCard,
            E::Discard => ActionKind::DiscardCard,
            E::Destroy => ActionKind::DestroyCard,
            E::Move => ActionKind::MoveCard,
            E::GainMaxEnergy => ActionKind::GainMaxEnergy,
            E::AddPowerToLocation => ActionKind::AddPowerToLocation,
            E::CreateCardInHand => ActionKind::CreateCardInHand,
            E::CreateCardInDeck => ActionKind::CreateCardInDeck,
            E::CreateCardInLocation => ActionKind::CreateCardInLocation,
            E::ReduceCost | E::IncreaseCost => ActionKind::IncreaseCost,
            E::Merge => ActionKind::MergeCards,
            E::Return => ActionKind::ReturnCard,
            E::AddCardToLocation => ActionKind::AddCardToLocation,
            E::AddCardToHand => ActionKind::AddCardToHand,
            E::SetPower => ActionKind::SetPower,
            E::AddKeyword => ActionKind::AddKeyword,
            E::AddTemporaryAbility => ActionKind::AddTemporaryAbility,
            E::Afflict | E::GainEnergy | E::LoseEnergy | E::RemoveAbility | E::SetCost | E::CopyAndActivate => {
                return None;
            }
        };
        Some(kind)
    }

    /// Effects that can wait for the next played card.
    #[must_use]
    pub fn targets_played_card(self) -> bool {
        use AbilityEffect as E;
        matches!(
            self,
            E::AddKeyword
                | E::Afflict
                | E::GainPower
                | E::LosePower
                | E::Destroy
                | E::Move
                | E::Return
                | E::Merge
                | E::SetPower
        )
    }

    /// Effects whose subject is the owner's player rather than resolved targets.
    #[must_use]
    pub fn is_player_scoped(self) -> bool {
        matches!(self, AbilityEffect::Draw | AbilityEffect::GainMaxEnergy)
    }
}

impl AbilityTrigger {
    /// Action filter and timing a live listener for this trigger uses.
    ///
    /// `None` for triggers that never register a listener: `OnReveal` and
    /// `Ongoing` activate directly, the off-board kinds never activate.
    #[must_use]
    pub fn listener(self) -> Option<(ActionFilter, ReactionTiming)> {
        use AbilityTrigger as T;
        use ReactionTiming::{Post, Pre};

        let listener = match self {
            T::BeforeCardPlayed => (ActionFilter::Kind(ActionKind::RevealCard), Pre),
            T::StartTurn => (ActionFilter::Kind(ActionKind::BeginPhase), Pre),
            T::EndTurn => (ActionFilter::Kind(ActionKind::EndPhase), Pre),
            T::AfterCardPlayed => (ActionFilter::Kind(ActionKind::RevealCard), Post),
            T::GameStart => (ActionFilter::Kind(ActionKind::BeginPhase), Post),
            T::EndGame => (ActionFilter::Kind(ActionKind::EndPhase), Post),
            T::Destroyed => (ActionFilter::Kind(ActionKind::DestroyCard), Post),
            T::Discarded => (ActionFilter::Kind(ActionKind::DiscardCard), Post),
            T::Moved => (ActionFilter::Kind(ActionKind::MoveCard), Post),
            T::Banished => (ActionFilter::Kind(ActionKind::MergeCards), Post),
            T::AfterAbilityTriggered => (ActionFilter::Tags(ActionTags::ABILITY_EFFECT), Post),
            T::OnCreated => (ActionFilter::Tags(ActionTags::CARD_CREATED), Post),
            T::OnReveal | T::Ongoing | T::InHand | T::InDeck | T::Activate | T::None => return None,
        };
        Some(listener)
    }

    /// Whether a listener registered at reveal should be installed for this trigger.
    #[must_use]
    pub fn listens_on_board(self) -> bool {
        !matches!(self, AbilityTrigger::AfterAbilityTriggered | AbilityTrigger::OnCreated)
            && self.listener().is_some()
    }

    /// Whether `action` is an occurrence of this trigger for `owner`.
    ///
    /// Filters narrow by action kind only; this checks the payload: phase
    /// listeners look at which phase moved, self-directed triggers look for
    /// the owner among the targets, and play triggers ignore the owner's own play.
    #[must_use]
    pub fn accepts(self, action: &Action, owner: EntityId, state: &GameState) -> bool {
        use AbilityTrigger as T;

        let on_board = matches!(state.zones.zone_of(owner), Some(Zone::Location(..)));
        match self {
            T::BeforeCardPlayed | T::AfterCardPlayed => on_board && !action.targets_entity(owner),
            T::StartTurn => on_board && action.phase == Some(Phase::Preparation),
            T::EndTurn => on_board && action.phase == Some(Phase::End),
            T::GameStart => on_board && action.phase == Some(Phase::Start),
            T::EndGame => on_board && action.phase == Some(Phase::End) && state.game_over,
            T::Destroyed | T::Discarded | T::Moved | T::Banished => action.targets_entity(owner),
            T::OnCreated => action.created.contains(&owner),
            T::AfterAbilityTriggered => true,
            T::OnReveal | T::Ongoing | T::InHand | T::InDeck | T::Activate | T::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_carrying_effects_share_kinds() {
        assert_eq!(AbilityEffect::LosePower.action_kind(), Some(ActionKind::GainPower));
        assert_eq!(AbilityEffect::ReduceCost.action_kind(), Some(ActionKind::IncreaseCost));
    }

    #[test]
    fn test_unmapped_effects() {
        for effect in [
            AbilityEffect::Afflict,
            AbilityEffect::GainEnergy,
            AbilityEffect::LoseEnergy,
            AbilityEffect::RemoveAbility,
            AbilityEffect::SetCost,
            AbilityEffect::CopyAndActivate,
        ] {
            assert_eq!(effect.action_kind(), None, "{effect:?}");
        }
        assert!(AbilityEffect::GainMaxEnergy.action_kind().is_some());
    }

    #[test]
    fn test_listener_timings() {
        let (filter, timing) = AbilityTrigger::BeforeCardPlayed.listener().unwrap();
        assert_eq!(filter, ActionFilter::Kind(ActionKind::RevealCard));
        assert_eq!(timing, ReactionTiming::Pre);

        let (_, timing) = AbilityTrigger::AfterCardPlayed.listener().unwrap();
        assert_eq!(timing, ReactionTiming::Post);

        let (_, timing) = AbilityTrigger::EndTurn.listener().unwrap();
        assert_eq!(timing, ReactionTiming::Pre);

        assert!(AbilityTrigger::OnReveal.listener().is_none());
        assert!(AbilityTrigger::Ongoing.listener().is_none());
        assert!(AbilityTrigger::InHand.listener().is_none());
    }

    #[test]
    fn test_chain_triggers_do_not_listen_on_board() {
        assert!(!AbilityTrigger::AfterAbilityTriggered.listens_on_board());
        assert!(!AbilityTrigger::OnCreated.listens_on_board());
        assert!(AbilityTrigger::Destroyed.listens_on_board());
    }
}
