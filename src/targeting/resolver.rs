//! Target resolution.
//!
//! Turns declarative `AbilityTargetDefinition`s into concrete entity lists.
//! Per definition the steps are:
//!
//! 1. **Candidates** from the target kind, relative to the requesting card
//!    (its player, its board side) and the triggering action's payload.
//! 2. **Sort** by the sort key, ascending by group, with ties shuffled.
//! 3. **Range**: all, first, last, one at random, or the requirement-filtered
//!    variants of all/random.
//! 4. **Exclude self** if asked.
//!
//! Several definitions concatenate their results without deduplication.

use std::collections::BTreeMap;

use tracing::trace;

use super::requirement::is_requirement_met;
use crate::abilities::{AbilityAmount, AbilityTargetDefinition, AmountKind, TargetKind, TargetRange, TargetSort};
use crate::cards::ContainerKind;
use crate::core::action::Action;
use crate::core::entity::EntityId;
use crate::core::state::GameState;
use crate::snap::SnapContext;
use crate::zones::Zone;

/// Inputs shared by every definition in one resolution.
#[derive(Clone, Copy, Debug)]
pub struct TargetQuery<'a> {
    pub owner: EntityId,
    pub triggered: Option<&'a Action>,
    /// Variables bound by Choice nodes, read by `Chosen` targets.
    pub vars: Option<&'a SnapContext>,
}

impl<'a> TargetQuery<'a> {
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            triggered: None,
            vars: None,
        }
    }

    #[must_use]
    pub fn triggered_by(mut self, action: Option<&'a Action>) -> Self {
        self.triggered = action;
        self
    }

    #[must_use]
    pub fn with_vars(mut self, vars: Option<&'a SnapContext>) -> Self {
        self.vars = vars;
        self
    }
}

/// Stateless resolver; all state comes from the `GameState` passed in.
pub struct TargetResolver;

impl TargetResolver {
    /// Resolve and concatenate every definition in `defs`.
    pub fn get_targets(
        state: &mut GameState,
        defs: &[AbilityTargetDefinition],
        query: TargetQuery<'_>,
    ) -> Vec<EntityId> {
        let mut targets = Vec::new();
        for def in defs {
            targets.extend(Self::resolve(state, def, query));
        }
        targets
    }

    /// Resolve a single definition.
    pub fn resolve(state: &mut GameState, def: &AbilityTargetDefinition, query: TargetQuery<'_>) -> Vec<EntityId> {
        let candidates = Self::candidates(state, &def.target, query);
        let sorted = Self::sort(state, candidates, def.target_sort);
        let mut result = Self::apply_range(state, def, sorted);
        if def.exclude_self {
            result.retain(|&e| e != query.owner);
        }
        trace!(target = ?def.target, count = result.len(), "resolved targets");
        result
    }

    fn candidates(state: &GameState, kind: &TargetKind, query: TargetQuery<'_>) -> Vec<EntityId> {
        use TargetKind as K;

        let owner = query.owner;
        let Some(player) = state.owner_of(owner) else {
            return Vec::new();
        };
        let enemy = player.opponent();
        let position = state.side_of(owner).map(|(position, _)| position);

        let side = |p| -> Vec<EntityId> {
            position.map_or_else(Vec::new, |pos| state.cards_at(pos, p).to_vec())
        };
        let location = |p| -> Vec<EntityId> {
            position
                .and_then(|pos| state.location_entity(pos, p))
                .into_iter()
                .collect()
        };
        let all_locations = |p| -> Vec<EntityId> {
            state
                .positions()
                .filter_map(|pos| state.location_entity(pos, p))
                .collect()
        };

        match kind {
            K::SelfCard => vec![owner],
            K::Deck => state.deck(player).to_vec(),
            K::Hand => state.hand(player).to_vec(),
            K::EnemyDeck => state.deck(enemy).to_vec(),
            K::EnemyHand => state.hand(enemy).to_vec(),
            K::PlayerDirectLocationCards => side(player),
            K::EnemyDirectLocationCards => side(enemy),
            K::AllDirectLocationCards => {
                let mut cards = side(player);
                cards.extend(side(enemy));
                cards
            }
            K::AllPlayerCards => state.live_cards(player),
            K::AllEnemyCards => state.live_cards(enemy),
            K::AllPlayerPlayedCards => state.board_cards(player),
            K::AllEnemyPlayedCards => state.board_cards(enemy),
            K::AllPlayedCards => {
                let mut cards = state.board_cards(player);
                cards.extend(state.board_cards(enemy));
                cards
            }
            K::PlayerDirectLocation => location(player),
            K::AllPlayerLocation => all_locations(player),
            K::EnemyDirectLocation => location(enemy),
            K::AllEnemyLocation => all_locations(enemy),
            K::DirectLocation => {
                let mut sides = location(player);
                sides.extend(location(enemy));
                sides
            }
            K::AllLocation => {
                let mut sides = all_locations(player);
                sides.extend(all_locations(enemy));
                sides
            }
            K::NextPlayedCard => state.next_played_card(owner).into_iter().collect(),
            K::TriggeredActionTargets => query
                .triggered
                .map_or_else(Vec::new, |a| a.targets.to_vec()),
            K::TriggeredActionSource => query
                .triggered
                .and_then(|a| a.owner)
                .into_iter()
                .collect(),
            K::CreatedCard => query
                .triggered
                .map_or_else(Vec::new, |a| a.created.clone()),
            K::PlayerHandContainer => state
                .container_entity(ContainerKind::Hand, player)
                .into_iter()
                .collect(),
            K::PlayerDeckContainer => state
                .container_entity(ContainerKind::Deck, player)
                .into_iter()
                .collect(),
            K::Player => vec![EntityId::player(player)],
            K::EnemyPlayer => vec![EntityId::player(enemy)],
            K::Chosen(name) => query
                .vars
                .and_then(|vars| vars.variable(name))
                .map_or_else(Vec::new, <[EntityId]>::to_vec),
        }
    }

    /// Group by sort key ascending; shuffle within each group.
    fn sort(state: &mut GameState, candidates: Vec<EntityId>, sort: TargetSort) -> Vec<EntityId> {
        if sort == TargetSort::None || candidates.len() < 2 {
            return candidates;
        }
        let mut groups: BTreeMap<i64, Vec<EntityId>> = BTreeMap::new();
        for entity in candidates {
            groups
                .entry(Self::sort_key(state, entity, sort))
                .or_default()
                .push(entity);
        }
        let mut sorted = Vec::new();
        for (_, mut group) in groups {
            state.rng.shuffle(&mut group);
            sorted.extend(group);
        }
        sorted
    }

    fn sort_key(state: &GameState, entity: EntityId, sort: TargetSort) -> i64 {
        let card = state.card(entity);
        match sort {
            TargetSort::None => 0,
            TargetSort::Power => state.power_of(entity),
            TargetSort::BaseCost => card.map_or(0, |c| c.base_cost()),
            TargetSort::CurrentCost => card.map_or(0, |c| c.cost()),
            TargetSort::PlayedOrder => card
                .and_then(|c| c.played_order)
                .map_or(i64::MAX, i64::from),
            TargetSort::LocationOrder => match state.zones.zone_of(entity) {
                Some(Zone::Location(..)) => state.zones.index_of(entity).map_or(0, |i| i as i64),
                _ => 0,
            },
        }
    }

    fn apply_range(state: &mut GameState, def: &AbilityTargetDefinition, candidates: Vec<EntityId>) -> Vec<EntityId> {
        if candidates.is_empty() {
            return candidates;
        }
        match def.target_range {
            TargetRange::None | TargetRange::All => candidates,
            TargetRange::First => candidates.first().copied().into_iter().collect(),
            TargetRange::Last => candidates.last().copied().into_iter().collect(),
            TargetRange::Random => state.rng.choose(&candidates).copied().into_iter().collect(),
            TargetRange::AllRequirementsMet => Self::meeting_requirements(state, def, candidates),
            TargetRange::RandomRequirementsMet => {
                let met = Self::meeting_requirements(state, def, candidates);
                state.rng.choose(&met).copied().into_iter().collect()
            }
        }
    }

    fn meeting_requirements(state: &GameState, def: &AbilityTargetDefinition, candidates: Vec<EntityId>) -> Vec<EntityId> {
        candidates
            .into_iter()
            .filter(|&candidate| {
                def.target_requirement
                    .iter()
                    .all(|req| is_requirement_met(state, req, &[candidate]))
            })
            .collect()
    }

    /// Numeric value of an amount, relative to `query.owner`.
    ///
    /// `ForEachTarget` counts its nested target spec and multiplies;
    /// booleans read as 0/1; card names and unparseable payloads read as 0.
    pub fn amount_value(state: &mut GameState, amount: &AbilityAmount, query: TargetQuery<'_>) -> i64 {
        match amount.kind {
            AmountKind::Constant => amount.as_int().unwrap_or(0),
            AmountKind::Boolean => i64::from(amount.as_bool().unwrap_or(false)),
            AmountKind::CardId => 0,
            AmountKind::ForEachTarget => match amount.for_each() {
                Some(spec) => {
                    let count = Self::resolve(state, &spec.target, query).len() as i64;
                    count * spec.value
                }
                None => 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinition;
    use crate::core::{EngineConfig, LocationPosition, PlayerId};
    use crate::zones::ZonePosition;
    use std::rc::Rc;

    const P0: PlayerId = PlayerId(0);
    const P1: PlayerId = PlayerId(1);
    const LEFT: LocationPosition = LocationPosition(0);
    const MID: LocationPosition = LocationPosition(1);

    struct Board {
        state: GameState,
        owner: EntityId,
        ally: EntityId,
        enemies: Vec<EntityId>,
        far_enemy: EntityId,
    }

    fn board() -> Board {
        let mut state = GameState::new(&EngineConfig::default());
        let card = |name: &str, power| Rc::new(CardDefinition::new(name, 1, power));
        let owner = state.spawn_card(card("Owner", 2), P0, Zone::Location(LEFT, P0), ZonePosition::Top);
        let ally = state.spawn_card(card("Ally", 3), P0, Zone::Location(LEFT, P0), ZonePosition::Top);
        let enemies = vec![
            state.spawn_card(card("E5", 5), P1, Zone::Location(LEFT, P1), ZonePosition::Top),
            state.spawn_card(card("E1", 1), P1, Zone::Location(LEFT, P1), ZonePosition::Top),
        ];
        let far_enemy = state.spawn_card(card("Far", 4), P1, Zone::Location(MID, P1), ZonePosition::Top);
        state.spawn_card(card("InHand", 9), P1, Zone::Hand(P1), ZonePosition::Top);
        Board {
            state,
            owner,
            ally,
            enemies,
            far_enemy,
        }
    }

    fn resolve(b: &mut Board, def: AbilityTargetDefinition) -> Vec<EntityId> {
        TargetResolver::resolve(&mut b.state, &def, TargetQuery::new(b.owner))
    }

    #[test]
    fn test_direct_location_cards() {
        let mut b = board();
        let own = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::PlayerDirectLocationCards));
        assert_eq!(own, vec![b.owner, b.ally]);

        let enemy = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::EnemyDirectLocationCards));
        assert_eq!(enemy, b.enemies);
    }

    #[test]
    fn test_exclude_self() {
        let mut b = board();
        let def = AbilityTargetDefinition::new(TargetKind::PlayerDirectLocationCards).excluding_self();
        assert_eq!(resolve(&mut b, def), vec![b.ally]);
    }

    #[test]
    fn test_played_vs_live_cards() {
        let mut b = board();
        let played = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::AllEnemyPlayedCards));
        assert_eq!(played.len(), 3);
        assert!(played.contains(&b.far_enemy));

        let live = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::AllEnemyCards));
        assert_eq!(live.len(), 4);
    }

    #[test]
    fn test_sort_then_first_and_last() {
        let mut b = board();
        let lowest = AbilityTargetDefinition::new(TargetKind::AllEnemyPlayedCards)
            .with_sort(TargetSort::Power)
            .with_range(TargetRange::First);
        assert_eq!(resolve(&mut b, lowest), vec![b.enemies[1]]);

        let highest = AbilityTargetDefinition::new(TargetKind::AllEnemyPlayedCards)
            .with_sort(TargetSort::Power)
            .with_range(TargetRange::Last);
        assert_eq!(resolve(&mut b, highest), vec![b.enemies[0]]);
    }

    #[test]
    fn test_requirement_range() {
        use crate::abilities::{AbilityRequirement, Comparator, RequirementType};

        let mut b = board();
        let def = AbilityTargetDefinition::new(TargetKind::AllEnemyPlayedCards)
            .with_range(TargetRange::AllRequirementsMet)
            .with_requirement(AbilityRequirement::new(
                RequirementType::Power,
                Comparator::GreaterOrEqual,
                AbilityAmount::constant(4),
            ));
        let result = resolve(&mut b, def);
        assert_eq!(result, vec![b.enemies[0], b.far_enemy]);
    }

    #[test]
    fn test_empty_candidates_short_circuit() {
        let mut b = board();
        let def = AbilityTargetDefinition::new(TargetKind::NextPlayedCard).with_range(TargetRange::Random);
        assert!(resolve(&mut b, def).is_empty());
    }

    #[test]
    fn test_locations_and_players() {
        let mut b = board();
        let direct = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::DirectLocation));
        assert_eq!(
            direct,
            vec![
                b.state.location_entity(LEFT, P0).unwrap(),
                b.state.location_entity(LEFT, P1).unwrap(),
            ]
        );
        let all = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::AllLocation));
        assert_eq!(all.len(), 6);

        let enemy = resolve(&mut b, AbilityTargetDefinition::new(TargetKind::EnemyPlayer));
        assert_eq!(enemy, vec![EntityId::player(P1)]);
    }

    #[test]
    fn test_triggered_payloads() {
        let mut b = board();
        let mut action = Action::new(crate::core::ActionKind::CreateCardInHand).with_owner(b.ally);
        action.targets.push(b.far_enemy);
        action.created.push(b.enemies[0]);
        let query = TargetQuery::new(b.owner).triggered_by(Some(&action));

        let targets = TargetResolver::resolve(&mut b.state, &AbilityTargetDefinition::new(TargetKind::TriggeredActionTargets), query);
        assert_eq!(targets, vec![b.far_enemy]);
        let source = TargetResolver::resolve(&mut b.state, &AbilityTargetDefinition::new(TargetKind::TriggeredActionSource), query);
        assert_eq!(source, vec![b.ally]);
        let created = TargetResolver::resolve(&mut b.state, &AbilityTargetDefinition::new(TargetKind::CreatedCard), query);
        assert_eq!(created, vec![b.enemies[0]]);
    }

    #[test]
    fn test_chosen_reads_context() {
        let mut b = board();
        let mut vars = SnapContext::default();
        vars.set_variable("pick", vec![b.far_enemy]);
        let query = TargetQuery::new(b.owner).with_vars(Some(&vars));
        let def = AbilityTargetDefinition::new(TargetKind::Chosen("pick".into()));
        assert_eq!(TargetResolver::resolve(&mut b.state, &def, query), vec![b.far_enemy]);

        let unbound = AbilityTargetDefinition::new(TargetKind::Chosen("other".into()));
        assert!(TargetResolver::resolve(&mut b.state, &unbound, query).is_empty());
    }

    #[test]
    fn test_for_each_amount() {
        let mut b = board();
        let amount = AbilityAmount::for_each_target(AbilityTargetDefinition::new(TargetKind::EnemyDirectLocationCards), 2);
        assert_eq!(TargetResolver::amount_value(&mut b.state, &amount, TargetQuery::new(b.owner)), 4);
        assert_eq!(
            TargetResolver::amount_value(&mut b.state, &AbilityAmount::constant(-2), TargetQuery::new(b.owner)),
            -2
        );
    }

    #[test]
    fn test_multiple_definitions_concatenate() {
        let mut b = board();
        let defs = vec![
            AbilityTargetDefinition::new(TargetKind::SelfCard),
            AbilityTargetDefinition::new(TargetKind::PlayerDirectLocationCards),
        ];
        let targets = TargetResolver::get_targets(&mut b.state, &defs, TargetQuery::new(b.owner));
        assert_eq!(targets, vec![b.owner, b.owner, b.ally]);
    }
}
