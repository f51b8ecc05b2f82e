//! Property tests over generated battles.

use std::collections::{BTreeMap, HashSet};

use battle_core::battle::turn_order;
use battle_core::prelude::*;
use battle_test_utils::determinism::strategies::arb_battle_setup;
use battle_test_utils::fixtures::{sample_provider, sample_registry, RecordingSink};
use proptest::prelude::*;

/// Who held the turn during one round, and who was out of the fight at
/// some point of it.
#[derive(Default)]
struct RoundTrace {
    start: Option<Battlefield>,
    owners: Vec<UnitId>,
    inactive: HashSet<UnitId>,
}

/// Acknowledge every event of a computer battle, noting whose turn each
/// event belongs to.
fn trace_rounds(battle: &mut Battle, initial: Battlefield) -> BTreeMap<u32, RoundTrace> {
    let mut rounds: BTreeMap<u32, RoundTrace> = BTreeMap::new();
    rounds.entry(battle.round()).or_default().start = Some(initial);
    while let Some(event) = battle.current_event().copied() {
        let round = battle.round();
        let trace = rounds.entry(round).or_default();
        if let Some(unit) = battle.current_unit() {
            if trace.owners.last() != Some(&unit) {
                trace.owners.push(unit);
            }
        }
        trace.inactive.extend(
            battle
                .field()
                .units()
                .filter(|(_, u)| !u.is_active())
                .map(|(_, u)| u.id()),
        );
        let before = battle.field().clone();
        battle.complete_event(event.sequence).unwrap();
        if battle.round() != round {
            rounds.entry(battle.round()).or_default().start = Some(before);
        }
    }
    rounds
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_turn_order_lists_every_active_unit_once(setup in arb_battle_setup()) {
        let field = setup.build_field(&sample_registry()).unwrap();
        let mut rng = SeededRng::new(setup.seed);
        let order = turn_order(&field, setup.config.initiative_spread, &mut rng);

        let active: HashSet<UnitId> = field
            .units()
            .filter(|(_, u)| u.is_active())
            .map(|(_, u)| u.id())
            .collect();
        let listed: HashSet<UnitId> = order.iter().copied().collect();
        prop_assert_eq!(order.len(), listed.len());
        prop_assert_eq!(listed, active);
    }

    #[test]
    fn prop_turn_order_follows_initiative_without_spread(setup in arb_battle_setup()) {
        let field = setup.build_field(&sample_registry()).unwrap();
        let order = turn_order(&field, 0, &mut SeededRng::new(setup.seed));
        let initiative: Vec<u32> = order
            .iter()
            .map(|&id| field.unit(id).unwrap().initiative())
            .collect();
        prop_assert!(initiative.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_battles_end_within_round_limit(setup in arb_battle_setup()) {
        let max_rounds = setup.config.max_rounds;
        let mut battle = Battle::new(setup, sample_provider()).unwrap();
        let mut sink = RecordingSink::new();
        battle.drive(&mut sink).unwrap();

        prop_assert!(battle.is_over());
        prop_assert!(battle.round() <= max_rounds);
        prop_assert!(sink.events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        for (_, unit) in battle.field().units() {
            prop_assert!(unit.hit_points() <= unit.max_hit_points());
        }

        let outcome = battle.finish().unwrap();
        prop_assert_ne!(outcome.result, BattleResult::Aborted);
        for unit in &outcome.units {
            prop_assert_eq!(unit.fate == UnitFate::Died, unit.hit_points == 0);
        }
    }

    #[test]
    fn prop_replay_reproduces_generated_battle(setup in arb_battle_setup()) {
        let mut battle = Battle::new(setup, sample_provider()).unwrap();
        battle.drive(&mut ImmediateSink).unwrap();
        let replay = BattleReplay::record(&battle);
        prop_assert!(replay.verify(sample_provider()).unwrap());
    }

    #[test]
    fn prop_every_unit_takes_its_turn_once_per_round(setup in arb_battle_setup()) {
        let mut setup = setup;
        setup.config = setup.config.with_initiative_spread(0);
        let initial = setup.build_field(&sample_registry()).unwrap();
        let mut battle = Battle::new(setup, sample_provider()).unwrap();
        let rounds = trace_rounds(&mut battle, initial);
        prop_assert!(battle.is_over());
        let last = battle.round();

        for (round, trace) in &rounds {
            let start = trace.start.as_ref();
            prop_assert!(start.is_some(), "round {} has no starting state", round);
            let expected = turn_order(start.unwrap(), 0, &mut SeededRng::new(0));

            let mut remaining = expected.iter();
            for owner in &trace.owners {
                prop_assert!(
                    remaining.any(|id| id == owner),
                    "round {}: {} out of initiative order or twice in {:?}",
                    round,
                    owner,
                    expected
                );
            }
            if *round < last {
                for id in &expected {
                    prop_assert!(
                        trace.owners.contains(id) || trace.inactive.contains(id),
                        "round {}: {} never got its turn",
                        round,
                        id
                    );
                }
            }
        }
    }
}
