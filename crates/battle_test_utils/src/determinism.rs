//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and saved battles only work if a setup and a command stream
//! always lead to the same state. Sources of non-determinism include:
//!
//! - **Floating-point math**: percentage modifiers use fixed-point
//!   arithmetic via [`battle_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always visited in squad order or sorted by id.
//!
//! - **System randomness**: every roll goes through the battle's injected
//!   [`battle_core::rng::BattleRng`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: attack resolution against scripted rolls
//! 2. **Property tests**: random setups still produce deterministic battles
//! 3. **Integration tests**: full battles and replays are reproducible
//! 4. **Parallel tests**: running N battles on threads all match

use std::sync::Arc;
use std::thread;

use battle_core::battle::{Battle, BattleCommand, BattleState};
use battle_core::data::BattleSetup;
use battle_core::events::ImmediateSink;
use battle_core::provider::UnitTypeProvider;

use crate::fixtures::autoplay;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps taken per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Acknowledge one pending event, or stand in for a human player when the
/// battle waits for a command. Does nothing once the battle is over.
///
/// # Panics
///
/// Panics if the battle rejects the acknowledgement or the command.
pub fn step_battle(battle: &mut Battle) {
    match battle.state() {
        BattleState::ProcessingUnitAction => {
            let sequence = battle
                .current_event()
                .map(|e| e.sequence)
                .expect("processing state always has a pending event");
            battle.complete_event(sequence).expect("in-order acknowledgement");
        }
        BattleState::WaitPlayerTurn => {
            autoplay_one(battle);
        }
        _ => {}
    }
}

fn autoplay_one(battle: &mut Battle) {
    let Some(unit) = battle.current_unit() else {
        return;
    };
    let command = battle
        .legal_targets()
        .first()
        .map_or(BattleCommand::Defend, |&target| BattleCommand::Attack { target });
    battle.submit_command(unit, command).expect("legal command");
}

/// Play `setup` to the end twice and compare the completion hashes.
///
/// # Panics
///
/// Panics if the battle cannot be built or played.
pub fn verify_battle_determinism(setup: &BattleSetup, provider: &Arc<dyn UnitTypeProvider>) -> bool {
    let run = || {
        let mut battle = Battle::new(setup.clone(), Arc::clone(provider)).expect("battle builds");
        autoplay(&mut battle, &mut ImmediateSink).expect("battle plays");
        battle.completion_hash()
    };
    let first = run();
    first.is_some() && first == run()
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Completion hash from each battle.
    pub hashes: Vec<Option<u64>>,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.iter().all(Option::is_some) && self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "Parallel battles diverged!\n\
             Battles: {}\n\
             All hashes: {:?}",
            self.num_battles,
            self.hashes
        );
    }
}

/// Run N copies of a battle on scoped threads and collect completion hashes.
///
/// # Panics
///
/// Panics if a battle cannot be built or a thread panics.
pub fn run_parallel_battles_scoped<F>(setup_fn: F, num_battles: usize) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    autoplay(&mut battle, &mut ImmediateSink).expect("battle plays");
                    battle.completion_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    ParallelBattleResult { hashes, num_battles }
}

/// Step two copies of a battle side by side, finding the first divergence.
///
/// # Returns
///
/// `None` if the battles stay identical for `max_steps` steps, `Some(step)`
/// if their state hashes differ after that step.
pub fn find_first_divergence<F>(setup_fn: F, max_steps: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    for step in 0..max_steps {
        if a.state_hash() != b.state_hash() {
            return Some(step);
        }
        if a.is_over() && b.is_over() {
            return None;
        }
        step_battle(&mut a);
        step_battle(&mut b);
    }
    None
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible setups from the
/// sample unit data.
pub mod strategies {
    use battle_core::config::BattleConfig;
    use battle_core::data::{BattleSetup, Controller, SquadSetup, UnitSetup};
    use battle_core::position::{Flank, Line};
    use battle_core::unit::PlayerId;
    use proptest::prelude::*;
    use proptest::sample::{select, subsequence};

    use crate::fixtures::SMALL_UNIT_TYPES;

    /// Every cell of a squad grid.
    fn cells() -> Vec<(Line, Flank)> {
        Line::ALL
            .iter()
            .flat_map(|&line| Flank::ALL.iter().map(move |&flank| (line, flank)))
            .collect()
    }

    /// Generate battle seeds.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a squad of 1 to 6 small sample units on distinct cells,
    /// numbered from `first_id`.
    pub fn arb_squad(player: u8, first_id: u32, controller: Controller) -> impl Strategy<Value = SquadSetup> {
        subsequence(cells(), 1..=6).prop_flat_map(move |cells| {
            let count = cells.len();
            proptest::collection::vec(select(SMALL_UNIT_TYPES), count).prop_map(move |types| {
                let units = cells
                    .iter()
                    .zip(types)
                    .zip(first_id..)
                    .map(|((&(line, flank), unit_type), id)| UnitSetup::new(id, unit_type, line, flank))
                    .collect();
                SquadSetup {
                    player: PlayerId(player),
                    controller,
                    units,
                }
            })
        })
    }

    /// Generate a computer-versus-computer battle.
    pub fn arb_battle_setup() -> impl Strategy<Value = BattleSetup> {
        (
            arb_seed(),
            arb_squad(0, 1, Controller::Computer),
            arb_squad(1, 11, Controller::Computer),
            0u32..30,
        )
            .prop_map(|(seed, attacker, defender, spread)| BattleSetup {
                seed,
                config: BattleConfig::default().with_initiative_spread(spread),
                attacker,
                defender,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_provider, skirmish};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 3, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![30]);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        assert!(verify_battle_determinism(&skirmish(), &sample_provider()));
    }

    #[test]
    fn test_step_by_step_matches() {
        let provider = sample_provider();
        let result = verify_determinism(
            2,
            200,
            || Battle::new(skirmish(), Arc::clone(&provider)).unwrap(),
            step_battle,
            Battle::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_find_divergence_on_same_setup() {
        let provider = sample_provider();
        let divergence = find_first_divergence(
            || Battle::new(skirmish(), Arc::clone(&provider)).unwrap(),
            10_000,
        );
        assert_eq!(divergence, None);
    }

    #[test]
    fn test_parallel_battles_match() {
        run_parallel_battles_scoped(|| Battle::new(skirmish(), sample_provider()).unwrap(), 4)
            .assert_deterministic();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any generated setup plays out the same way twice.
        #[test]
        fn prop_random_battles_are_deterministic(setup in strategies::arb_battle_setup()) {
            prop_assert!(verify_battle_determinism(&setup, &sample_provider()));
        }
    }
}
