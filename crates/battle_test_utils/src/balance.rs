//! Balance testing utilities.
//!
//! Runs the same matchup under many seeds with both squads on the AI and
//! collects who wins and how long it takes.

use std::sync::Arc;

use battle_core::battle::Battle;
use battle_core::data::BattleSetup;
use battle_core::error::Result;
use battle_core::events::ImmediateSink;
use battle_core::outcome::{BattleOutcome, BattleResult};
use battle_core::provider::UnitTypeProvider;
use battle_core::squad::SquadSide;

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchupStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Wins for the attacking squad.
    pub attacker_wins: u32,
    /// Wins for the defending squad.
    pub defender_wins: u32,
    /// Draws (round limit or mutual destruction).
    pub draws: u32,
    /// Rounds summed over all battles.
    pub total_rounds: u64,
}

impl MatchupStats {
    /// Add one finished battle.
    pub fn record(&mut self, outcome: &BattleOutcome) {
        self.total_battles += 1;
        self.total_rounds += u64::from(outcome.rounds);
        match outcome.result {
            BattleResult::Victory(SquadSide::Attacker) => self.attacker_wins += 1,
            BattleResult::Victory(SquadSide::Defender) => self.defender_wins += 1,
            BattleResult::Draw | BattleResult::Aborted => self.draws += 1,
        }
    }

    /// Win rate of the attacker (0.0 to 1.0).
    pub fn win_rate_attacker(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.attacker_wins) / f64::from(self.total_battles)
    }

    /// Win rate of the defender (0.0 to 1.0).
    pub fn win_rate_defender(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.defender_wins) / f64::from(self.total_battles)
    }

    /// Average rounds per battle.
    pub fn avg_rounds(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.0;
        }
        self.total_rounds as f64 / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (attacker win rate within range).
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_attacker();
        rate >= min_rate && rate <= max_rate
    }
}

/// Play `setup` once per seed with both squads on the AI.
///
/// # Errors
///
/// Returns the first error a battle raises.
pub fn run_matchup(
    setup: &BattleSetup,
    provider: &Arc<dyn UnitTypeProvider>,
    seeds: impl IntoIterator<Item = u64>,
) -> Result<MatchupStats> {
    let mut stats = MatchupStats::default();
    for seed in seeds {
        let mut setup = setup.clone();
        setup.seed = seed;
        setup.all_computer();
        let mut battle = Battle::new(setup, Arc::clone(provider))?;
        battle.drive(&mut ImmediateSink)?;
        let outcome = battle.finish()?;
        tracing::debug!(seed, result = ?outcome.result, rounds = outcome.rounds, "Matchup battle finished");
        stats.record(outcome);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, sample_provider, skirmish};
    use battle_core::data::Controller;

    #[test]
    fn test_stats_win_rate() {
        let mut stats = MatchupStats::default();
        assert!((stats.win_rate_attacker() - 0.5).abs() < f64::EPSILON);
        for (result, rounds) in [
            (BattleResult::Victory(SquadSide::Attacker), 3),
            (BattleResult::Victory(SquadSide::Attacker), 5),
            (BattleResult::Victory(SquadSide::Defender), 4),
            (BattleResult::Draw, 40),
        ] {
            stats.record(&BattleOutcome {
                result,
                rounds,
                units: Vec::new(),
            });
        }
        assert_eq!(stats.total_battles, 4);
        assert!((stats.win_rate_attacker() - 0.5).abs() < f64::EPSILON);
        assert!((stats.win_rate_defender() - 0.25).abs() < f64::EPSILON);
        assert!((stats.avg_rounds() - 13.0).abs() < f64::EPSILON);
        assert!(stats.is_balanced(0.4, 0.6));
    }

    #[test]
    fn test_ogre_beats_goblin() {
        let stats = run_matchup(
            &duel(0, "ogre", "goblin", Controller::Human),
            &sample_provider(),
            0..20,
        )
        .unwrap();
        assert_eq!(stats.total_battles, 20);
        assert!(stats.attacker_wins > stats.defender_wins);
    }

    #[test]
    fn test_skirmish_always_ends() {
        let stats = run_matchup(&skirmish(), &sample_provider(), 0..10).unwrap();
        assert_eq!(stats.total_battles, 10);
        assert!(stats.total_rounds <= 400);
    }
}
