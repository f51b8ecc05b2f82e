//! Tunable battle rules.

use serde::{Deserialize, Serialize};

/// Rules a battle runs under.
///
/// Loaded from RON as part of a [`BattleSetup`](crate::data::BattleSetup);
/// every field may be omitted.
///
/// ```ron
/// BattleConfig(
///     max_rounds: 40,
///     initiative_spread: 10,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Rounds fought before the battle ends in a draw. 0 disables the limit.
    pub max_rounds: u32,
    /// Random initiative bonus rolled per unit and round, in percent of its
    /// initiative. 0 keeps the order fully stat-driven.
    pub initiative_spread: u32,
    /// Share of maximum hit points a revived unit comes back with.
    pub revive_hit_points_percent: u32,
    /// Share of dealt damage a drain attack heals its attacker for.
    pub drain_percent: u32,
    /// Chance in percent that frostbite costs its owner the turn.
    pub frostbite_skip_chance: u8,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_rounds: 40,
            initiative_spread: 0,
            revive_hit_points_percent: 50,
            drain_percent: 50,
            frostbite_skip_chance: 25,
        }
    }
}

impl BattleConfig {
    /// Builder method to set the round limit.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Builder method to set the initiative spread.
    #[must_use]
    pub fn with_initiative_spread(mut self, spread: u32) -> Self {
        self.initiative_spread = spread;
        self
    }

    /// Whether round `round` (1-based) is past the limit.
    #[must_use]
    pub const fn is_round_limit_exceeded(&self, round: u32) -> bool {
        self.max_rounds != 0 && round > self.max_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: BattleConfig = ron::from_str("(max_rounds: 5)").unwrap();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.drain_percent, 50);
        assert_eq!(config.initiative_spread, 0);
        assert_eq!(config.frostbite_skip_chance, 25);
    }

    #[test]
    fn test_round_limit() {
        let config = BattleConfig::default().with_max_rounds(3);
        assert!(!config.is_round_limit_exceeded(3));
        assert!(config.is_round_limit_exceeded(4));
        assert!(!BattleConfig::default()
            .with_max_rounds(0)
            .is_round_limit_exceeded(1000));
    }
}
