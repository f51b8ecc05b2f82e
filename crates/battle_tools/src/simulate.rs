//! Headless battle runner.

use std::sync::Arc;

use battle_core::battle::Battle;
use battle_core::data::BattleSetup;
use battle_core::events::{PresentationSink, UnitActionEvent};
use battle_core::outcome::BattleOutcome;
use battle_core::provider::UnitTypeProvider;
use battle_core::replay::BattleReplay;

use crate::error::{Result, ToolError};

/// Sink that writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    presented: u64,
}

impl LogSink {
    /// Events presented so far.
    #[must_use]
    pub const fn presented(&self) -> u64 {
        self.presented
    }
}

impl PresentationSink for LogSink {
    fn present(&mut self, event: &UnitActionEvent) {
        self.presented += 1;
        match (event.power, event.duration) {
            (Some(power), Some(duration)) => {
                tracing::info!(unit = %event.unit, action = ?event.action, power, duration, "Event");
            }
            (Some(power), None) => tracing::info!(unit = %event.unit, action = ?event.action, power, "Event"),
            _ => tracing::info!(unit = %event.unit, action = ?event.action, "Event"),
        }
    }
}

/// Play a battle with both squads on the AI.
///
/// Returns the outcome and a replay of the battle.
///
/// # Errors
///
/// Returns an error if the battle cannot be built or fails while running.
pub fn simulate(
    mut setup: BattleSetup,
    provider: Arc<dyn UnitTypeProvider>,
    sink: &mut dyn PresentationSink,
) -> Result<(BattleOutcome, BattleReplay)> {
    setup.all_computer();
    let mut battle = Battle::new(setup, provider)?;
    battle.drive(sink)?;
    let replay = BattleReplay::record(&battle);
    let outcome = battle.finish()?.clone();
    Ok((outcome, replay))
}

/// Rerun a replay and check it reproduces its recording.
///
/// # Errors
///
/// Returns [`ToolError::ReplayDiverged`] if it does not, or the error the
/// rerun raised.
pub fn check_replay(replay: &BattleReplay, provider: Arc<dyn UnitTypeProvider>, name: &str) -> Result<()> {
    if replay.verify(provider)? {
        Ok(())
    } else {
        Err(ToolError::ReplayDiverged(name.to_string()))
    }
}

/// One line per unit describing how it fared.
#[must_use]
pub fn summary(outcome: &BattleOutcome) -> Vec<String> {
    let mut lines = vec![format!("{:?} after {} rounds", outcome.result, outcome.rounds)];
    for unit in &outcome.units {
        let mut line = format!(
            "  {:?} unit {}: {:?}, {} hp, level {}",
            unit.side, unit.id, unit.fate, unit.hit_points, unit.level
        );
        if unit.experience_gained > 0 {
            line.push_str(&format!(", +{} xp", unit.experience_gained));
        }
        if unit.levelled_up {
            line.push_str(" (level up)");
        }
        lines.push(line);
    }
    lines
}
