//! Test fixtures and helpers.
//!
//! Sample unit data, setup builders, and stand-ins for the randomness and
//! presentation layers a real game would plug in.

use std::collections::VecDeque;
use std::sync::Arc;

use battle_core::battle::{Battle, BattleCommand, BattleState};
use battle_core::config::BattleConfig;
use battle_core::data::{BattleSetup, Controller, SquadSetup, UnitSetup};
use battle_core::error::Result;
use battle_core::events::{PresentationSink, UnitActionEvent, UnitActionType};
use battle_core::position::{Flank, Line};
use battle_core::provider::{UnitTypeProvider, UnitTypeRegistry};
use battle_core::rng::BattleRng;
use battle_core::unit::{PlayerId, UnitId};

/// Sample unit data shipped with the workspace.
pub const SAMPLE_UNITS_RON: &str = include_str!("../../../data/units.ron");

/// Sample battle shipped with the workspace.
pub const SKIRMISH_RON: &str = include_str!("../../../data/battles/skirmish.ron");

/// Small unit types from the sample data that need no special placement.
pub const SMALL_UNIT_TYPES: &[&str] = &[
    "squire",
    "archer",
    "acolyte",
    "apprentice",
    "goblin",
    "spider",
    "salamander",
    "necromancer",
    "skeleton",
    "banshee",
    "frost_wraith",
];

/// Registry loaded from [`SAMPLE_UNITS_RON`].
///
/// # Panics
///
/// Panics if the sample data no longer parses or validates.
#[must_use]
pub fn sample_registry() -> UnitTypeRegistry {
    UnitTypeRegistry::from_ron(SAMPLE_UNITS_RON).expect("sample unit data must be valid")
}

/// [`sample_registry`] behind the shared pointer a battle takes.
#[must_use]
pub fn sample_provider() -> Arc<dyn UnitTypeProvider> {
    Arc::new(sample_registry())
}

/// The sample skirmish, both sides computer-controlled.
///
/// # Panics
///
/// Panics if the sample setup no longer parses.
#[must_use]
pub fn skirmish() -> BattleSetup {
    BattleSetup::from_ron(SKIRMISH_RON).expect("sample battle must parse")
}

/// Build a squad from `(id, unit type, line, flank)` tuples.
#[must_use]
pub fn squad(player: u8, controller: Controller, units: &[(u32, &str, Line, Flank)]) -> SquadSetup {
    SquadSetup {
        player: PlayerId(player),
        controller,
        units: units
            .iter()
            .map(|&(id, unit_type, line, flank)| UnitSetup::new(id, unit_type, line, flank))
            .collect(),
    }
}

/// Put two squads together with default rules.
#[must_use]
pub fn setup(seed: u64, attacker: SquadSetup, defender: SquadSetup) -> BattleSetup {
    BattleSetup {
        seed,
        config: BattleConfig::default(),
        attacker,
        defender,
    }
}

/// One unit against one unit, both in the front center.
#[must_use]
pub fn duel(seed: u64, attacker: &str, defender: &str, controller: Controller) -> BattleSetup {
    setup(
        seed,
        squad(0, controller, &[(1, attacker, Line::Front, Flank::Center)]),
        squad(1, Controller::Computer, &[(11, defender, Line::Front, Flank::Center)]),
    )
}

// ============================================================================
// Randomness
// ============================================================================

/// Random source replaying a fixed list of rolls.
///
/// Each roll returns the next value modulo the requested bound. Once the
/// list runs out every roll returns 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRng {
    rolls: VecDeque<u32>,
    consumed: usize,
}

impl ScriptedRng {
    /// Create from a list of rolls.
    #[must_use]
    pub fn new(rolls: &[u32]) -> Self {
        Self {
            rolls: rolls.iter().copied().collect(),
            consumed: 0,
        }
    }

    /// Rolls taken so far, including those past the end of the script.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }
}

impl BattleRng for ScriptedRng {
    fn roll(&mut self, upper: u32) -> u32 {
        self.consumed += 1;
        let next = self.rolls.pop_front().unwrap_or(0);
        if upper == 0 {
            0
        } else {
            next % upper
        }
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Sink that keeps every presented event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Events in the order they were presented.
    pub events: Vec<UnitActionEvent>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions presented for `unit`, in order.
    #[must_use]
    pub fn actions_for(&self, unit: UnitId) -> Vec<UnitActionType> {
        self.events
            .iter()
            .filter(|e| e.unit == unit)
            .map(|e| e.action)
            .collect()
    }

    /// Whether `action` was presented for `unit`.
    #[must_use]
    pub fn saw(&self, unit: UnitId, action: UnitActionType) -> bool {
        self.events.iter().any(|e| e.unit == unit && e.action == action)
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, event: &UnitActionEvent) {
        self.events.push(*event);
    }
}

/// Play a battle to its end, standing in for human players.
///
/// Human-controlled units attack their first legal target, or defend when
/// there is none.
///
/// # Errors
///
/// Propagates errors from the battle.
pub fn autoplay(battle: &mut Battle, sink: &mut dyn PresentationSink) -> Result<()> {
    battle.drive(sink)?;
    while battle.state() == BattleState::WaitPlayerTurn {
        let Some(unit) = battle.current_unit() else {
            break;
        };
        let command = battle
            .legal_targets()
            .first()
            .map_or(BattleCommand::Defend, |&target| BattleCommand::Attack { target });
        battle.submit_command(unit, command)?;
        battle.drive(sink)?;
    }
    Ok(())
}
