//! Battle setup files: who fights whom, where everyone stands, and under
//! which rules.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::field::Battlefield;
use crate::position::{Flank, Line, UnitPosition};
use crate::provider::UnitTypeProvider;
use crate::squad::{Squad, SquadSide};
use crate::unit::{PlayerId, Unit, UnitId, UnitTypeId};

/// Who issues a squad's commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Controller {
    /// Commands come from [`Battle::submit_command`](crate::battle::Battle::submit_command).
    Human,
    /// Commands come from the built-in AI.
    #[default]
    Computer,
}

/// One unit of a squad setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSetup {
    /// Battle-wide unique id.
    pub id: UnitId,
    /// Unit type to look up.
    pub unit_type: UnitTypeId,
    /// Line the unit stands on; ignored for big units.
    pub line: Line,
    /// Flank the unit stands on.
    pub flank: Flank,
    /// Level, when above the type's base level.
    #[serde(default)]
    pub level: Option<u16>,
    /// Current hit points, when the unit enters wounded.
    #[serde(default)]
    pub hit_points: Option<u32>,
    /// Experience carried into the battle.
    #[serde(default)]
    pub experience: u32,
}

impl UnitSetup {
    /// Create a unit setup at full health and base level.
    #[must_use]
    pub fn new(id: u32, unit_type: impl Into<String>, line: Line, flank: Flank) -> Self {
        Self {
            id: UnitId(id),
            unit_type: UnitTypeId::new(unit_type),
            line,
            flank,
            level: None,
            hit_points: None,
            experience: 0,
        }
    }

    /// Builder method to set the level.
    #[must_use]
    pub fn with_level(mut self, level: u16) -> Self {
        self.level = Some(level);
        self
    }

    /// Builder method to set current hit points.
    #[must_use]
    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = Some(hit_points);
        self
    }

    fn build(&self, player: PlayerId, provider: &dyn UnitTypeProvider) -> Result<Unit> {
        let unit_type = provider.unit_type(&self.unit_type)?;
        let position = UnitPosition::new(self.line, self.flank, unit_type.size);
        let mut unit = Unit::new(self.id, unit_type, player, position).with_experience(self.experience);
        if let Some(level) = self.level {
            unit = unit.with_level(level);
        }
        if let Some(hit_points) = self.hit_points {
            unit = unit.with_hit_points(hit_points);
        }
        Ok(unit)
    }
}

/// One squad of a battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadSetup {
    /// Owning player.
    pub player: PlayerId,
    /// Who commands the squad.
    #[serde(default)]
    pub controller: Controller,
    /// Units in squad order.
    pub units: Vec<UnitSetup>,
}

impl SquadSetup {
    /// Build the squad, looking every unit type up in `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::ResourceMissing`] for unknown unit types and
    /// [`BattleError::InvariantViolation`] for squads that do not fit the grid.
    pub fn build(&self, provider: &dyn UnitTypeProvider) -> Result<Squad> {
        let mut squad = Squad::new(self.player);
        for unit in &self.units {
            squad.add_unit(unit.build(self.player, provider)?)?;
        }
        Ok(squad)
    }
}

/// Complete description of a battle before it starts.
///
/// # Example RON
///
/// ```ron
/// BattleSetup(
///     seed: 42,
///     attacker: SquadSetup(
///         player: 0,
///         controller: Human,
///         units: [
///             UnitSetup(id: 1, unit_type: "squire", line: Front, flank: Center),
///         ],
///     ),
///     defender: SquadSetup(
///         player: 1,
///         units: [
///             UnitSetup(id: 11, unit_type: "goblin", line: Front, flank: Top),
///         ],
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSetup {
    /// Seed for every random roll of the battle.
    pub seed: u64,
    /// Rules.
    #[serde(default)]
    pub config: BattleConfig,
    /// Squad that started the battle.
    pub attacker: SquadSetup,
    /// Squad that was attacked.
    pub defender: SquadSetup,
}

impl BattleSetup {
    /// Parse a setup from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] if the text is not a valid setup.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| BattleError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a setup from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        ron::from_str(&text).map_err(|e| BattleError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Setup of one side.
    #[must_use]
    pub const fn squad(&self, side: SquadSide) -> &SquadSetup {
        match side {
            SquadSide::Attacker => &self.attacker,
            SquadSide::Defender => &self.defender,
        }
    }

    /// Mutable setup of one side.
    pub fn squad_mut(&mut self, side: SquadSide) -> &mut SquadSetup {
        match side {
            SquadSide::Attacker => &mut self.attacker,
            SquadSide::Defender => &mut self.defender,
        }
    }

    /// Hand both squads to the AI.
    pub fn all_computer(&mut self) {
        self.attacker.controller = Controller::Computer;
        self.defender.controller = Controller::Computer;
    }

    /// Build both squads.
    ///
    /// # Errors
    ///
    /// Returns an error if a unit type is missing or a squad breaks the
    /// grid or id invariants.
    pub fn build_field(&self, provider: &dyn UnitTypeProvider) -> Result<Battlefield> {
        Battlefield::new(self.attacker.build(provider)?, self.defender.build(provider)?)
    }
}
