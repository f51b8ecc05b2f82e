//! Squads: up to six units of one player on a 2×3 grid.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::position::{Flank, Line, UnitPosition, UnitSize};
use crate::unit::{PlayerId, Unit, UnitId};

/// Maximum number of units in a squad.
pub const MAX_SQUAD_SIZE: usize = 6;

/// Which of the two squads of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SquadSide {
    /// Squad that started the battle; acts first on initiative ties.
    Attacker,
    /// Squad that was attacked.
    Defender,
}

impl SquadSide {
    /// Both sides, attacker first.
    pub const BOTH: [SquadSide; 2] = [SquadSide::Attacker, SquadSide::Defender];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    /// Index of the side (attacker 0, defender 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Attacker => 0,
            Self::Defender => 1,
        }
    }
}

/// Ordered collection of units owned by one player.
#[derive(Debug, Clone)]
pub struct Squad {
    player: PlayerId,
    units: Vec<Unit>,
}

impl Squad {
    /// Create an empty squad.
    #[must_use]
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            units: Vec::new(),
        }
    }

    /// Owning player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Add a unit, validating ownership, capacity, and cell occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvariantViolation`] if the squad is full, the
    /// unit belongs to another player, its id is taken, or one of its cells
    /// is held by another unit.
    pub fn add_unit(&mut self, unit: Unit) -> Result<()> {
        if self.placed_units().count() >= MAX_SQUAD_SIZE {
            return Err(BattleError::InvariantViolation(format!(
                "squad of player {} already has {MAX_SQUAD_SIZE} units",
                self.player.0
            )));
        }
        if unit.player() != self.player {
            return Err(BattleError::InvariantViolation(format!(
                "unit {} belongs to player {}, squad to player {}",
                unit.id(),
                unit.player().0,
                self.player.0
            )));
        }
        if self.unit(unit.id()).is_some() {
            return Err(BattleError::InvariantViolation(format!(
                "unit id {} used twice",
                unit.id()
            )));
        }
        let position = unit.position();
        if let Some(other) = self
            .placed_units()
            .find(|u| u.position().overlaps(&position))
        {
            return Err(BattleError::InvariantViolation(format!(
                "unit {} overlaps unit {} at {:?}",
                unit.id(),
                other.id(),
                position
            )));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Remove a unit, returning it.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let index = self.units.iter().position(|u| u.id() == id)?;
        Some(self.units.remove(index))
    }

    /// All units in squad order, including inactive ones.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Number of units, including inactive ones and units that left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the squad has no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Look up a unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id() == id)
    }

    /// Units holding cells on the grid: everyone except retreated units and
    /// dissipated illusions. Dead units keep their cell.
    pub fn placed_units(&self) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(|u| !u.is_retreated() && !u.is_dissipated())
    }

    /// Units still in the fight, in squad order.
    pub fn active_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_active())
    }

    /// Active unit covering the cell, if any.
    #[must_use]
    pub fn unit_at(&self, line: Line, flank: Flank) -> Option<&Unit> {
        self.active_units()
            .find(|u| u.position().occupies(line, flank))
    }

    /// Whether an active unit covers the cell.
    #[must_use]
    pub fn is_cell_occupied(&self, line: Line, flank: Flank) -> bool {
        self.unit_at(line, flank).is_some()
    }

    /// Whether any active unit stands on `line`.
    #[must_use]
    pub fn has_active_on_line(&self, line: Line) -> bool {
        self.active_units().any(|u| u.position().is_on_line(line))
    }

    /// Whether no unit, living or dead, holds any cell of `position`.
    #[must_use]
    pub fn is_position_free(&self, position: &UnitPosition) -> bool {
        !self.placed_units().any(|u| u.position().overlaps(position))
    }

    /// First free position for a unit of `size`, scanning front line first,
    /// then top to bottom. `None` if the squad is full or no cell fits.
    #[must_use]
    pub fn free_position(&self, size: UnitSize) -> Option<UnitPosition> {
        if self.placed_units().count() >= MAX_SQUAD_SIZE {
            return None;
        }
        Line::ALL
            .iter()
            .flat_map(|&line| Flank::ALL.iter().map(move |&flank| (line, flank)))
            .map(|(line, flank)| UnitPosition::new(line, flank, size))
            .find(|position| self.is_position_free(position))
    }

    /// Whether no unit is left in the fight.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.active_units().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::test_type;

    fn unit_at(id: u32, position: UnitPosition) -> Unit {
        Unit::new(UnitId(id), test_type("grunt", 20, 5), PlayerId(0), position)
    }

    #[test]
    fn test_add_and_lookup() {
        let mut squad = Squad::new(PlayerId(0));
        squad
            .add_unit(unit_at(1, UnitPosition::small(Line::Front, Flank::Top)))
            .unwrap();
        assert_eq!(squad.len(), 1);
        assert!(squad.unit(UnitId(1)).is_some());
        assert!(squad.is_cell_occupied(Line::Front, Flank::Top));
        assert!(!squad.is_cell_occupied(Line::Back, Flank::Top));
    }

    #[test]
    fn test_overlap_rejected() {
        let mut squad = Squad::new(PlayerId(0));
        squad
            .add_unit(unit_at(1, UnitPosition::small(Line::Back, Flank::Center)))
            .unwrap();
        let err = squad
            .add_unit(unit_at(2, UnitPosition::small(Line::Back, Flank::Center)))
            .unwrap_err();
        assert!(matches!(err, BattleError::InvariantViolation(_)));
        assert_eq!(squad.len(), 1);
    }

    #[test]
    fn test_big_unit_blocks_both_lines() {
        let mut squad = Squad::new(PlayerId(0));
        let big_type = std::sync::Arc::new(
            (*test_type("giant", 100, 20)).clone().with_size(UnitSize::Big),
        );
        squad
            .add_unit(Unit::new(
                UnitId(1),
                big_type,
                PlayerId(0),
                UnitPosition::small(Line::Front, Flank::Bottom),
            ))
            .unwrap();
        assert!(squad.is_cell_occupied(Line::Back, Flank::Bottom));
        assert!(squad
            .add_unit(unit_at(2, UnitPosition::small(Line::Back, Flank::Bottom)))
            .is_err());
    }

    #[test]
    fn test_capacity() {
        let mut squad = Squad::new(PlayerId(0));
        let mut id = 0;
        for line in Line::ALL {
            for flank in Flank::ALL {
                id += 1;
                squad
                    .add_unit(unit_at(id, UnitPosition::small(line, flank)))
                    .unwrap();
            }
        }
        assert_eq!(squad.len(), MAX_SQUAD_SIZE);
        assert!(squad.free_position(UnitSize::Small).is_none());
        assert!(squad
            .add_unit(unit_at(7, UnitPosition::small(Line::Front, Flank::Top)))
            .is_err());
    }

    #[test]
    fn test_wrong_player_rejected() {
        let mut squad = Squad::new(PlayerId(1));
        assert!(squad
            .add_unit(unit_at(1, UnitPosition::small(Line::Front, Flank::Top)))
            .is_err());
    }

    #[test]
    fn test_free_position_scans_front_first() {
        let mut squad = Squad::new(PlayerId(0));
        squad
            .add_unit(unit_at(1, UnitPosition::small(Line::Front, Flank::Top)))
            .unwrap();
        assert_eq!(
            squad.free_position(UnitSize::Small),
            Some(UnitPosition::small(Line::Front, Flank::Center))
        );
        assert_eq!(
            squad.free_position(UnitSize::Big),
            Some(UnitPosition::big(Flank::Center))
        );
    }

    #[test]
    fn test_defeated_when_all_inactive() {
        let mut squad = Squad::new(PlayerId(0));
        squad
            .add_unit(unit_at(1, UnitPosition::small(Line::Front, Flank::Top)))
            .unwrap();
        assert!(!squad.is_defeated());
        squad.unit_mut(UnitId(1)).unwrap().apply_damage(100);
        assert!(squad.is_defeated());
        assert!(!squad.has_active_on_line(Line::Front));
    }
}
