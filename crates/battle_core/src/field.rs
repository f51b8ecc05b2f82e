//! The two squads of a battle and unit lookup across them.

use crate::error::{BattleError, Result};
use crate::squad::{Squad, SquadSide};
use crate::unit::{Unit, UnitId};

/// Both squads of a battle, attacker first.
#[derive(Debug, Clone)]
pub struct Battlefield {
    squads: [Squad; 2],
}

impl Battlefield {
    /// Put two squads against each other.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvariantViolation`] if both squads belong to
    /// the same player or a unit id appears in both squads.
    pub fn new(attacker: Squad, defender: Squad) -> Result<Self> {
        if attacker.player() == defender.player() {
            return Err(BattleError::InvariantViolation(format!(
                "both squads belong to player {}",
                attacker.player().0
            )));
        }
        if let Some(shared) = attacker
            .units()
            .iter()
            .find(|u| defender.unit(u.id()).is_some())
        {
            return Err(BattleError::InvariantViolation(format!(
                "unit id {} used in both squads",
                shared.id()
            )));
        }
        Ok(Self {
            squads: [attacker, defender],
        })
    }

    /// Squad of `side`.
    #[must_use]
    pub fn squad(&self, side: SquadSide) -> &Squad {
        &self.squads[side.index()]
    }

    /// Squad of `side`, mutably.
    pub fn squad_mut(&mut self, side: SquadSide) -> &mut Squad {
        &mut self.squads[side.index()]
    }

    /// Side the unit fights on.
    #[must_use]
    pub fn side_of(&self, id: UnitId) -> Option<SquadSide> {
        SquadSide::BOTH
            .into_iter()
            .find(|&side| self.squad(side).unit(id).is_some())
    }

    /// Look up a unit in either squad.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.squads.iter().find_map(|squad| squad.unit(id))
    }

    /// Look up a unit in either squad, mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.squads.iter_mut().find_map(|squad| squad.unit_mut(id))
    }

    /// Look up a unit or fail with [`BattleError::UnitNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no squad holds the unit.
    pub fn require(&self, id: UnitId) -> Result<&Unit> {
        self.unit(id).ok_or(BattleError::UnitNotFound(id))
    }

    /// Mutable variant of [`Battlefield::require`].
    ///
    /// # Errors
    ///
    /// Returns an error if no squad holds the unit.
    pub fn require_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.unit_mut(id).ok_or(BattleError::UnitNotFound(id))
    }

    /// Every unit of both squads, attacker squad first.
    pub fn units(&self) -> impl Iterator<Item = (SquadSide, &Unit)> {
        SquadSide::BOTH
            .into_iter()
            .flat_map(move |side| self.squad(side).units().iter().map(move |u| (side, u)))
    }

    /// Smallest id not used by any unit.
    #[must_use]
    pub fn next_unit_id(&self) -> UnitId {
        let max = self.units().map(|(_, u)| u.id().0).max().unwrap_or(0);
        UnitId(max + 1)
    }

    /// Side with no active units left, if exactly one such side exists, or
    /// `Some(None)` when both squads are out.
    #[must_use]
    pub fn defeated_side(&self) -> Option<Option<SquadSide>> {
        let attacker_out = self.squad(SquadSide::Attacker).is_defeated();
        let defender_out = self.squad(SquadSide::Defender).is_defeated();
        match (attacker_out, defender_out) {
            (false, false) => None,
            (true, false) => Some(Some(SquadSide::Attacker)),
            (false, true) => Some(Some(SquadSide::Defender)),
            (true, true) => Some(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Flank, Line, UnitPosition};
    use crate::unit::tests::test_type;
    use crate::unit::PlayerId;

    fn squad(player: u8, ids: &[u32]) -> Squad {
        let mut squad = Squad::new(PlayerId(player));
        for (&id, flank) in ids.iter().zip(Flank::ALL) {
            squad
                .add_unit(Unit::new(
                    UnitId(id),
                    test_type("grunt", 10, 5),
                    PlayerId(player),
                    UnitPosition::small(Line::Front, flank),
                ))
                .unwrap();
        }
        squad
    }

    #[test]
    fn test_lookup_across_squads() {
        let field = Battlefield::new(squad(0, &[1, 2]), squad(1, &[3])).unwrap();
        assert_eq!(field.side_of(UnitId(1)), Some(SquadSide::Attacker));
        assert_eq!(field.side_of(UnitId(3)), Some(SquadSide::Defender));
        assert_eq!(field.side_of(UnitId(9)), None);
        assert_eq!(field.next_unit_id(), UnitId(4));
        assert!(field.require(UnitId(9)).is_err());
    }

    #[test]
    fn test_same_player_rejected() {
        assert!(Battlefield::new(squad(0, &[1]), squad(0, &[2])).is_err());
    }

    #[test]
    fn test_shared_id_rejected() {
        assert!(Battlefield::new(squad(0, &[1]), squad(1, &[1])).is_err());
    }

    #[test]
    fn test_defeated_side() {
        let mut field = Battlefield::new(squad(0, &[1]), squad(1, &[2])).unwrap();
        assert_eq!(field.defeated_side(), None);
        field.unit_mut(UnitId(2)).unwrap().apply_damage(100);
        assert_eq!(field.defeated_side(), Some(Some(SquadSide::Defender)));
        field.unit_mut(UnitId(1)).unwrap().apply_damage(100);
        assert_eq!(field.defeated_side(), Some(None));
    }
}
