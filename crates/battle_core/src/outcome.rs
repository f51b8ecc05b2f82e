//! Battle results, experience and levelling.

use serde::{Deserialize, Serialize};

use crate::field::Battlefield;
use crate::squad::SquadSide;
use crate::unit::{Unit, UnitId};

/// How the battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleResult {
    /// One side still has units in the fight.
    Victory(SquadSide),
    /// Both sides ran out of units, or the round limit was hit.
    Draw,
    /// The battle was called off before it ended.
    Aborted,
}

/// What became of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitFate {
    /// Still standing.
    Survived,
    /// Killed.
    Died,
    /// Left the field.
    Retreated,
}

/// End-of-battle record of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Unit.
    pub id: UnitId,
    /// Side it fought on.
    pub side: SquadSide,
    /// What became of it.
    pub fate: UnitFate,
    /// Hit points left.
    pub hit_points: u32,
    /// Level after the battle.
    pub level: u16,
    /// Experience after the battle.
    pub experience: u32,
    /// Experience earned in this battle.
    pub experience_gained: u32,
    /// Whether the unit gained a level.
    pub levelled_up: bool,
}

/// Final result handed to whoever persists the campaign state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// How the battle ended.
    pub result: BattleResult,
    /// Rounds fought.
    pub rounds: u32,
    /// Every real unit, attacker squad first. Illusions are gone.
    pub units: Vec<UnitOutcome>,
}

impl BattleOutcome {
    /// Winning side, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<SquadSide> {
        match self.result {
            BattleResult::Victory(side) => Some(side),
            BattleResult::Draw | BattleResult::Aborted => None,
        }
    }

    /// Record of one unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitOutcome> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Units of `side` that are still standing.
    pub fn survivors(&self, side: SquadSide) -> impl Iterator<Item = &UnitOutcome> {
        self.units
            .iter()
            .filter(move |u| u.side == side && u.fate == UnitFate::Survived)
    }
}

/// Wrap up a finished battle.
///
/// Transformed units return to their own type and illusions leave the
/// squads. On a victory the experience of every killed enemy is shared
/// evenly among the surviving winners, each of whom may gain one level.
pub(crate) fn finalize(field: &mut Battlefield, result: BattleResult, rounds: u32) -> BattleOutcome {
    for side in SquadSide::BOTH {
        let squad = field.squad_mut(side);
        let illusions: Vec<UnitId> = squad
            .units()
            .iter()
            .filter(|u| u.is_illusion())
            .map(Unit::id)
            .collect();
        for id in illusions {
            squad.remove_unit(id);
        }
        for id in squad.units().iter().map(Unit::id).collect::<Vec<_>>() {
            if let Some(unit) = squad.unit_mut(id) {
                unit.revert_transform();
                unit.clear_effects();
            }
        }
    }

    let mut gained = Vec::new();
    if let BattleResult::Victory(winner) = result {
        let pool: u32 = field
            .squad(winner.opponent())
            .units()
            .iter()
            .filter(|u| u.is_dead())
            .map(|u| u.base_type().xp_on_kill)
            .sum();
        let earners: Vec<UnitId> = field
            .squad(winner)
            .active_units()
            .filter(|u| !u.is_retreating())
            .map(Unit::id)
            .collect();
        let share = u32::try_from(earners.len())
            .ok()
            .filter(|&n| n > 0)
            .map_or(0, |n| pool / n);
        tracing::info!(?winner, pool, earners = earners.len(), share, "Awarding experience");
        for id in earners {
            if let Some(unit) = field.squad_mut(winner).unit_mut(id) {
                unit.add_experience(share);
                let levelled = unit.try_level_up();
                if levelled {
                    tracing::info!(unit = %id, level = unit.level(), "Level up");
                }
                gained.push((id, share, levelled));
            }
        }
    }

    let units = field
        .units()
        .map(|(side, unit)| {
            let (experience_gained, levelled_up) = gained
                .iter()
                .find(|(id, _, _)| *id == unit.id())
                .map_or((0, false), |&(_, share, levelled)| (share, levelled));
            let fate = if unit.is_dead() {
                UnitFate::Died
            } else if unit.is_retreated() || unit.is_retreating() {
                UnitFate::Retreated
            } else {
                UnitFate::Survived
            };
            UnitOutcome {
                id: unit.id(),
                side,
                fate,
                hit_points: unit.hit_points(),
                level: unit.level(),
                experience: unit.experience(),
                experience_gained,
                levelled_up,
            }
        })
        .collect();

    BattleOutcome {
        result,
        rounds,
        units,
    }
}
