//! Battle-long status effects and the turn-start tracker.
//!
//! Effects live on the affected [`Unit`] in the order they were applied.
//! They only advance when their owner's turn starts: damage-over-time
//! effects hit, stuns cost the turn, every duration counts down, and
//! effects that reach zero are removed. Frostbite may also cost the turn,
//! decided by one roll of the battle RNG.

use serde::{Deserialize, Serialize};

use crate::config::BattleConfig;
use crate::events::{EventLog, UnitActionType};
use crate::rng::BattleRng;
use crate::unit::Unit;

/// Kind of an active status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleEffectType {
    /// Unit braced itself; raises armor until its next turn.
    Defend,
    /// Damage over time.
    Poison,
    /// Damage over time.
    Frostbite,
    /// Damage over time.
    Blister,
    /// Unit loses its turns while the effect lasts.
    Paralyze,
    /// Unit loses its turns while the effect lasts.
    Petrify,
    /// Raises damage by `power` percent.
    BoostDamage,
    /// Lowers damage by `power` percent.
    LowerDamage,
    /// Lowers initiative by `power` percent.
    LowerInitiative,
    /// Unit wears a foreign unit type until the effect ends.
    Transform,
}

impl BattleEffectType {
    /// Rounds an effect lasts when the attack does not say otherwise.
    #[must_use]
    pub const fn default_duration(self) -> u8 {
        match self {
            Self::Defend | Self::Paralyze | Self::Petrify => 1,
            Self::BoostDamage | Self::LowerDamage | Self::LowerInitiative => 2,
            Self::Poison | Self::Frostbite | Self::Blister | Self::Transform => 3,
        }
    }

    /// Whether the effect deals damage when its owner's turn starts.
    #[must_use]
    pub const fn is_damage_over_time(self) -> bool {
        matches!(self, Self::Poison | Self::Frostbite | Self::Blister)
    }

    /// Whether the effect always costs its owner the turn.
    #[must_use]
    pub const fn skips_turn(self) -> bool {
        matches!(self, Self::Paralyze | Self::Petrify)
    }

    /// Whether a cure removes the effect.
    #[must_use]
    pub const fn is_curable(self) -> bool {
        matches!(
            self,
            Self::Poison
                | Self::Frostbite
                | Self::Blister
                | Self::Paralyze
                | Self::Petrify
                | Self::LowerDamage
                | Self::LowerInitiative
        )
    }
}

/// An active status effect on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleEffect {
    /// Effect kind.
    pub kind: BattleEffectType,
    /// Owner turns left before the effect is removed.
    pub duration: u8,
    /// Damage per tick, or percentage for modifiers.
    pub power: u32,
}

impl BattleEffect {
    /// Create an effect.
    #[must_use]
    pub const fn new(kind: BattleEffectType, duration: u8, power: u32) -> Self {
        Self {
            kind,
            duration,
            power,
        }
    }

    /// Create an effect with its default duration.
    #[must_use]
    pub const fn with_default_duration(kind: BattleEffectType, power: u32) -> Self {
        Self::new(kind, kind.default_duration(), power)
    }
}

/// What happened when a unit's effects were processed at turn start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnStartResult {
    /// The unit died from an effect.
    pub died: bool,
    /// The unit loses this turn.
    pub skip_turn: bool,
}

impl TurnStartResult {
    /// Whether the unit may act this turn.
    #[must_use]
    pub const fn can_act(&self) -> bool {
        !self.died && !self.skip_turn
    }
}

/// Process the effects of `unit` at the start of its turn.
///
/// Effects are visited in application order. Processing stops at the first
/// death and the dead unit loses every remaining effect. Frostbite rolls
/// `config.frostbite_skip_chance` once per turn start, and only while the
/// turn is not already lost.
pub fn process_turn_start(
    unit: &mut Unit,
    config: &BattleConfig,
    rng: &mut dyn BattleRng,
    log: &mut EventLog,
) -> TurnStartResult {
    let mut result = TurnStartResult::default();
    let unit_id = unit.id();
    let mut index = 0;

    while index < unit.effects().len() {
        let effect = unit.effects()[index];

        if effect.kind.is_damage_over_time() {
            let dealt = unit.apply_damage(effect.power);
            log.push_with_power(unit_id, UnitActionType::EffectDamage(effect.kind), dealt);
            tracing::debug!(unit = %unit_id, effect = ?effect.kind, dealt, "Effect damage");
            if unit.is_dead() {
                unit.clear_effects();
                log.push(unit_id, UnitActionType::Died);
                result.died = true;
                return result;
            }
        }

        if !result.skip_turn && loses_turn(effect.kind, config, rng) {
            result.skip_turn = true;
            log.push(unit_id, UnitActionType::TurnSkipped);
            tracing::debug!(unit = %unit_id, effect = ?effect.kind, "Turn skipped");
        }

        let remaining = effect.duration.saturating_sub(1);
        if remaining == 0 {
            unit.remove_effect_at(index);
            log.push(unit_id, UnitActionType::EffectExpired(effect.kind));
            if effect.kind == BattleEffectType::Transform && unit.revert_transform() {
                log.push(unit_id, UnitActionType::Untransformed);
            }
        } else {
            unit.set_effect_duration(index, remaining);
            index += 1;
        }
    }

    result
}

/// Process a turn a unit deferred with Wait.
///
/// Its effects already ticked when the turn first started, so only stuns
/// applied since are looked at. Each one costs this turn and uses up one
/// turn of its duration.
pub fn process_resumed_turn(unit: &mut Unit, log: &mut EventLog) -> TurnStartResult {
    let mut result = TurnStartResult::default();
    let unit_id = unit.id();
    let mut index = 0;

    while index < unit.effects().len() {
        let effect = unit.effects()[index];
        if !effect.kind.skips_turn() {
            index += 1;
            continue;
        }
        if !result.skip_turn {
            result.skip_turn = true;
            log.push(unit_id, UnitActionType::TurnSkipped);
            tracing::debug!(unit = %unit_id, effect = ?effect.kind, "Resumed turn skipped");
        }
        let remaining = effect.duration.saturating_sub(1);
        if remaining == 0 {
            unit.remove_effect_at(index);
            log.push(unit_id, UnitActionType::EffectExpired(effect.kind));
        } else {
            unit.set_effect_duration(index, remaining);
            index += 1;
        }
    }

    result
}

fn loses_turn(kind: BattleEffectType, config: &BattleConfig, rng: &mut dyn BattleRng) -> bool {
    match kind {
        BattleEffectType::Frostbite => {
            config.frostbite_skip_chance > 0 && rng.chance(config.frostbite_skip_chance)
        }
        _ => kind.skips_turn(),
    }
}
