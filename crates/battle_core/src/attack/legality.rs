//! Legality checks run before an attack touches any state.

use crate::error::{BattleError, CommandRejection, Result};
use crate::field::Battlefield;
use crate::position::{Flank, Line};
use crate::squad::Squad;
use crate::unit::{AttackClass, Reach, TargetSide, Unit, UnitAttack, UnitId, UnitType};

/// Everything the legality checks look at for one attacker/target pair.
#[derive(Debug, Clone, Copy)]
pub struct AttackProcessorContext<'a> {
    /// Acting unit.
    pub attacker: &'a Unit,
    /// Chosen target.
    pub target: &'a Unit,
    /// Squad of the acting unit.
    pub attacker_squad: &'a Squad,
    /// Squad of the target.
    pub target_squad: &'a Squad,
    /// Attack being checked.
    pub attack: &'a UnitAttack,
    /// Unit type a summon or transform would produce.
    pub template: Option<&'a UnitType>,
}

impl<'a> AttackProcessorContext<'a> {
    /// Gather the context for `attacker` using `attack` on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnitNotFound`] for an unknown attacker and
    /// [`CommandRejection::UnknownTarget`] for an unknown target.
    pub fn new(
        field: &'a Battlefield,
        attacker: UnitId,
        target: UnitId,
        attack: &'a UnitAttack,
    ) -> Result<Self> {
        let attacker_side = field
            .side_of(attacker)
            .ok_or(BattleError::UnitNotFound(attacker))?;
        let target_side = field
            .side_of(target)
            .ok_or(CommandRejection::UnknownTarget)?;
        let attacker_squad = field.squad(attacker_side);
        let target_squad = field.squad(target_side);
        Ok(Self {
            attacker: attacker_squad
                .unit(attacker)
                .ok_or(BattleError::UnitNotFound(attacker))?,
            target: target_squad
                .unit(target)
                .ok_or(CommandRejection::UnknownTarget)?,
            attacker_squad,
            target_squad,
            attack,
            template: None,
        })
    }

    /// Builder method to set the summon or transform template.
    #[must_use]
    pub fn with_template(mut self, template: Option<&'a UnitType>) -> Self {
        self.template = template;
        self
    }
}

/// Run every legality check in order, reporting the first failure.
///
/// The checks never mutate anything, so repeated calls on the same state
/// give the same answer.
///
/// # Errors
///
/// Returns the [`CommandRejection`] of the first failing check.
pub fn check_attack(ctx: &AttackProcessorContext<'_>) -> std::result::Result<(), CommandRejection> {
    check_side(ctx)?;
    check_activity(ctx)?;
    if ctx.attack.reach == Reach::Adjacent && ctx.attack.class.has_enemy_ability() {
        check_adjacent_reach(ctx)?;
    }
    check_capacity(ctx)
}

/// Boolean form of [`check_attack`].
#[must_use]
pub fn can_attack(ctx: &AttackProcessorContext<'_>) -> bool {
    check_attack(ctx).is_ok()
}

fn check_side(ctx: &AttackProcessorContext<'_>) -> std::result::Result<(), CommandRejection> {
    if ctx.attack.class == AttackClass::TransformSelf {
        return if ctx.target.id() == ctx.attacker.id() {
            Ok(())
        } else {
            Err(CommandRejection::SelfOnly)
        };
    }
    let same_player = ctx.target.player() == ctx.attacker.player();
    match (ctx.attack.class.target_side(), same_player) {
        (TargetSide::Allies, true) | (TargetSide::Enemies, false) => Ok(()),
        _ => Err(CommandRejection::WrongSide),
    }
}

fn check_activity(ctx: &AttackProcessorContext<'_>) -> std::result::Result<(), CommandRejection> {
    let target = ctx.target;
    if ctx.attack.class == AttackClass::Revive {
        if target.is_retreated() || target.is_dissipated() || target.is_illusion() {
            return Err(CommandRejection::TargetInactive);
        }
        if !target.is_dead() {
            return Err(CommandRejection::TargetNotDead);
        }
        return Ok(());
    }
    if target.is_inactive() {
        return Err(CommandRejection::TargetInactive);
    }
    Ok(())
}

fn check_adjacent_reach(
    ctx: &AttackProcessorContext<'_>,
) -> std::result::Result<(), CommandRejection> {
    let attacker = ctx.attacker.position();
    let target = ctx.target.position();

    if !attacker.is_on_line(Line::Front) && ctx.attacker_squad.has_active_on_line(Line::Front) {
        return Err(CommandRejection::AttackerBlocked);
    }
    if !target.is_on_line(Line::Front) && ctx.target_squad.has_active_on_line(Line::Front) {
        return Err(CommandRejection::TargetCovered);
    }
    if attacker.flank.distance(target.flank) > 1 {
        let line = target.line;
        if ctx.target_squad.is_cell_occupied(line, Flank::Center)
            || ctx.target_squad.is_cell_occupied(line, attacker.flank)
        {
            return Err(CommandRejection::FlankBlocked);
        }
    }
    Ok(())
}

fn check_capacity(ctx: &AttackProcessorContext<'_>) -> std::result::Result<(), CommandRejection> {
    let template = match ctx.attack.class {
        AttackClass::Doppelganger => Some(ctx.target.unit_type().as_ref()),
        _ => ctx.template,
    };
    let Some(template) = template else {
        return Ok(());
    };
    match ctx.attack.class {
        AttackClass::Summon => {
            if ctx.attacker_squad.free_position(template.size).is_none() {
                return Err(CommandRejection::SquadFull);
            }
        }
        AttackClass::TransformOther => {
            if template.size != ctx.target.position().size {
                return Err(CommandRejection::SizeMismatch);
            }
        }
        AttackClass::TransformSelf | AttackClass::Doppelganger => {
            if template.size != ctx.attacker.position().size {
                return Err(CommandRejection::SizeMismatch);
            }
        }
        _ => {}
    }
    Ok(())
}
