//! Greedy single-ply AI for computer-controlled squads.
//!
//! The AI only ever looks at the current state: it collects the targets its
//! main attack may legally hit, scores them, and picks the best. Equal
//! scores are broken with the battle RNG, so a seed reproduces every
//! choice.

use crate::attack::{check_attack, template_for, AttackProcessorContext};
use crate::battle::BattleCommand;
use crate::effects::BattleEffectType;
use crate::field::Battlefield;
use crate::math::reduce;
use crate::provider::UnitTypeProvider;
use crate::rng::BattleRng;
use crate::unit::{AttackClass, Unit, UnitId};

/// Every unit the main attack of `unit` may legally target, in field order.
///
/// A template the provider cannot supply makes every target illegal.
#[must_use]
pub fn legal_targets(
    field: &Battlefield,
    unit: UnitId,
    provider: &dyn UnitTypeProvider,
) -> Vec<UnitId> {
    let Some(attacker) = field.unit(unit) else {
        return Vec::new();
    };
    let attack = &attacker.unit_type().primary_attack;
    let Ok(template) = template_for(attack, provider) else {
        return Vec::new();
    };
    field
        .units()
        .filter_map(|(_, target)| {
            let ctx = AttackProcessorContext::new(field, unit, target.id(), attack)
                .ok()?
                .with_template(template.as_deref());
            check_attack(&ctx).ok().map(|()| target.id())
        })
        .collect()
}

/// Pick a command for the computer-controlled `unit`.
///
/// Enemy-targeting attacks go for the weakest target, then the one this
/// attacker hurts most through its armor, then the most dangerous one. Ally-targeting attacks go where they do the most good and
/// fall back to defending when no ally needs them.
pub fn choose_command(
    field: &Battlefield,
    unit: UnitId,
    provider: &dyn UnitTypeProvider,
    rng: &mut dyn BattleRng,
) -> BattleCommand {
    let Some(attacker) = field.unit(unit) else {
        return BattleCommand::Defend;
    };
    let class = attacker.unit_type().primary_attack.class;
    let candidates: Vec<&Unit> = legal_targets(field, unit, provider)
        .into_iter()
        .filter_map(|id| field.unit(id))
        .collect();

    let choice = if class.has_enemy_ability() {
        let attack = &attacker.unit_type().primary_attack;
        let power = attacker.attack_power(attack);
        pick_best(&candidates, rng, |target| {
            (
                u64::from(u32::MAX - target.hit_points()),
                u64::from(reduce(power, target.armor())),
                u64::from(target.primary_power()),
            )
        })
    } else {
        choose_ally(attacker, class, &candidates, rng)
    };

    match choice {
        Some(target) => {
            tracing::debug!(%unit, %target, ?class, "AI attacks");
            BattleCommand::Attack { target }
        }
        None => {
            tracing::debug!(%unit, "AI found no useful target, defending");
            BattleCommand::Defend
        }
    }
}

fn choose_ally(
    attacker: &Unit,
    class: AttackClass,
    candidates: &[&Unit],
    rng: &mut dyn BattleRng,
) -> Option<UnitId> {
    let wards = &attacker.unit_type().primary_attack.wards;
    let useful: Vec<&Unit> = candidates
        .iter()
        .copied()
        .filter(|target| match class {
            AttackClass::Heal => target.is_wounded(),
            AttackClass::Cure => target.has_curable_effect(),
            AttackClass::BoostDamage => !target.has_effect(BattleEffectType::BoostDamage),
            AttackClass::BestowWards => wards.iter().any(|&w| target.ward_charges(w) == 0),
            AttackClass::TransformSelf => !target.is_transformed(),
            _ => true,
        })
        .collect();

    match class {
        AttackClass::Heal => pick_best(&useful, rng, |t| {
            u64::from(t.max_hit_points() - t.hit_points())
        }),
        AttackClass::Revive | AttackClass::BoostDamage => pick_best(&useful, rng, |t| {
            (u64::from(t.primary_power()), u64::from(t.max_hit_points()))
        }),
        AttackClass::Cure => pick_best(&useful, rng, |t| t.effects().len()),
        AttackClass::Summon | AttackClass::TransformSelf => useful
            .iter()
            .find(|t| t.id() == attacker.id())
            .or_else(|| useful.first())
            .map(|t| t.id()),
        _ => pick_best(&useful, rng, |t| t.hit_points()),
    }
}

/// Highest-scoring candidate; ties broken by one RNG roll.
fn pick_best<K: Ord>(
    candidates: &[&Unit],
    rng: &mut dyn BattleRng,
    score: impl Fn(&Unit) -> K,
) -> Option<UnitId> {
    let best = candidates.iter().map(|&u| score(u)).max()?;
    let tied: Vec<UnitId> = candidates
        .iter()
        .copied()
        .filter(|&u| score(u) == best)
        .map(Unit::id)
        .collect();
    if tied.len() == 1 {
        return tied.first().copied();
    }
    let len = u32::try_from(tied.len()).unwrap_or(u32::MAX);
    let index = rng.roll(len) as usize;
    tied.get(index).copied()
}
