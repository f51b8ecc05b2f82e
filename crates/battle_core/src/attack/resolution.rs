//! Attack outcome computation.

use std::sync::Arc;

use crate::config::BattleConfig;
use crate::effects::{BattleEffect, BattleEffectType};
use crate::error::{BattleError, CommandRejection, Result};
use crate::events::{EventLog, UnitActionType};
use crate::field::Battlefield;
use crate::math::{reduce, scale};
use crate::provider::UnitTypeProvider;
use crate::rng::BattleRng;
use crate::unit::{AttackClass, ProtectionOutcome, Reach, Unit, UnitAttack, UnitId, UnitType};

use super::legality::{check_attack, AttackProcessorContext};

/// Look up the unit type a summon or transform attack produces.
///
/// Returns `None` for classes that need no template.
///
/// # Errors
///
/// Returns [`BattleError::ResourceMissing`] if the provider does not know
/// the template, or [`BattleError::InvariantViolation`] if the attack names
/// none.
pub fn template_for(
    attack: &UnitAttack,
    provider: &dyn UnitTypeProvider,
) -> Result<Option<Arc<UnitType>>> {
    if !attack.class.needs_template() {
        return Ok(None);
    }
    let id = attack.unit_type.as_ref().ok_or_else(|| {
        BattleError::InvariantViolation(format!("attack '{}' names no unit type", attack.name))
    })?;
    provider.unit_type(id).map(Some)
}

/// Applies attacks to a battlefield.
pub struct AttackResolver<'a> {
    rng: &'a mut dyn BattleRng,
    config: &'a BattleConfig,
    provider: &'a dyn UnitTypeProvider,
}

impl<'a> AttackResolver<'a> {
    /// Create a resolver rolling with `rng`.
    pub fn new(
        rng: &'a mut dyn BattleRng,
        config: &'a BattleConfig,
        provider: &'a dyn UnitTypeProvider,
    ) -> Self {
        Self {
            rng,
            config,
            provider,
        }
    }

    /// Resolve the main attack of `attacker` against `target`.
    ///
    /// Every lookup and legality check happens before the first mutation,
    /// so an `Err` leaves the battlefield untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidCommand`] if the attack is illegal and
    /// [`BattleError::ResourceMissing`] if a template cannot be found.
    pub fn resolve(
        &mut self,
        field: &mut Battlefield,
        attacker: UnitId,
        target: UnitId,
        log: &mut EventLog,
    ) -> Result<()> {
        let unit_type = Arc::clone(field.require(attacker)?.unit_type());
        let primary = &unit_type.primary_attack;
        let secondary = unit_type.secondary_attack.as_ref();
        let primary_template = template_for(primary, self.provider)?;
        let secondary_template = match secondary {
            Some(attack) => template_for(attack, self.provider)?,
            None => None,
        };

        {
            let ctx = AttackProcessorContext::new(field, attacker, target, primary)?
                .with_template(primary_template.as_deref());
            check_attack(&ctx)?;
        }

        let targets = affected_units(field, attacker, target, primary);
        log.push(attacker, UnitActionType::Attacking);
        tracing::debug!(%attacker, %target, attack = %primary.name, targets = targets.len(), "Resolving attack");

        for target in targets {
            let hit = self.apply(field, attacker, target, primary, primary_template.as_ref(), log)?;
            let Some(secondary) = secondary else {
                continue;
            };
            if !hit
                || !primary.class.deals_damage()
                || secondary.class.target_side() != primary.class.target_side()
            {
                continue;
            }
            if field.require(attacker)?.is_inactive() || field.require(target)?.is_inactive() {
                continue;
            }
            self.apply(field, attacker, target, secondary, secondary_template.as_ref(), log)?;
        }
        Ok(())
    }

    /// Resolve `attack` against one unit. Returns whether it landed.
    fn apply(
        &mut self,
        field: &mut Battlefield,
        attacker: UnitId,
        target: UnitId,
        attack: &UnitAttack,
        template: Option<&Arc<UnitType>>,
        log: &mut EventLog,
    ) -> Result<bool> {
        if attack.class.has_enemy_ability() {
            if !self.rng.chance(attack.accuracy) {
                log.push(target, UnitActionType::Miss);
                tracing::debug!(%attacker, %target, "Missed");
                return Ok(false);
            }
            match field.require_mut(target)?.absorb(attack) {
                ProtectionOutcome::Ward => {
                    log.push(target, UnitActionType::Ward);
                    return Ok(false);
                }
                ProtectionOutcome::Immunity => {
                    log.push(target, UnitActionType::Immunity);
                    return Ok(false);
                }
                ProtectionOutcome::None => {}
            }
        }

        let power = field.require(attacker)?.attack_power(attack);
        match attack.class {
            AttackClass::Damage | AttackClass::Drain => {
                let lost = strike(field.require_mut(target)?, power, log);
                if attack.class == AttackClass::Drain && lost > 0 {
                    let percent = i32::try_from(self.config.drain_percent).unwrap_or(i32::MAX);
                    let healed = field.require_mut(attacker)?.heal(scale(lost, percent));
                    log.push_with_power(attacker, UnitActionType::Drained, healed);
                }
            }
            AttackClass::Heal => {
                let healed = field.require_mut(target)?.heal(power);
                log.push_with_power(target, UnitActionType::Healed, healed);
            }
            AttackClass::Revive => {
                let restored = field
                    .require_mut(target)?
                    .revive(self.config.revive_hit_points_percent);
                log.push_with_power(target, UnitActionType::Revived, restored);
            }
            AttackClass::Cure => {
                let removed = field
                    .require_mut(target)?
                    .remove_effects(|e| e.kind.is_curable());
                log.push_with_power(target, UnitActionType::Cured, removed.len() as u32);
            }
            AttackClass::Fear => {
                field.require_mut(target)?.begin_retreat();
                log.push(target, UnitActionType::Frightened);
            }
            AttackClass::BestowWards => {
                let unit = field.require_mut(target)?;
                for &category in &attack.wards {
                    unit.add_ward(category);
                    log.push(target, UnitActionType::WardGranted);
                }
            }
            AttackClass::TransformOther => {
                let template = require_template(attack, template)?;
                let duration = attack.effect_duration();
                let unit = field.require_mut(target)?;
                unit.transform(Arc::clone(template));
                unit.add_effect(BattleEffect::new(BattleEffectType::Transform, duration, 0));
                log.push_full(target, UnitActionType::Transformed, None, Some(duration));
            }
            AttackClass::TransformSelf => {
                let template = require_template(attack, template)?;
                field.require_mut(attacker)?.transform(Arc::clone(template));
                log.push(attacker, UnitActionType::Transformed);
            }
            AttackClass::Doppelganger => {
                let copy = Arc::clone(field.require(target)?.unit_type());
                field.require_mut(attacker)?.transform(copy);
                log.push(attacker, UnitActionType::Transformed);
            }
            AttackClass::Summon => {
                let template = require_template(attack, template)?;
                self.summon(field, attacker, template, attack.effect_duration(), log)?;
            }
            AttackClass::Paralyze
            | AttackClass::Petrify
            | AttackClass::Poison
            | AttackClass::Frostbite
            | AttackClass::Blister
            | AttackClass::BoostDamage
            | AttackClass::LowerDamage
            | AttackClass::LowerInitiative => {
                let Some(kind) = attack.class.effect() else {
                    return Ok(true);
                };
                let duration = attack.effect_duration();
                field
                    .require_mut(target)?
                    .add_effect(BattleEffect::new(kind, duration, power));
                log.push_full(target, effect_action(kind), Some(power), Some(duration));
            }
        }
        Ok(true)
    }

    fn summon(
        &mut self,
        field: &mut Battlefield,
        summoner: UnitId,
        template: &Arc<UnitType>,
        turns: u8,
        log: &mut EventLog,
    ) -> Result<()> {
        let side = field
            .side_of(summoner)
            .ok_or(BattleError::UnitNotFound(summoner))?;
        let player = field.require(summoner)?.player();
        let position = field
            .squad(side)
            .free_position(template.size)
            .ok_or(CommandRejection::SquadFull)?;
        let id = field.next_unit_id();
        field
            .squad_mut(side)
            .add_unit(Unit::illusion(id, Arc::clone(template), player, position, turns))?;
        log.push_full(id, UnitActionType::Summoned, None, Some(turns));
        tracing::debug!(%summoner, summoned = %id, unit_type = %template.id, "Summoned illusion");
        Ok(())
    }
}

/// Deal armor-reduced damage, returning the hit points lost.
fn strike(unit: &mut Unit, power: u32, log: &mut EventLog) -> u32 {
    let dealt = if power == 0 {
        0
    } else {
        reduce(power, unit.armor()).max(1)
    };
    let lost = unit.apply_damage(dealt);
    log.push_with_power(unit.id(), UnitActionType::Damaged, lost);
    if unit.is_dead() {
        unit.clear_effects();
        log.push(unit.id(), UnitActionType::Died);
        tracing::debug!(unit = %unit.id(), "Died");
    }
    lost
}

fn require_template<'t>(
    attack: &UnitAttack,
    template: Option<&'t Arc<UnitType>>,
) -> Result<&'t Arc<UnitType>> {
    template.ok_or_else(|| {
        BattleError::InvariantViolation(format!("attack '{}' names no unit type", attack.name))
    })
}

/// Units an attack aimed at `target` lands on, in squad order.
fn affected_units(
    field: &Battlefield,
    attacker: UnitId,
    target: UnitId,
    attack: &UnitAttack,
) -> Vec<UnitId> {
    let single_target = matches!(
        attack.class,
        AttackClass::TransformSelf | AttackClass::Doppelganger | AttackClass::Summon
    );
    if attack.reach != Reach::All || single_target {
        return vec![target];
    }
    let Some(side) = field.side_of(target) else {
        return vec![target];
    };
    let squad = field.squad(side);
    let ids: Vec<UnitId> = if attack.class == AttackClass::Revive {
        squad
            .units()
            .iter()
            .filter(|u| u.is_dead() && !u.is_retreated() && !u.is_illusion())
            .map(Unit::id)
            .collect()
    } else {
        squad.active_units().map(Unit::id).collect()
    };
    tracing::trace!(%attacker, count = ids.len(), "Area attack");
    ids
}

/// Event announcing that an effect of `kind` was applied.
pub(crate) const fn effect_action(kind: BattleEffectType) -> UnitActionType {
    match kind {
        BattleEffectType::Defend => UnitActionType::Defending,
        BattleEffectType::Poison => UnitActionType::Poisoned,
        BattleEffectType::Frostbite => UnitActionType::Frostbitten,
        BattleEffectType::Blister => UnitActionType::Blistered,
        BattleEffectType::Paralyze => UnitActionType::Paralyzed,
        BattleEffectType::Petrify => UnitActionType::Petrified,
        BattleEffectType::BoostDamage => UnitActionType::DamageBoosted,
        BattleEffectType::LowerDamage => UnitActionType::DamageLowered,
        BattleEffectType::LowerInitiative => UnitActionType::InitiativeLowered,
        BattleEffectType::Transform => UnitActionType::Transformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Flank, Line, UnitPosition};
    use crate::provider::UnitTypeRegistry;
    use crate::rng::tests::ScriptedRng;
    use crate::squad::{Squad, SquadSide};
    use crate::unit::tests::test_type;
    use crate::unit::{AttackSource, PlayerId, ProtectionCategory, ProtectionKind};

    fn attack(class: AttackClass, source: AttackSource, reach: Reach, accuracy: u8, power: u32) -> UnitAttack {
        UnitAttack::new("test", class, source, reach, accuracy, power)
    }

    fn typed(id: &str, hit_points: u32, attack: UnitAttack) -> Arc<UnitType> {
        Arc::new(UnitType::new(id, hit_points, 50, attack))
    }

    fn squad(player: u8, units: Vec<(u32, Arc<UnitType>, Line, Flank)>) -> Squad {
        let mut squad = Squad::new(PlayerId(player));
        for (id, unit_type, line, flank) in units {
            squad
                .add_unit(Unit::new(
                    UnitId(id),
                    unit_type,
                    PlayerId(player),
                    UnitPosition::small(line, flank),
                ))
                .unwrap();
        }
        squad
    }

    fn duel(attacker: Arc<UnitType>, defender: Arc<UnitType>) -> Battlefield {
        Battlefield::new(
            squad(0, vec![(1, attacker, Line::Front, Flank::Center)]),
            squad(1, vec![(11, defender, Line::Front, Flank::Center)]),
        )
        .unwrap()
    }

    fn resolve(
        field: &mut Battlefield,
        rolls: &[u32],
        registry: &UnitTypeRegistry,
        attacker: u32,
        target: u32,
    ) -> Result<EventLog> {
        let mut rng = ScriptedRng::new(rolls);
        let config = BattleConfig::default();
        let mut log = EventLog::new();
        AttackResolver::new(&mut rng, &config, registry).resolve(
            field,
            UnitId(attacker),
            UnitId(target),
            &mut log,
        )?;
        Ok(log)
    }

    fn actions(log: &EventLog) -> Vec<(UnitId, UnitActionType)> {
        log.events().iter().map(|e| (e.unit, e.action)).collect()
    }

    #[test]
    fn test_guaranteed_hit_damage() {
        let mut field = duel(test_type("a", 20, 10), test_type("b", 15, 3));
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();

        let target = field.unit(UnitId(11)).unwrap();
        assert_eq!(target.hit_points(), 5);
        assert!(target.is_active());
        let damaged: Vec<_> = log
            .events()
            .iter()
            .filter(|e| e.action == UnitActionType::Damaged)
            .collect();
        assert_eq!(damaged.len(), 1);
        assert_eq!(damaged[0].unit, UnitId(11));
        assert_eq!(damaged[0].power, Some(10));
    }

    #[test]
    fn test_miss_roll() {
        let sword = attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 80, 10);
        let mut field = duel(typed("a", 20, sword), test_type("b", 15, 3));
        let log = resolve(&mut field, &[80], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 15);
        assert_eq!(
            actions(&log),
            vec![
                (UnitId(1), UnitActionType::Attacking),
                (UnitId(11), UnitActionType::Miss)
            ]
        );

        let log = resolve(&mut field, &[79], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert!(log.contains(UnitId(11), UnitActionType::Damaged));
    }

    #[test]
    fn test_heal_ally() {
        let heal = attack(AttackClass::Heal, AttackSource::Life, Reach::Any, 100, 8);
        let healer = typed("healer", 30, heal);
        let mut field = Battlefield::new(
            squad(
                0,
                vec![
                    (1, healer, Line::Back, Flank::Center),
                    (2, test_type("w", 20, 5), Line::Front, Flank::Center),
                ],
            ),
            squad(1, vec![(11, test_type("b", 15, 3), Line::Front, Flank::Center)]),
        )
        .unwrap();
        field.unit_mut(UnitId(2)).unwrap().apply_damage(15);

        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 2).unwrap();
        assert_eq!(field.unit(UnitId(2)).unwrap().hit_points(), 13);
        let healed: Vec<_> = log
            .events()
            .iter()
            .filter(|e| e.action == UnitActionType::Healed)
            .collect();
        assert_eq!(healed.len(), 1);
        assert_eq!(healed[0].power, Some(8));
    }

    #[test]
    fn test_fire_ward_absorbs() {
        let fire = ProtectionCategory::Source(AttackSource::Fire);
        let flame = attack(AttackClass::Damage, AttackSource::Fire, Reach::Any, 100, 30);
        let warded = Arc::new(
            UnitType::new("mage", 40, 40, test_type("x", 1, 1).primary_attack.clone())
                .with_protection(fire, ProtectionKind::Ward),
        );
        let mut field = duel(typed("a", 20, flame), warded);

        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        let target = field.unit(UnitId(11)).unwrap();
        assert!(log.contains(UnitId(11), UnitActionType::Ward));
        assert_eq!(target.hit_points(), 40);
        assert_eq!(target.ward_charges(fire), 0);

        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert!(log.contains(UnitId(11), UnitActionType::Damaged));
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 10);
    }

    #[test]
    fn test_armor_floors_damage_at_one() {
        let mut field = duel(
            test_type("a", 20, 1),
            Arc::new((*test_type("b", 15, 3)).clone().with_armor(90)),
        );
        resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 14);
    }

    #[test]
    fn test_kill_emits_died() {
        let mut field = duel(test_type("a", 20, 50), test_type("b", 15, 3));
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert_eq!(
            actions(&log),
            vec![
                (UnitId(1), UnitActionType::Attacking),
                (UnitId(11), UnitActionType::Damaged),
                (UnitId(11), UnitActionType::Died),
            ]
        );
        assert_eq!(log.events()[1].power, Some(15));
    }

    #[test]
    fn test_drain_heals_attacker() {
        let bite = attack(AttackClass::Drain, AttackSource::Death, Reach::Adjacent, 100, 20);
        let mut field = duel(typed("vampire", 60, bite), test_type("b", 50, 3));
        field.unit_mut(UnitId(1)).unwrap().apply_damage(30);
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 30);
        assert_eq!(field.unit(UnitId(1)).unwrap().hit_points(), 40);
        assert!(log.contains(UnitId(1), UnitActionType::Drained));
    }

    #[test]
    fn test_area_attack_rolls_per_unit() {
        let storm = attack(AttackClass::Damage, AttackSource::Air, Reach::All, 50, 5);
        let mut field = Battlefield::new(
            squad(0, vec![(1, typed("mage", 30, storm), Line::Back, Flank::Center)]),
            squad(
                1,
                vec![
                    (11, test_type("b", 20, 3), Line::Front, Flank::Top),
                    (12, test_type("b", 20, 3), Line::Front, Flank::Center),
                    (13, test_type("b", 20, 3), Line::Front, Flank::Bottom),
                ],
            ),
        )
        .unwrap();
        let log = resolve(&mut field, &[10, 90, 10], &UnitTypeRegistry::new(), 1, 12).unwrap();
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 15);
        assert_eq!(field.unit(UnitId(12)).unwrap().hit_points(), 20);
        assert_eq!(field.unit(UnitId(13)).unwrap().hit_points(), 15);
        assert!(log.contains(UnitId(12), UnitActionType::Miss));
    }

    #[test]
    fn test_secondary_follows_damage_hit() {
        let sting = attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5);
        let venom = attack(AttackClass::Poison, AttackSource::Death, Reach::Adjacent, 100, 4);
        let spider = Arc::new(UnitType::new("spider", 30, 60, sting).with_secondary(venom));
        let mut field = duel(spider, test_type("b", 40, 3));
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();

        let target = field.unit(UnitId(11)).unwrap();
        assert_eq!(target.hit_points(), 35);
        assert!(target.has_effect(BattleEffectType::Poison));
        let poisoned = log
            .events()
            .iter()
            .find(|e| e.action == UnitActionType::Poisoned)
            .unwrap();
        assert_eq!(poisoned.power, Some(4));
        assert_eq!(poisoned.duration, Some(3));
    }

    #[test]
    fn test_secondary_for_other_side_skipped() {
        let sting = attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5);
        let mend = attack(AttackClass::Heal, AttackSource::Life, Reach::Adjacent, 100, 20);
        let odd = Arc::new(UnitType::new("odd", 30, 60, sting).with_secondary(mend));
        let mut field = duel(odd, test_type("b", 40, 3));
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 35);
        assert!(!log.contains(UnitId(11), UnitActionType::Healed));
    }

    #[test]
    fn test_secondary_skipped_on_miss() {
        let sting = attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 50, 5);
        let venom = attack(AttackClass::Poison, AttackSource::Death, Reach::Adjacent, 100, 4);
        let spider = Arc::new(UnitType::new("spider", 30, 60, sting).with_secondary(venom));
        let mut field = duel(spider, test_type("b", 40, 3));
        resolve(&mut field, &[99], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert!(field.unit(UnitId(11)).unwrap().effects().is_empty());
    }

    #[test]
    fn test_summon_places_illusion() {
        let call = attack(AttackClass::Summon, AttackSource::Mind, Reach::Any, 100, 0)
            .with_unit_type(crate::unit::UnitTypeId::new("phantom"))
            .with_duration(2);
        let mut registry = UnitTypeRegistry::new();
        registry.insert(test_type("phantom", 12, 4));
        let mut field = duel(typed("summoner", 30, call), test_type("b", 40, 3));

        let log = resolve(&mut field, &[], &registry, 1, 1).unwrap();
        let summoned = field.unit(UnitId(12)).unwrap();
        assert!(summoned.is_illusion());
        assert_eq!(summoned.illusion_turns(), Some(2));
        assert_eq!(field.side_of(UnitId(12)), Some(SquadSide::Attacker));
        assert_eq!(summoned.position(), UnitPosition::small(Line::Front, Flank::Top));
        assert!(log.contains(UnitId(12), UnitActionType::Summoned));
    }

    #[test]
    fn test_missing_template_leaves_field_untouched() {
        let call = attack(AttackClass::Summon, AttackSource::Mind, Reach::Any, 100, 0)
            .with_unit_type(crate::unit::UnitTypeId::new("phantom"));
        let mut field = duel(typed("summoner", 30, call), test_type("b", 40, 3));
        let err = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 1).unwrap_err();
        assert!(matches!(err, BattleError::ResourceMissing(_)));
        assert_eq!(field.squad(SquadSide::Attacker).len(), 1);
    }

    #[test]
    fn test_transform_other_adds_timed_effect() {
        let hex = attack(AttackClass::TransformOther, AttackSource::Mind, Reach::Any, 100, 0)
            .with_unit_type(crate::unit::UnitTypeId::new("frog"));
        let mut registry = UnitTypeRegistry::new();
        registry.insert(test_type("frog", 10, 1));
        let mut field = duel(typed("witch", 30, hex), test_type("b", 40, 3));

        resolve(&mut field, &[], &registry, 1, 11).unwrap();
        let target = field.unit(UnitId(11)).unwrap();
        assert!(target.is_transformed());
        assert_eq!(target.unit_type().id.0, "frog");
        assert_eq!(target.hit_points(), 10);
        assert!(target.has_effect(BattleEffectType::Transform));
    }

    #[test]
    fn test_illegal_attack_rejected() {
        let mut field = duel(test_type("a", 20, 10), test_type("b", 15, 3));
        let err = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 1).unwrap_err();
        assert!(matches!(
            err,
            BattleError::InvalidCommand(CommandRejection::WrongSide)
        ));
    }

    #[test]
    fn test_fear_starts_retreat() {
        let howl = attack(AttackClass::Fear, AttackSource::Mind, Reach::Any, 100, 0);
        let mut field = duel(typed("banshee", 30, howl), test_type("b", 40, 3));
        let log = resolve(&mut field, &[], &UnitTypeRegistry::new(), 1, 11).unwrap();
        assert!(field.unit(UnitId(11)).unwrap().is_retreating());
        assert!(log.contains(UnitId(11), UnitActionType::Frightened));
    }
}
