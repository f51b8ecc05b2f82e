//! Attack resolution against hand-built battlefields.

use std::sync::Arc;

use battle_core::events::EventLog;
use battle_core::prelude::*;
use battle_test_utils::fixtures::ScriptedRng;

fn attack(class: AttackClass, source: AttackSource, reach: Reach, accuracy: u8, power: u32) -> UnitAttack {
    UnitAttack::new("attack", class, source, reach, accuracy, power)
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

fn resolve(field: &mut Battlefield, rng: &mut ScriptedRng, attacker: u32, target: u32) -> EventLog {
    let config = BattleConfig::default();
    let registry = UnitTypeRegistry::new();
    let mut log = EventLog::new();
    AttackResolver::new(rng, &config, &registry)
        .resolve(field, UnitId(attacker), UnitId(target), &mut log)
        .unwrap();
    log
}

fn events_for(log: &EventLog, unit: u32, action: UnitActionType) -> Vec<UnitActionEvent> {
    log.events()
        .iter()
        .filter(|e| e.unit == UnitId(unit) && e.action == action)
        .copied()
        .collect()
}

#[test]
fn test_guaranteed_hit_deals_full_damage() {
    let a = Arc::new(UnitType::new(
        "a",
        20,
        50,
        attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 10),
    ));
    let b = Arc::new(UnitType::new(
        "b",
        15,
        40,
        attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 1),
    ));
    let mut field = Battlefield::new(
        squad(0, vec![(1, a, Line::Front, Flank::Center)]),
        squad(1, vec![(2, b, Line::Front, Flank::Center)]),
    )
    .unwrap();

    let log = resolve(&mut field, &mut ScriptedRng::new(&[]), 1, 2);

    let target = field.unit(UnitId(2)).unwrap();
    assert_eq!(target.hit_points(), 5);
    assert!(target.is_active());
    let damaged = events_for(&log, 2, UnitActionType::Damaged);
    assert_eq!(damaged.len(), 1);
    assert_eq!(damaged[0].power, Some(10));
}

#[test]
fn test_heal_restores_ally() {
    let healer = Arc::new(UnitType::new(
        "healer",
        30,
        40,
        attack(AttackClass::Heal, AttackSource::Life, Reach::Any, 100, 8),
    ));
    let warrior = Arc::new(UnitType::new(
        "warrior",
        20,
        50,
        attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5),
    ));
    let foe = Arc::new(UnitType::new(
        "foe",
        20,
        50,
        attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5),
    ));
    let mut field = Battlefield::new(
        squad(
            0,
            vec![
                (1, healer, Line::Back, Flank::Center),
                (2, warrior, Line::Front, Flank::Center),
            ],
        ),
        squad(1, vec![(11, foe, Line::Front, Flank::Center)]),
    )
    .unwrap();
    field.unit_mut(UnitId(2)).unwrap().apply_damage(15);

    {
        let healer = field.unit(UnitId(1)).unwrap();
        let ctx = AttackProcessorContext::new(
            &field,
            UnitId(1),
            UnitId(2),
            &healer.unit_type().primary_attack,
        )
        .unwrap();
        assert!(can_attack(&ctx));
    }

    let log = resolve(&mut field, &mut ScriptedRng::new(&[]), 1, 2);

    assert_eq!(field.unit(UnitId(2)).unwrap().hit_points(), 13);
    assert_eq!(events_for(&log, 2, UnitActionType::Healed).len(), 1);
}

fn fire_duel(protection: ProtectionKind) -> Battlefield {
    let mage = Arc::new(UnitType::new(
        "mage",
        30,
        50,
        attack(AttackClass::Damage, AttackSource::Fire, Reach::Any, 100, 10),
    ));
    let warded = Arc::new(
        UnitType::new(
            "warded",
            50,
            40,
            attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5),
        )
        .with_protection(ProtectionCategory::Source(AttackSource::Fire), protection),
    );
    Battlefield::new(
        squad(0, vec![(1, mage, Line::Back, Flank::Center)]),
        squad(1, vec![(11, warded, Line::Front, Flank::Center)]),
    )
    .unwrap()
}

#[test]
fn test_fire_ward_absorbs_one_attack() {
    let mut field = fire_duel(ProtectionKind::Ward);
    let fire = ProtectionCategory::Source(AttackSource::Fire);
    assert_eq!(field.unit(UnitId(11)).unwrap().ward_charges(fire), 1);

    let log = resolve(&mut field, &mut ScriptedRng::new(&[]), 1, 11);

    let target = field.unit(UnitId(11)).unwrap();
    assert_eq!(target.hit_points(), 50);
    assert_eq!(target.ward_charges(fire), 0);
    assert_eq!(events_for(&log, 11, UnitActionType::Ward).len(), 1);
    assert!(events_for(&log, 11, UnitActionType::Damaged).is_empty());
}

#[test]
fn test_ward_charges_then_full_effect() {
    let mut field = fire_duel(ProtectionKind::Ward);
    let fire = ProtectionCategory::Source(AttackSource::Fire);
    field.unit_mut(UnitId(11)).unwrap().add_ward(fire);
    assert_eq!(field.unit(UnitId(11)).unwrap().ward_charges(fire), 2);

    let mut rng = ScriptedRng::new(&[]);
    for _ in 0..2 {
        let log = resolve(&mut field, &mut rng, 1, 11);
        assert_eq!(events_for(&log, 11, UnitActionType::Ward).len(), 1);
    }
    let log = resolve(&mut field, &mut rng, 1, 11);
    assert_eq!(events_for(&log, 11, UnitActionType::Damaged).len(), 1);
    assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 40);
}

#[test]
fn test_immunity_never_runs_out() {
    let mut field = fire_duel(ProtectionKind::Immunity);
    let mut rng = ScriptedRng::new(&[]);
    for _ in 0..5 {
        let log = resolve(&mut field, &mut rng, 1, 11);
        assert_eq!(events_for(&log, 11, UnitActionType::Immunity).len(), 1);
    }
    assert_eq!(field.unit(UnitId(11)).unwrap().hit_points(), 50);
}

fn area_field() -> Battlefield {
    let storm = Arc::new(UnitType::new(
        "storm",
        30,
        50,
        attack(AttackClass::Damage, AttackSource::Air, Reach::All, 50, 10),
    ));
    let grunt = || {
        Arc::new(UnitType::new(
            "grunt",
            40,
            40,
            attack(AttackClass::Damage, AttackSource::Weapon, Reach::Adjacent, 100, 5),
        ))
    };
    Battlefield::new(
        squad(0, vec![(1, storm, Line::Back, Flank::Center)]),
        squad(
            1,
            vec![
                (11, grunt(), Line::Front, Flank::Top),
                (12, grunt(), Line::Front, Flank::Center),
                (13, grunt(), Line::Front, Flank::Bottom),
            ],
        ),
    )
    .unwrap()
}

#[test]
fn test_area_attack_rolls_each_unit_independently() {
    let mut mixed = area_field();
    let log = resolve(&mut mixed, &mut ScriptedRng::new(&[10, 90, 10]), 1, 12);
    assert_eq!(mixed.unit(UnitId(11)).unwrap().hit_points(), 30);
    assert_eq!(mixed.unit(UnitId(12)).unwrap().hit_points(), 40);
    assert_eq!(mixed.unit(UnitId(13)).unwrap().hit_points(), 30);
    assert_eq!(events_for(&log, 12, UnitActionType::Miss).len(), 1);

    let mut all_hit = area_field();
    resolve(&mut all_hit, &mut ScriptedRng::new(&[10, 10, 10]), 1, 12);
    assert_eq!(
        all_hit.unit(UnitId(13)).unwrap().hit_points(),
        mixed.unit(UnitId(13)).unwrap().hit_points()
    );
}

#[test]
fn test_legality_check_has_no_side_effects() {
    let field = area_field();
    let attacker = field.unit(UnitId(1)).unwrap();
    let ctx = AttackProcessorContext::new(&field, UnitId(1), UnitId(11), &attacker.unit_type().primary_attack)
        .unwrap();
    let first = check_attack(&ctx);
    let second = check_attack(&ctx);
    assert_eq!(first, second);
    assert_eq!(first, Ok(()));
}
