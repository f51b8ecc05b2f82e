//! Unit data files.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::unit::{AttackClass, UnitType};

/// A RON file listing unit types.
///
/// # Example RON
///
/// ```ron
/// UnitDataFile(
///     units: [
///         UnitType(
///             id: "squire",
///             name: "Squire",
///             hit_points: 100,
///             initiative: 50,
///             primary_attack: UnitAttack(
///                 name: "Sword",
///                 class: Damage,
///                 source: Weapon,
///                 reach: Adjacent,
///                 accuracy: 80,
///                 power: 25,
///             ),
///             xp_on_kill: 20,
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDataFile {
    /// Unit types in file order.
    pub units: Vec<UnitType>,
}

impl UnitDataFile {
    /// Parse a data file from RON text.
    ///
    /// # Errors
    ///
    /// Returns the RON error if the text is not a valid data file.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Check the file for problems a battle would trip over.
    ///
    /// Returns one message per problem; an empty list means the file is
    /// usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(&unit.id) {
                errors.push(format!("duplicate unit type id '{}'", unit.id));
            }
        }

        for unit in &self.units {
            validate_unit(unit, &seen, &mut errors);
        }
        errors
    }
}

fn validate_unit(
    unit: &UnitType,
    known: &HashSet<&crate::unit::UnitTypeId>,
    errors: &mut Vec<String>,
) {
    let id = &unit.id;
    if unit.hit_points == 0 {
        errors.push(format!("{id}: hit_points must be positive"));
    }
    if !(1..=2).contains(&unit.attacks_per_turn) {
        errors.push(format!(
            "{id}: attacks_per_turn must be 1 or 2, got {}",
            unit.attacks_per_turn
        ));
    }
    if let Some(secondary) = &unit.secondary_attack {
        if secondary.class.target_side() != unit.primary_attack.class.target_side() {
            errors.push(format!(
                "{id}: secondary attack '{}' targets {:?}, primary attack targets {:?}",
                secondary.name,
                secondary.class.target_side(),
                unit.primary_attack.class.target_side()
            ));
        }
    }
    for attack in unit.attacks() {
        if attack.accuracy > 100 {
            errors.push(format!(
                "{id}: attack '{}' has accuracy {} above 100",
                attack.name, attack.accuracy
            ));
        }
        match &attack.unit_type {
            Some(template) if !known.contains(template) => errors.push(format!(
                "{id}: attack '{}' refers to unknown unit type '{template}'",
                attack.name
            )),
            None if attack.class.needs_template() => errors.push(format!(
                "{id}: attack '{}' of class {:?} needs a unit_type",
                attack.name, attack.class
            )),
            _ => {}
        }
        if attack.class == AttackClass::BestowWards && attack.wards.is_empty() {
            errors.push(format!(
                "{id}: attack '{}' bestows no wards",
                attack.name
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        UnitDataFile(
            units: [
                UnitType(
                    id: "squire",
                    name: "Squire",
                    hit_points: 100,
                    initiative: 50,
                    primary_attack: UnitAttack(
                        name: "Sword",
                        class: Damage,
                        source: Weapon,
                        reach: Adjacent,
                        accuracy: 80,
                        power: 25,
                    ),
                    xp_on_kill: 20,
                ),
                UnitType(
                    id: "apprentice",
                    name: "Apprentice",
                    hit_points: 35,
                    initiative: 40,
                    primary_attack: UnitAttack(
                        name: "Lightning",
                        class: Damage,
                        source: Air,
                        reach: All,
                        accuracy: 80,
                        power: 15,
                    ),
                    protections: [
                        Protection(category: Source(Air), kind: Immunity),
                    ],
                ),
            ],
        )
    "#;

    #[test]
    fn test_parse_sample() {
        let file = UnitDataFile::from_ron(SAMPLE).unwrap();
        assert_eq!(file.units.len(), 2);
        assert_eq!(file.units[0].attacks_per_turn, 1);
        assert_eq!(file.units[0].level, 1);
        assert_eq!(file.units[1].protections.len(), 1);
        assert!(file.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut file = UnitDataFile::from_ron(SAMPLE).unwrap();
        file.units[1].id = file.units[0].id.clone();
        file.units[0].hit_points = 0;
        file.units[0].primary_attack.accuracy = 120;
        file.units[0].primary_attack.class = AttackClass::Summon;

        let errors = file.validate();
        assert!(errors.iter().any(|e| e.contains("duplicate")));
        assert!(errors.iter().any(|e| e.contains("hit_points")));
        assert!(errors.iter().any(|e| e.contains("accuracy")));
        assert!(errors.iter().any(|e| e.contains("needs a unit_type")));
    }

    #[test]
    fn test_dangling_template() {
        let mut file = UnitDataFile::from_ron(SAMPLE).unwrap();
        file.units[0].primary_attack.class = AttackClass::Summon;
        file.units[0].primary_attack.unit_type = Some(crate::unit::UnitTypeId::new("ghost"));
        let errors = file.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown unit type 'ghost'"));
    }

    #[test]
    fn test_secondary_must_share_target_side() {
        let mut file = UnitDataFile::from_ron(SAMPLE).unwrap();
        let mut mend = file.units[0].primary_attack.clone();
        mend.name = "Mend".to_string();
        mend.class = AttackClass::Heal;
        file.units[0].secondary_attack = Some(mend);
        let errors = file.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("secondary attack 'Mend'"));
    }
}
