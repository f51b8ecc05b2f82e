//! Unit types, attacks, and unit instances.
//!
//! [`UnitType`] and [`UnitAttack`] are immutable resource data shared
//! between every unit of the same kind. A [`Unit`] is one combatant in a
//! battle: it carries the mutable combat state and derives its effective
//! stats from its type, level and active effects whenever they are queried.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::effects::{BattleEffect, BattleEffectType};
use crate::math::{reduce, scale};
use crate::position::{UnitPosition, UnitSize};

/// Hit points and attack power gained per level above the type's base level, in percent.
pub const LEVEL_BONUS_PERCENT: i32 = 10;

/// Armor added while a unit defends.
pub const DEFEND_ARMOR_BONUS: u32 = 50;

/// Armor cap; no unit shrugs off more than this share of a hit.
pub const MAX_ARMOR: u32 = 90;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a unit within a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resource identifier of a unit type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTypeId(pub String);

impl UnitTypeId {
    /// Create a unit type ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UnitTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Player owning a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

// ============================================================================
// Attack definitions
// ============================================================================

/// Which side an attack class may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSide {
    /// Units of the opposing player.
    Enemies,
    /// Units of the attacker's own player.
    Allies,
}

/// What an attack does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackClass {
    /// Plain damage.
    Damage,
    /// Damage that heals the attacker for part of the damage dealt.
    Drain,
    /// Target loses its next turn.
    Paralyze,
    /// Target is turned to stone for a few turns.
    Petrify,
    /// Target flees the battle.
    Fear,
    /// Damage over time.
    Poison,
    /// Damage over time.
    Frostbite,
    /// Damage over time.
    Blister,
    /// Restores hit points.
    Heal,
    /// Brings a dead ally back.
    Revive,
    /// Removes harmful effects.
    Cure,
    /// Raises the target's damage.
    BoostDamage,
    /// Lowers the target's damage.
    LowerDamage,
    /// Lowers the target's initiative.
    LowerInitiative,
    /// Grants ward charges.
    BestowWards,
    /// Attacker turns into another unit type for the rest of the battle.
    TransformSelf,
    /// Target turns into another unit type for a few turns.
    TransformOther,
    /// Attacker copies the target's unit type.
    Doppelganger,
    /// Calls an illusion into a free cell of the attacker's squad.
    Summon,
}

impl AttackClass {
    /// Side this class may target.
    #[must_use]
    pub const fn target_side(self) -> TargetSide {
        match self {
            Self::Heal
            | Self::Revive
            | Self::Cure
            | Self::BoostDamage
            | Self::BestowWards
            | Self::TransformSelf
            | Self::Summon => TargetSide::Allies,
            Self::Damage
            | Self::Drain
            | Self::Paralyze
            | Self::Petrify
            | Self::Fear
            | Self::Poison
            | Self::Frostbite
            | Self::Blister
            | Self::LowerDamage
            | Self::LowerInitiative
            | Self::TransformOther
            | Self::Doppelganger => TargetSide::Enemies,
        }
    }

    /// Whether the attack helps its target.
    #[must_use]
    pub const fn has_ally_ability(self) -> bool {
        matches!(self.target_side(), TargetSide::Allies)
    }

    /// Whether the attack harms its target.
    #[must_use]
    pub const fn has_enemy_ability(self) -> bool {
        matches!(self.target_side(), TargetSide::Enemies)
    }

    /// Whether the attack deals direct damage.
    #[must_use]
    pub const fn deals_damage(self) -> bool {
        matches!(self, Self::Damage | Self::Drain)
    }

    /// Effect attached to the target, if the class works through one.
    #[must_use]
    pub const fn effect(self) -> Option<BattleEffectType> {
        match self {
            Self::Paralyze => Some(BattleEffectType::Paralyze),
            Self::Petrify => Some(BattleEffectType::Petrify),
            Self::Poison => Some(BattleEffectType::Poison),
            Self::Frostbite => Some(BattleEffectType::Frostbite),
            Self::Blister => Some(BattleEffectType::Blister),
            Self::BoostDamage => Some(BattleEffectType::BoostDamage),
            Self::LowerDamage => Some(BattleEffectType::LowerDamage),
            Self::LowerInitiative => Some(BattleEffectType::LowerInitiative),
            Self::TransformOther => Some(BattleEffectType::Transform),
            _ => None,
        }
    }

    /// Whether the class needs a unit type template.
    #[must_use]
    pub const fn needs_template(self) -> bool {
        matches!(
            self,
            Self::TransformSelf | Self::TransformOther | Self::Summon
        )
    }
}

/// Element or medium an attack is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackSource {
    /// Blades, arrows, claws.
    Weapon,
    /// Mind magic.
    Mind,
    /// Life magic.
    Life,
    /// Death magic.
    Death,
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Earth.
    Earth,
    /// Air.
    Air,
}

/// Targeting scope of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reach {
    /// Any single unit, regardless of the grid.
    Any,
    /// Every unit of the target squad.
    All,
    /// A single unit the attacker can reach in melee.
    Adjacent,
}

/// Category a protection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtectionCategory {
    /// Protects against an attack class.
    Class(AttackClass),
    /// Protects against an attack source.
    Source(AttackSource),
}

impl ProtectionCategory {
    /// Whether the category covers `attack`.
    #[must_use]
    pub fn matches(&self, attack: &UnitAttack) -> bool {
        match *self {
            Self::Class(class) => class == attack.class,
            Self::Source(source) => source == attack.source,
        }
    }
}

/// Strength of a protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtectionKind {
    /// Absorbs one attack, then is spent.
    Ward,
    /// Absorbs every attack.
    Immunity,
}

/// A protection of a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protection {
    /// What the protection covers.
    pub category: ProtectionCategory,
    /// How strong it is.
    pub kind: ProtectionKind,
}

/// Immutable attack definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAttack {
    /// Display name.
    pub name: String,
    /// What the attack does.
    pub class: AttackClass,
    /// What it is delivered through.
    pub source: AttackSource,
    /// Targeting scope.
    pub reach: Reach,
    /// Chance to hit, in percent.
    pub accuracy: u8,
    /// Damage, healing or effect strength.
    pub power: u32,
    /// Effect duration in the target's turns; class default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u8>,
    /// Template for summons and transformations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<UnitTypeId>,
    /// Protections granted by ward-bestowing attacks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wards: Vec<ProtectionCategory>,
}

impl UnitAttack {
    /// Create an attack with no duration override, template, or wards.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        class: AttackClass,
        source: AttackSource,
        reach: Reach,
        accuracy: u8,
        power: u32,
    ) -> Self {
        Self {
            name: name.into(),
            class,
            source,
            reach,
            accuracy,
            power,
            duration: None,
            unit_type: None,
            wards: Vec::new(),
        }
    }

    /// Builder method to override the effect duration.
    #[must_use]
    pub fn with_duration(mut self, duration: u8) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Builder method to set the summon/transform template.
    #[must_use]
    pub fn with_unit_type(mut self, unit_type: UnitTypeId) -> Self {
        self.unit_type = Some(unit_type);
        self
    }

    /// Builder method to set the granted wards.
    #[must_use]
    pub fn with_wards(mut self, wards: Vec<ProtectionCategory>) -> Self {
        self.wards = wards;
        self
    }

    /// Duration of the effect this attack applies.
    #[must_use]
    pub fn effect_duration(&self) -> u8 {
        self.duration.unwrap_or_else(|| {
            self.class
                .effect()
                .map_or(1, BattleEffectType::default_duration)
        })
    }
}

// ============================================================================
// Unit types
// ============================================================================

/// Faction a unit type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Race {
    /// The Empire.
    Empire,
    /// The Mountain Clans.
    MountainClans,
    /// The Legions of the Damned.
    Legions,
    /// The Undead Hordes.
    Undead,
    /// The Elven Alliance.
    Elves,
    /// Neutral creatures.
    #[default]
    Neutral,
}

/// Immutable unit type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Resource identifier.
    pub id: UnitTypeId,
    /// Display name.
    pub name: String,
    /// Faction.
    #[serde(default)]
    pub race: Race,
    /// Cells covered.
    #[serde(default)]
    pub size: UnitSize,
    /// Hit points at the base level.
    pub hit_points: u32,
    /// Damage reduction in percent.
    #[serde(default)]
    pub armor: u32,
    /// Turn order priority.
    pub initiative: u32,
    /// Main attack.
    pub primary_attack: UnitAttack,
    /// Attack applied to the same target after the main attack hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_attack: Option<UnitAttack>,
    /// Actions per turn (1, or 2 for double attackers).
    #[serde(default = "default_attacks_per_turn")]
    pub attacks_per_turn: u8,
    /// Wards and immunities.
    #[serde(default)]
    pub protections: Vec<Protection>,
    /// Base level.
    #[serde(default = "default_level")]
    pub level: u16,
    /// Experience needed for the next level.
    #[serde(default = "default_xp_to_level")]
    pub xp_to_level: u32,
    /// Experience granted to the victors for killing this unit.
    #[serde(default)]
    pub xp_on_kill: u32,
}

const fn default_attacks_per_turn() -> u8 {
    1
}

const fn default_level() -> u16 {
    1
}

const fn default_xp_to_level() -> u32 {
    100
}

impl UnitType {
    /// Create a unit type with default level, experience and no protections.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        hit_points: u32,
        initiative: u32,
        primary_attack: UnitAttack,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: UnitTypeId(id),
            race: Race::default(),
            size: UnitSize::Small,
            hit_points,
            armor: 0,
            initiative,
            primary_attack,
            secondary_attack: None,
            attacks_per_turn: 1,
            protections: Vec::new(),
            level: 1,
            xp_to_level: 100,
            xp_on_kill: 0,
        }
    }

    /// Builder method to set the secondary attack.
    #[must_use]
    pub fn with_secondary(mut self, attack: UnitAttack) -> Self {
        self.secondary_attack = Some(attack);
        self
    }

    /// Builder method to add a protection.
    #[must_use]
    pub fn with_protection(mut self, category: ProtectionCategory, kind: ProtectionKind) -> Self {
        self.protections.push(Protection { category, kind });
        self
    }

    /// Builder method to set the size.
    #[must_use]
    pub fn with_size(mut self, size: UnitSize) -> Self {
        self.size = size;
        self
    }

    /// Builder method to set the armor.
    #[must_use]
    pub fn with_armor(mut self, armor: u32) -> Self {
        self.armor = armor;
        self
    }

    /// Builder method to set actions per turn.
    #[must_use]
    pub fn with_attacks_per_turn(mut self, attacks: u8) -> Self {
        self.attacks_per_turn = attacks;
        self
    }

    /// Builder method to set experience values.
    #[must_use]
    pub fn with_experience(mut self, xp_to_level: u32, xp_on_kill: u32) -> Self {
        self.xp_to_level = xp_to_level;
        self.xp_on_kill = xp_on_kill;
        self
    }

    /// Whether the type is immune to `attack`.
    #[must_use]
    pub fn is_immune_to(&self, attack: &UnitAttack) -> bool {
        self.protections
            .iter()
            .any(|p| p.kind == ProtectionKind::Immunity && p.category.matches(attack))
    }

    /// Attacks of this type, main attack first.
    pub fn attacks(&self) -> impl Iterator<Item = &UnitAttack> {
        std::iter::once(&self.primary_attack).chain(self.secondary_attack.as_ref())
    }
}

// ============================================================================
// Units
// ============================================================================

/// Remaining single-use protection charges against one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WardCharge {
    /// What the ward covers.
    pub category: ProtectionCategory,
    /// Attacks it still absorbs.
    pub charges: u32,
}

/// How a unit's protections handled an incoming attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionOutcome {
    /// The attack passes.
    None,
    /// A ward charge was consumed.
    Ward,
    /// The unit is immune.
    Immunity,
}

/// Retreat progress of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RetreatState {
    /// Fighting.
    #[default]
    Fighting,
    /// Leaves at its next turn.
    Retreating,
    /// Left the battle.
    Retreated,
}

/// A combatant taking part in a battle.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    unit_type: Arc<UnitType>,
    original_type: Option<Arc<UnitType>>,
    player: PlayerId,
    position: UnitPosition,
    hit_points: u32,
    level: u16,
    experience: u32,
    effects: Vec<BattleEffect>,
    wards: Vec<WardCharge>,
    retreat: RetreatState,
    illusion_turns: Option<u8>,
    dissipated: bool,
    has_waited: bool,
}

impl Unit {
    /// Create a unit at full health and the type's base level.
    ///
    /// The position's size is taken from the unit type.
    #[must_use]
    pub fn new(
        id: UnitId,
        unit_type: Arc<UnitType>,
        player: PlayerId,
        position: UnitPosition,
    ) -> Self {
        let position = UnitPosition::new(position.line, position.flank, unit_type.size);
        let wards = unit_type
            .protections
            .iter()
            .filter(|p| p.kind == ProtectionKind::Ward)
            .map(|p| WardCharge {
                category: p.category,
                charges: 1,
            })
            .collect();
        Self {
            id,
            hit_points: unit_type.hit_points,
            level: unit_type.level,
            unit_type,
            original_type: None,
            player,
            position,
            experience: 0,
            effects: Vec::new(),
            wards,
            retreat: RetreatState::Fighting,
            illusion_turns: None,
            dissipated: false,
            has_waited: false,
        }
    }

    /// Create a summoned illusion that lasts `turns` of its own turns.
    #[must_use]
    pub fn illusion(
        id: UnitId,
        unit_type: Arc<UnitType>,
        player: PlayerId,
        position: UnitPosition,
        turns: u8,
    ) -> Self {
        let mut unit = Self::new(id, unit_type, player, position);
        unit.illusion_turns = Some(turns);
        unit
    }

    /// Builder method to set the level, refilling hit points to the new maximum.
    #[must_use]
    pub fn with_level(mut self, level: u16) -> Self {
        self.level = level.max(self.base_type().level);
        self.hit_points = self.max_hit_points();
        self
    }

    /// Builder method to set current hit points (clamped to the maximum).
    #[must_use]
    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = hit_points.min(self.max_hit_points());
        self
    }

    /// Builder method to set accumulated experience.
    #[must_use]
    pub fn with_experience(mut self, experience: u32) -> Self {
        self.experience = experience;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Current unit type (the foreign one while transformed).
    #[must_use]
    pub fn unit_type(&self) -> &Arc<UnitType> {
        &self.unit_type
    }

    /// Unit type the unit entered the battle with.
    #[must_use]
    pub fn base_type(&self) -> &Arc<UnitType> {
        self.original_type.as_ref().unwrap_or(&self.unit_type)
    }

    /// Whether the unit currently wears a foreign unit type.
    #[must_use]
    pub const fn is_transformed(&self) -> bool {
        self.original_type.is_some()
    }

    /// Owning player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Position in the squad.
    #[must_use]
    pub const fn position(&self) -> UnitPosition {
        self.position
    }

    /// Current hit points.
    #[must_use]
    pub const fn hit_points(&self) -> u32 {
        self.hit_points
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u16 {
        self.level
    }

    /// Accumulated experience.
    #[must_use]
    pub const fn experience(&self) -> u32 {
        self.experience
    }

    /// Active effects in application order.
    #[must_use]
    pub fn effects(&self) -> &[BattleEffect] {
        &self.effects
    }

    /// Remaining ward charges.
    #[must_use]
    pub fn wards(&self) -> &[WardCharge] {
        &self.wards
    }

    /// Retreat progress.
    #[must_use]
    pub const fn retreat_state(&self) -> RetreatState {
        self.retreat
    }

    /// Turns left for a summoned illusion; `None` for real units.
    #[must_use]
    pub const fn illusion_turns(&self) -> Option<u8> {
        self.illusion_turns
    }

    /// Whether the unit is a summoned illusion.
    #[must_use]
    pub const fn is_illusion(&self) -> bool {
        self.illusion_turns.is_some()
    }

    /// Whether the unit already waited this round.
    #[must_use]
    pub const fn has_waited(&self) -> bool {
        self.has_waited
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    /// Whether the unit has no hit points left.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hit_points == 0
    }

    /// Whether the unit is on its way out of the battle.
    #[must_use]
    pub fn is_retreating(&self) -> bool {
        self.retreat == RetreatState::Retreating
    }

    /// Whether the unit has left the battle.
    #[must_use]
    pub fn is_retreated(&self) -> bool {
        self.retreat == RetreatState::Retreated
    }

    /// Whether the unit is an illusion that ran out of turns.
    #[must_use]
    pub const fn is_dissipated(&self) -> bool {
        self.dissipated
    }

    /// Whether the unit no longer takes part in the fight.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.is_dead() || self.is_retreated() || self.dissipated
    }

    /// Whether the unit still takes part in the fight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_inactive()
    }

    fn levels_gained(&self) -> i32 {
        i32::from(self.level.saturating_sub(self.base_type().level))
    }

    fn level_modifier(&self) -> i32 {
        100 + LEVEL_BONUS_PERCENT * self.levels_gained()
    }

    /// Maximum hit points at the current level.
    #[must_use]
    pub fn max_hit_points(&self) -> u32 {
        scale(self.unit_type.hit_points, self.level_modifier())
    }

    /// Whether the unit is missing hit points.
    #[must_use]
    pub fn is_wounded(&self) -> bool {
        !self.is_dead() && self.hit_points < self.max_hit_points()
    }

    fn effect_power_sum(&self, kind: BattleEffectType) -> u32 {
        self.effects
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.power)
            .sum()
    }

    /// Effective power of `attack` for this unit.
    ///
    /// Level bonuses apply to every attack. Damage boosts and reductions
    /// only apply to attacks that deal direct damage.
    #[must_use]
    pub fn attack_power(&self, attack: &UnitAttack) -> u32 {
        let levelled = scale(attack.power, self.level_modifier());
        if !attack.class.deals_damage() {
            return levelled;
        }
        let boost = self.effect_power_sum(BattleEffectType::BoostDamage);
        let lower = self.effect_power_sum(BattleEffectType::LowerDamage);
        let modifier = 100 + i64::from(boost) - i64::from(lower);
        scale(levelled, modifier.clamp(0, i64::from(i32::MAX)) as i32)
    }

    /// Effective power of the main attack.
    #[must_use]
    pub fn primary_power(&self) -> u32 {
        self.attack_power(&self.unit_type.primary_attack)
    }

    /// Effective armor, including the defend bonus.
    #[must_use]
    pub fn armor(&self) -> u32 {
        let bonus = if self.has_effect(BattleEffectType::Defend) {
            DEFEND_ARMOR_BONUS
        } else {
            0
        };
        (self.unit_type.armor + bonus).min(MAX_ARMOR)
    }

    /// Effective initiative.
    #[must_use]
    pub fn initiative(&self) -> u32 {
        let lowered = self.effect_power_sum(BattleEffectType::LowerInitiative);
        reduce(self.unit_type.initiative, lowered)
    }

    /// Whether an effect of `kind` is active.
    #[must_use]
    pub fn has_effect(&self, kind: BattleEffectType) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Whether any curable effect is active.
    #[must_use]
    pub fn has_curable_effect(&self) -> bool {
        self.effects.iter().any(|e| e.kind.is_curable())
    }

    /// Remaining ward charges against `category`.
    #[must_use]
    pub fn ward_charges(&self, category: ProtectionCategory) -> u32 {
        self.wards
            .iter()
            .filter(|w| w.category == category)
            .map(|w| w.charges)
            .sum()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Apply damage, returning the hit points actually lost.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.hit_points);
        self.hit_points -= actual;
        actual
    }

    /// Heal, returning the hit points actually restored.
    ///
    /// Dead units cannot be healed; use [`Unit::revive`].
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead() {
            return 0;
        }
        let headroom = self.max_hit_points().saturating_sub(self.hit_points);
        let actual = amount.min(headroom);
        self.hit_points += actual;
        actual
    }

    /// Bring a dead unit back with `percent` of its maximum hit points.
    ///
    /// Returns the restored hit points, or 0 if the unit was alive.
    pub fn revive(&mut self, percent: u32) -> u32 {
        if !self.is_dead() {
            return 0;
        }
        let restored = scale(self.max_hit_points(), percent.min(100) as i32).max(1);
        self.hit_points = restored;
        restored
    }

    /// Attach an effect, refreshing an existing effect of the same kind.
    ///
    /// A refresh keeps the effect's place in the processing order and takes
    /// the longer duration and the stronger power.
    pub fn add_effect(&mut self, effect: BattleEffect) {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == effect.kind) {
            existing.duration = existing.duration.max(effect.duration);
            existing.power = existing.power.max(effect.power);
        } else {
            self.effects.push(effect);
        }
    }

    /// Remove every effect matching `predicate`, returning the removed kinds.
    pub fn remove_effects(
        &mut self,
        predicate: impl Fn(&BattleEffect) -> bool,
    ) -> Vec<BattleEffectType> {
        let removed = self
            .effects
            .iter()
            .filter(|e| predicate(e))
            .map(|e| e.kind)
            .collect();
        self.effects.retain(|e| !predicate(e));
        removed
    }

    pub(crate) fn remove_effect_at(&mut self, index: usize) -> BattleEffect {
        self.effects.remove(index)
    }

    pub(crate) fn set_effect_duration(&mut self, index: usize, duration: u8) {
        if let Some(effect) = self.effects.get_mut(index) {
            effect.duration = duration;
        }
    }

    /// Drop every active effect.
    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// Add one ward charge against `category`.
    pub fn add_ward(&mut self, category: ProtectionCategory) {
        if let Some(ward) = self.wards.iter_mut().find(|w| w.category == category) {
            ward.charges += 1;
        } else {
            self.wards.push(WardCharge {
                category,
                charges: 1,
            });
        }
    }

    /// Check protections against `attack`, consuming a ward charge if one applies.
    ///
    /// Immunities win over wards. Class wards are spent before source wards.
    pub fn absorb(&mut self, attack: &UnitAttack) -> ProtectionOutcome {
        if self.unit_type.is_immune_to(attack) {
            return ProtectionOutcome::Immunity;
        }
        let candidates = [
            ProtectionCategory::Class(attack.class),
            ProtectionCategory::Source(attack.source),
        ];
        for category in candidates {
            if let Some(ward) = self
                .wards
                .iter_mut()
                .find(|w| w.category == category && w.charges > 0)
            {
                ward.charges -= 1;
                return ProtectionOutcome::Ward;
            }
        }
        ProtectionOutcome::None
    }

    /// Mark the unit as leaving at its next turn.
    pub fn begin_retreat(&mut self) {
        if self.retreat == RetreatState::Fighting {
            self.retreat = RetreatState::Retreating;
        }
    }

    /// Take the unit off the field.
    pub fn complete_retreat(&mut self) {
        self.retreat = RetreatState::Retreated;
        self.effects.clear();
    }

    /// Spend one illusion turn. Returns `false` when the illusion has none left
    /// and dissipates instead.
    pub fn spend_illusion_turn(&mut self) -> bool {
        match self.illusion_turns {
            None => true,
            Some(0) => {
                self.dissipated = true;
                self.effects.clear();
                false
            }
            Some(turns) => {
                self.illusion_turns = Some(turns - 1);
                true
            }
        }
    }

    pub(crate) fn set_waited(&mut self, waited: bool) {
        self.has_waited = waited;
    }

    /// Wear `new_type`, keeping the share of hit points the unit had.
    pub fn transform(&mut self, new_type: Arc<UnitType>) {
        let old_max = self.max_hit_points();
        if self.original_type.is_none() {
            self.original_type = Some(Arc::clone(&self.unit_type));
        }
        self.unit_type = new_type;
        self.rescale_hit_points(old_max);
    }

    /// Return to the original type. Returns `false` if the unit was not transformed.
    pub fn revert_transform(&mut self) -> bool {
        let Some(original) = self.original_type.take() else {
            return false;
        };
        let old_max = self.max_hit_points();
        self.unit_type = original;
        self.rescale_hit_points(old_max);
        self.effects.retain(|e| e.kind != BattleEffectType::Transform);
        true
    }

    fn rescale_hit_points(&mut self, old_max: u32) {
        if self.is_dead() || old_max == 0 {
            return;
        }
        let new_max = self.max_hit_points();
        let scaled = u64::from(self.hit_points) * u64::from(new_max) / u64::from(old_max);
        self.hit_points = (scaled as u32).clamp(1, new_max.max(1));
    }

    /// Add experience.
    pub fn add_experience(&mut self, amount: u32) {
        self.experience = self.experience.saturating_add(amount);
    }

    /// Level up once if enough experience was gathered.
    ///
    /// Leftover experience is kept but capped below the next threshold.
    /// A levelled unit is restored to full health. Returns whether the unit
    /// levelled.
    pub fn try_level_up(&mut self) -> bool {
        let threshold = self.base_type().xp_to_level;
        if threshold == 0 || self.experience < threshold || self.is_dead() {
            return false;
        }
        self.level += 1;
        self.experience = (self.experience - threshold).min(threshold - 1);
        self.hit_points = self.max_hit_points();
        true
    }
}
