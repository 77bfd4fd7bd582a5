//! Stat aggregation.
//!
//! This module provides:
//! - Character attributes and the persistent `CombatantStats` profile
//! - The per-job combat coefficient table
//! - Equipment slots and their stat deltas
//! - `effective_stats`, which folds base stats, gear and buffs into the
//!   values every other combat system reads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::buffs::BuffBonuses;

/// Base critical chance before attributes.
pub const BASE_CRIT_CHANCE: f32 = 0.05;
/// Critical chance gained per point of LUK.
pub const CRIT_PER_LUK: f32 = 0.01;
/// Critical chance gained per point of DEX.
pub const CRIT_PER_DEX: f32 = 0.005;
/// Hard cap on critical chance.
pub const MAX_CRIT_CHANCE: f32 = 0.5;
/// Evasion gained per point of LUK.
pub const EVASION_PER_LUK: f32 = 0.005;
/// Evasion gained per point of DEX.
pub const EVASION_PER_DEX: f32 = 0.002;
/// Hard cap on evasion chance.
pub const MAX_EVASION: f32 = 0.7;
/// Defense gained per point of VIT.
pub const DEFENSE_PER_VIT: f32 = 1.5;
/// Max HP gained per point of VIT.
pub const HP_PER_VIT: u32 = 10;
/// Max MP gained per point of INT.
pub const MP_PER_INT: u32 = 5;
/// Swing cooldown when no weapon is equipped (ms).
pub const DEFAULT_SWING_COOLDOWN_MS: u64 = 500;

// ============================================================================
// Attributes
// ============================================================================

/// The five primary attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// STR
    pub strength: u32,
    /// DEX
    pub dexterity: u32,
    /// INT
    pub intelligence: u32,
    /// VIT
    pub vitality: u32,
    /// LUK
    pub luck: u32,
}

impl Attributes {
    /// Create attributes from explicit values.
    #[must_use]
    pub const fn new(strength: u32, dexterity: u32, intelligence: u32, vitality: u32, luck: u32) -> Self {
        Self {
            strength,
            dexterity,
            intelligence,
            vitality,
            luck,
        }
    }

    /// Component-wise sum.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self {
            strength: self.strength + other.strength,
            dexterity: self.dexterity + other.dexterity,
            intelligence: self.intelligence + other.intelligence,
            vitality: self.vitality + other.vitality,
            luck: self.luck + other.luck,
        }
    }

    /// Get a single attribute.
    #[must_use]
    pub const fn get(&self, kind: AttributeKind) -> u32 {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Dexterity => self.dexterity,
            AttributeKind::Intelligence => self.intelligence,
            AttributeKind::Vitality => self.vitality,
            AttributeKind::Luck => self.luck,
        }
    }

    /// Add points to a single attribute.
    pub fn add_points(&mut self, kind: AttributeKind, points: u32) {
        let slot = match kind {
            AttributeKind::Strength => &mut self.strength,
            AttributeKind::Dexterity => &mut self.dexterity,
            AttributeKind::Intelligence => &mut self.intelligence,
            AttributeKind::Vitality => &mut self.vitality,
            AttributeKind::Luck => &mut self.luck,
        };
        *slot = slot.saturating_add(points);
    }
}

/// Selector for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// STR
    Strength,
    /// DEX
    Dexterity,
    /// INT
    Intelligence,
    /// VIT
    Vitality,
    /// LUK
    Luck,
}

// ============================================================================
// Jobs
// ============================================================================

/// Player job. Each job maps to one row of the combat profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    /// Starting job
    Beginner,
    /// Tier 1 STR job
    Warrior,
    /// Tier 2 STR job
    Knight,
    /// Tier 3 STR job
    Hero,
    /// Tier 1 INT job
    Magician,
    /// Tier 2 INT job
    Wizard,
    /// Tier 3 INT job
    Archmage,
    /// Tier 1 DEX job
    Archer,
    /// Tier 2 DEX job
    Ranger,
    /// Tier 3 DEX job
    Bowmaster,
    /// Tier 1 dagger job
    Thief,
    /// Tier 2 dagger job
    Assassin,
    /// Tier 3 dagger job
    NightLord,
}

/// Combat coefficients for one job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobCombatProfile {
    /// Attack per point of STR
    pub str_coef: f32,
    /// Attack per point of DEX
    pub dex_coef: f32,
    /// Attack per point of INT
    pub int_coef: f32,
    /// Job tier multiplier applied to the attack sum
    pub multiplier: f32,
    /// Replaces the default critical multiplier when set
    pub crit_override: Option<f32>,
    /// Skills scale off INT and use magic mitigation
    pub magic: bool,
    /// Advancement tier (0 = beginner)
    pub tier: u8,
}

const fn profile(
    str_coef: f32,
    dex_coef: f32,
    int_coef: f32,
    multiplier: f32,
    crit_override: Option<f32>,
    magic: bool,
    tier: u8,
) -> JobCombatProfile {
    JobCombatProfile {
        str_coef,
        dex_coef,
        int_coef,
        multiplier,
        crit_override,
        magic,
        tier,
    }
}

/// Profile table, indexed by `Job as usize`.
static JOB_PROFILES: [JobCombatProfile; 13] = [
    profile(1.0, 0.5, 0.0, 1.0, None, false, 0),       // Beginner
    profile(2.0, 0.0, 0.0, 1.1, None, false, 1),       // Warrior
    profile(2.0, 0.0, 0.0, 1.25, None, false, 2),      // Knight
    profile(2.5, 0.0, 0.0, 1.45, None, false, 3),      // Hero
    profile(0.0, 0.0, 1.5, 1.05, None, true, 1),       // Magician
    profile(0.0, 0.0, 2.0, 1.2, None, true, 2),        // Wizard
    profile(0.0, 0.0, 2.5, 1.4, None, true, 3),        // Archmage
    profile(0.0, 2.0, 0.0, 1.1, None, false, 1),       // Archer
    profile(0.0, 2.0, 0.0, 1.25, None, false, 2),      // Ranger
    profile(0.0, 2.5, 0.0, 1.4, Some(2.5), false, 3),  // Bowmaster
    profile(0.5, 1.5, 0.0, 1.1, None, false, 1),       // Thief
    profile(0.5, 2.0, 0.0, 1.25, Some(2.0), false, 2), // Assassin
    profile(0.5, 2.5, 0.0, 1.45, Some(2.0), false, 3), // NightLord
];

impl Job {
    /// All jobs in table order.
    pub const ALL: [Self; 13] = [
        Self::Beginner,
        Self::Warrior,
        Self::Knight,
        Self::Hero,
        Self::Magician,
        Self::Wizard,
        Self::Archmage,
        Self::Archer,
        Self::Ranger,
        Self::Bowmaster,
        Self::Thief,
        Self::Assassin,
        Self::NightLord,
    ];

    /// Combat coefficients for this job.
    #[must_use]
    pub fn profile(self) -> &'static JobCombatProfile {
        &JOB_PROFILES[self as usize]
    }

    /// Advancement tier.
    #[must_use]
    pub fn tier(self) -> u8 {
        self.profile().tier
    }

    /// Whether this job casts magic.
    #[must_use]
    pub fn is_magic(self) -> bool {
        self.profile().magic
    }

    /// Jobs reachable by a single advancement.
    #[must_use]
    pub const fn advancements(self) -> &'static [Self] {
        match self {
            Self::Beginner => &[Self::Warrior, Self::Magician, Self::Archer, Self::Thief],
            Self::Warrior => &[Self::Knight],
            Self::Knight => &[Self::Hero],
            Self::Magician => &[Self::Wizard],
            Self::Wizard => &[Self::Archmage],
            Self::Archer => &[Self::Ranger],
            Self::Ranger => &[Self::Bowmaster],
            Self::Thief => &[Self::Assassin],
            Self::Assassin => &[Self::NightLord],
            Self::Hero | Self::Archmage | Self::Bowmaster | Self::NightLord => &[],
        }
    }

    /// Job this one advanced from.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::Beginner => None,
            Self::Warrior | Self::Magician | Self::Archer | Self::Thief => Some(Self::Beginner),
            Self::Knight => Some(Self::Warrior),
            Self::Hero => Some(Self::Knight),
            Self::Wizard => Some(Self::Magician),
            Self::Archmage => Some(Self::Wizard),
            Self::Ranger => Some(Self::Archer),
            Self::Bowmaster => Some(Self::Ranger),
            Self::Assassin => Some(Self::Thief),
            Self::NightLord => Some(Self::Assassin),
        }
    }

    /// True if `self` is `ancestor` or advanced from it.
    #[must_use]
    pub fn descends_from(self, ancestor: Self) -> bool {
        let mut current = Some(self);
        while let Some(job) = current {
            if job == ancestor {
                return true;
            }
            current = job.predecessor();
        }
        false
    }

    /// Default basic-attack style for this job's starter weapon.
    #[must_use]
    pub const fn default_weapon_style(self) -> WeaponStyle {
        match self {
            Self::Archer | Self::Ranger | Self::Bowmaster => WeaponStyle::Ranged,
            _ => WeaponStyle::Melee,
        }
    }
}

// ============================================================================
// Persistent Profile
// ============================================================================

/// Persistent character stats. Read-only to combat; mutated only by
/// leveling, stat allocation or job change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantStats {
    /// Primary attributes
    pub attributes: Attributes,
    /// Base attack before attributes
    pub base_attack: f32,
    /// Base defense before attributes
    pub base_defense: f32,
    /// Base max HP before attributes
    pub base_max_hp: u32,
    /// Base max MP before attributes
    pub base_max_mp: u32,
    /// Current job
    pub job: Job,
    /// Character level
    pub level: u32,
}

impl Default for CombatantStats {
    fn default() -> Self {
        Self {
            attributes: Attributes::new(4, 4, 4, 4, 4),
            base_attack: 10.0,
            base_defense: 5.0,
            base_max_hp: 50,
            base_max_mp: 10,
            job: Job::Beginner,
            level: 1,
        }
    }
}

impl CombatantStats {
    /// Create stats for a job with default base values.
    #[must_use]
    pub fn new(job: Job) -> Self {
        Self {
            job,
            ..Self::default()
        }
    }

    /// Set attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set base attack.
    #[must_use]
    pub fn with_base_attack(mut self, attack: f32) -> Self {
        self.base_attack = attack;
        self
    }

    /// Set base defense.
    #[must_use]
    pub fn with_base_defense(mut self, defense: f32) -> Self {
        self.base_defense = defense;
        self
    }

    /// Set base pools.
    #[must_use]
    pub fn with_pools(mut self, max_hp: u32, max_mp: u32) -> Self {
        self.base_max_hp = max_hp;
        self.base_max_mp = max_mp;
        self
    }

    /// Set level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }
}

// ============================================================================
// Equipment
// ============================================================================

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentSlot {
    /// Weapon
    Weapon,
    /// Helmet
    Head,
    /// Armor
    Body,
    /// Ring, earring, etc.
    Accessory,
}

/// Stat deltas granted by one equipped item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentBonus {
    /// Flat attack
    pub attack: f32,
    /// Flat defense
    pub defense: f32,
    /// Flat max HP
    pub hp: u32,
    /// Flat max MP
    pub mp: u32,
    /// Attribute deltas
    pub attributes: Attributes,
}

impl EquipmentBonus {
    /// Component-wise sum.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self {
            attack: self.attack + other.attack,
            defense: self.defense + other.defense,
            hp: self.hp + other.hp,
            mp: self.mp + other.mp,
            attributes: self.attributes.plus(other.attributes),
        }
    }
}

/// Basic-attack style of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponStyle {
    /// Short wide swing
    Melee,
    /// Long narrow shot
    Ranged,
}

/// Weapon-only properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Basic-attack style
    pub style: WeaponStyle,
    /// Swing cooldown in milliseconds
    pub swing_cooldown_ms: u64,
}

impl Default for WeaponProfile {
    fn default() -> Self {
        Self {
            style: WeaponStyle::Melee,
            swing_cooldown_ms: DEFAULT_SWING_COOLDOWN_MS,
        }
    }
}

/// An item in an equipment slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    /// Display name
    pub name: String,
    /// Slot the item occupies
    pub slot: EquipmentSlot,
    /// Stat deltas
    pub bonus: EquipmentBonus,
    /// Weapon properties (weapon slot only)
    pub weapon: Option<WeaponProfile>,
}

impl EquipmentItem {
    /// Create a non-weapon item.
    #[must_use]
    pub fn armor(name: impl Into<String>, slot: EquipmentSlot, bonus: EquipmentBonus) -> Self {
        Self {
            name: name.into(),
            slot,
            bonus,
            weapon: None,
        }
    }

    /// Create a weapon.
    #[must_use]
    pub fn weapon(name: impl Into<String>, bonus: EquipmentBonus, profile: WeaponProfile) -> Self {
        Self {
            name: name.into(),
            slot: EquipmentSlot::Weapon,
            bonus,
            weapon: Some(profile),
        }
    }
}

/// Currently equipped items, one per slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    items: BTreeMap<EquipmentSlot, EquipmentItem>,
}

impl Equipment {
    /// Create empty equipment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equip an item, returning whatever previously occupied its slot.
    pub fn equip(&mut self, item: EquipmentItem) -> Option<EquipmentItem> {
        self.items.insert(item.slot, item)
    }

    /// Remove the item in a slot.
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<EquipmentItem> {
        self.items.remove(&slot)
    }

    /// Item in a slot.
    #[must_use]
    pub fn get(&self, slot: EquipmentSlot) -> Option<&EquipmentItem> {
        self.items.get(&slot)
    }

    /// Sum of every slot's bonus.
    #[must_use]
    pub fn total_bonus(&self) -> EquipmentBonus {
        self.items
            .values()
            .fold(EquipmentBonus::default(), |acc, item| acc.plus(item.bonus))
    }

    /// Weapon profile, or `None` when bare-handed.
    #[must_use]
    pub fn weapon_profile(&self) -> Option<WeaponProfile> {
        self.items
            .get(&EquipmentSlot::Weapon)
            .and_then(|item| item.weapon)
    }
}

// ============================================================================
// Effective Stats
// ============================================================================

/// Totals used by every combat formula. Recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStats {
    /// Attribute totals (base + gear)
    pub attributes: Attributes,
    /// Total attack
    pub attack: f32,
    /// Total defense
    pub defense: f32,
    /// Max HP
    pub max_hp: u32,
    /// Max MP
    pub max_mp: u32,
    /// Critical chance, `[0, MAX_CRIT_CHANCE]`
    pub crit_chance: f32,
    /// Evasion chance, `[0, MAX_EVASION]`
    pub evasion: f32,
    /// Job-specific critical multiplier
    pub crit_override: Option<f32>,
    /// Job casts magic
    pub magic: bool,
    /// Job
    pub job: Job,
    /// Basic-attack weapon properties
    pub weapon: WeaponProfile,
}

/// Critical chance for a set of attribute totals.
#[must_use]
pub fn crit_chance_for(attributes: &Attributes) -> f32 {
    (BASE_CRIT_CHANCE
        + attributes.luck as f32 * CRIT_PER_LUK
        + attributes.dexterity as f32 * CRIT_PER_DEX)
        .clamp(0.0, MAX_CRIT_CHANCE)
}

/// Evasion chance for a set of attribute totals.
#[must_use]
pub fn evasion_for(attributes: &Attributes) -> f32 {
    (attributes.luck as f32 * EVASION_PER_LUK + attributes.dexterity as f32 * EVASION_PER_DEX)
        .clamp(0.0, MAX_EVASION)
}

/// Fold base stats, equipment and buff bonuses into effective totals.
///
/// Pure; callers hand in buff bonuses already pruned for the current time.
#[must_use]
pub fn effective_stats(
    base: &CombatantStats,
    equipment: &Equipment,
    buffs: BuffBonuses,
) -> EffectiveStats {
    let gear = equipment.total_bonus();
    let attributes = base.attributes.plus(gear.attributes);
    let profile = base.job.profile();

    let scaled = attributes.strength as f32 * profile.str_coef
        + attributes.dexterity as f32 * profile.dex_coef
        + attributes.intelligence as f32 * profile.int_coef;
    let attack = (base.base_attack + gear.attack + scaled)
        * profile.multiplier
        * (1.0 + buffs.attack);

    let defense = (base.base_defense + gear.defense + attributes.vitality as f32 * DEFENSE_PER_VIT)
        * (1.0 + buffs.defense);

    let weapon = equipment.weapon_profile().unwrap_or(WeaponProfile {
        style: base.job.default_weapon_style(),
        swing_cooldown_ms: DEFAULT_SWING_COOLDOWN_MS,
    });

    EffectiveStats {
        attributes,
        attack,
        defense,
        max_hp: base.base_max_hp + gear.hp + attributes.vitality * HP_PER_VIT,
        max_mp: base.base_max_mp + gear.mp + attributes.intelligence * MP_PER_INT,
        crit_chance: crit_chance_for(&attributes),
        evasion: evasion_for(&attributes),
        crit_override: profile.crit_override,
        magic: profile.magic,
        job: base.job,
        weapon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warrior(strength: u32) -> CombatantStats {
        CombatantStats::new(Job::Warrior)
            .with_attributes(Attributes::new(strength, 0, 0, 0, 0))
            .with_base_attack(10.0)
            .with_base_defense(0.0)
    }

    #[test]
    fn test_warrior_attack_formula() {
        let stats = effective_stats(&warrior(20), &Equipment::new(), BuffBonuses::default());
        // (10 + 20*2) * 1.1
        assert!((stats.attack - 55.0).abs() < 1e-4);
    }

    #[test]
    fn test_attack_buff_multiplies() {
        let buffs = BuffBonuses {
            attack: 0.2,
            defense: 0.0,
        };
        let stats = effective_stats(&warrior(20), &Equipment::new(), buffs);
        assert!((stats.attack - 66.0).abs() < 1e-3);
    }

    #[test]
    fn test_defense_and_pools_from_vitality() {
        let base = CombatantStats::new(Job::Beginner)
            .with_attributes(Attributes::new(0, 0, 6, 10, 0))
            .with_base_defense(5.0)
            .with_pools(50, 10);
        let buffs = BuffBonuses {
            attack: 0.0,
            defense: 0.5,
        };
        let stats = effective_stats(&base, &Equipment::new(), buffs);

        assert!((stats.defense - (5.0 + 15.0) * 1.5).abs() < 1e-4);
        assert_eq!(stats.max_hp, 150);
        assert_eq!(stats.max_mp, 40);
    }

    #[test]
    fn test_equipment_bonus_summed() {
        let mut gear = Equipment::new();
        gear.equip(EquipmentItem::weapon(
            "Iron Sword",
            EquipmentBonus {
                attack: 12.0,
                attributes: Attributes::new(3, 0, 0, 0, 0),
                ..EquipmentBonus::default()
            },
            WeaponProfile {
                style: WeaponStyle::Melee,
                swing_cooldown_ms: 600,
            },
        ));
        gear.equip(EquipmentItem::armor(
            "Leather Cap",
            EquipmentSlot::Head,
            EquipmentBonus {
                defense: 4.0,
                hp: 20,
                ..EquipmentBonus::default()
            },
        ));

        let stats = effective_stats(&warrior(20), &gear, BuffBonuses::default());
        // (10 + 12 + 23*2) * 1.1
        assert!((stats.attack - 74.8).abs() < 1e-3);
        assert!((stats.defense - 4.0).abs() < 1e-4);
        assert_eq!(stats.weapon.swing_cooldown_ms, 600);
        assert_eq!(stats.attributes.strength, 23);
    }

    #[test]
    fn test_equip_replaces_slot() {
        let mut gear = Equipment::new();
        let cap = EquipmentItem::armor("Cap", EquipmentSlot::Head, EquipmentBonus::default());
        let helm = EquipmentItem::armor("Helm", EquipmentSlot::Head, EquipmentBonus::default());

        assert!(gear.equip(cap).is_none());
        let previous = gear.equip(helm);
        assert_eq!(previous.map(|i| i.name), Some("Cap".to_string()));
        assert!(gear.unequip(EquipmentSlot::Head).is_some());
        assert!(gear.get(EquipmentSlot::Head).is_none());
    }

    #[test]
    fn test_crit_and_evasion_caps() {
        let lucky = Attributes::new(0, 200, 0, 0, 200);
        assert_eq!(crit_chance_for(&lucky), MAX_CRIT_CHANCE);
        assert_eq!(evasion_for(&lucky), MAX_EVASION);

        let plain = Attributes::new(0, 10, 0, 0, 10);
        assert!((crit_chance_for(&plain) - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_job_table_consistency() {
        for job in Job::ALL {
            let profile = job.profile();
            assert!((1.0..=1.45).contains(&profile.multiplier), "{job:?}");
            for next in job.advancements() {
                assert_eq!(next.tier(), job.tier() + 1);
            }
        }
        assert!(Job::NightLord.descends_from(Job::Thief));
        assert!(Job::Hero.descends_from(Job::Beginner));
        assert!(!Job::Hero.descends_from(Job::Magician));
        assert_eq!(Job::Bowmaster.profile().crit_override, Some(2.5));
        assert_eq!(Job::Assassin.profile().crit_override, Some(2.0));
    }

    #[test]
    fn test_bare_handed_weapon_follows_job() {
        let archer = CombatantStats::new(Job::Archer);
        let stats = effective_stats(&archer, &Equipment::new(), BuffBonuses::default());
        assert_eq!(stats.weapon.style, WeaponStyle::Ranged);
        assert_eq!(stats.weapon.swing_cooldown_ms, DEFAULT_SWING_COOLDOWN_MS);
    }
}
