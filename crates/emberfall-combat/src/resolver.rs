//! Damage resolution.
//!
//! This module provides:
//! - Basic-attack and skill damage formulas
//! - Critical and evasion rolls against an injectable random source
//! - Defender-side mitigation for hits on the player
//! - A preview mode (no crit, no variance) for displayed attack power

use serde::{Deserialize, Serialize};

use crate::skills::{Element, Skill};
use crate::stats::{EffectiveStats, MAX_CRIT_CHANCE, MAX_EVASION};

// ============================================================================
// Random Source
// ============================================================================

/// Source of uniform rolls in `[0, 1)`.
pub trait RandomSource {
    /// Next roll in `[0, 1)`.
    fn next_f32(&mut self) -> f32;
}

impl RandomSource for fastrand::Rng {
    fn next_f32(&mut self) -> f32 {
        self.f32()
    }
}

/// Always returns the same roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRandom(pub f32);

impl RandomSource for FixedRandom {
    fn next_f32(&mut self) -> f32 {
        self.0
    }
}

/// Cycles through a fixed list of rolls.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRandom {
    values: Vec<f32>,
    index: usize,
}

impl SequenceRandom {
    /// Create from a list of rolls. An empty list always yields 0.
    #[must_use]
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, index: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value
    }
}

/// How a resolution treats randomness.
pub enum DamageRoll<'a> {
    /// Roll crit then variance from the source.
    Live(&'a mut dyn RandomSource),
    /// No crit, no variance. Used for displayed attack power.
    Preview,
}

// ============================================================================
// Resolution Types
// ============================================================================

/// Mitigation family of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Mitigated by `defense * physical_defense_factor`.
    Physical,
    /// Mitigated by `defense * magic_defense_factor`.
    Magic,
}

/// Result of one attack resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackResolution {
    /// Final integer damage, at least 1.
    pub damage: u32,
    /// Whether the critical roll succeeded.
    pub is_critical: bool,
    /// Mitigation family.
    pub damage_type: DamageType,
    /// Element tag.
    pub element: Element,
}

/// Result of a hit landing on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseOutcome {
    /// Damage taken (0 when evaded).
    pub damage: u32,
    /// Whether the hit was evaded.
    pub evaded: bool,
}

// ============================================================================
// Resolver
// ============================================================================

/// Tunable resolver constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Critical multiplier for jobs without an override.
    pub crit_multiplier: f32,
    /// Uniform variance fraction (0.1 = +/-10%).
    pub variance: f32,
    /// Share of defense subtracted from physical hits.
    pub physical_defense_factor: f32,
    /// Share of defense subtracted from magic hits.
    pub magic_defense_factor: f32,
    /// Attack added per point of INT for magic skills.
    pub magic_int_factor: f32,
    /// Damage floor before critical and variance.
    pub min_damage: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            crit_multiplier: 1.5,
            variance: 0.1,
            physical_defense_factor: 0.5,
            magic_defense_factor: 0.3,
            magic_int_factor: 3.0,
            min_damage: 1.0,
        }
    }
}

/// Damage formulas parameterized by `ResolverConfig`.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    /// Configuration.
    pub config: ResolverConfig,
}

impl CombatResolver {
    /// Create a resolver with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with config.
    #[must_use]
    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a basic attack: `max(1, attack - defense * 0.5)`, then crit,
    /// then variance, floored.
    #[must_use]
    pub fn resolve_basic_attack(
        &self,
        attacker: &EffectiveStats,
        target_defense: f32,
        roll: DamageRoll<'_>,
    ) -> AttackResolution {
        let base = attacker.attack - target_defense * self.config.physical_defense_factor;
        self.finish(
            base,
            attacker.crit_chance,
            self.crit_multiplier_for(attacker),
            DamageType::Physical,
            Element::Neutral,
            roll,
        )
    }

    /// Resolve one hit of a skill.
    ///
    /// Magic skills (or magic jobs) add INT and use the lighter magic
    /// mitigation; everything else uses the physical formula.
    #[must_use]
    pub fn resolve_skill_attack(
        &self,
        attacker: &EffectiveStats,
        skill: &Skill,
        target_defense: f32,
        roll: DamageRoll<'_>,
    ) -> AttackResolution {
        let magic = skill.magic || attacker.magic;
        let (base, damage_type) = if magic {
            let power = attacker.attack
                + attacker.attributes.intelligence as f32 * self.config.magic_int_factor;
            (
                power * skill.damage_multiplier - target_defense * self.config.magic_defense_factor,
                DamageType::Magic,
            )
        } else {
            (
                attacker.attack * skill.damage_multiplier
                    - target_defense * self.config.physical_defense_factor,
                DamageType::Physical,
            )
        };

        self.finish(
            base,
            attacker.crit_chance + skill.crit_bonus,
            self.crit_multiplier_for(attacker),
            damage_type,
            skill.element,
            roll,
        )
    }

    /// Displayed attack power: the basic formula against zero defense with
    /// no randomness.
    #[must_use]
    pub fn attack_power_preview(&self, attacker: &EffectiveStats) -> u32 {
        self.resolve_basic_attack(attacker, 0.0, DamageRoll::Preview)
            .damage
    }

    /// Displayed per-hit damage of a skill against zero defense.
    #[must_use]
    pub fn skill_power_preview(&self, attacker: &EffectiveStats, skill: &Skill) -> u32 {
        self.resolve_skill_attack(attacker, skill, 0.0, DamageRoll::Preview)
            .damage
    }

    /// Defender-side evasion roll: `roll < clamp(evasion, 0, 0.7)`.
    pub fn roll_evasion(&self, evasion_chance: f32, rng: &mut dyn RandomSource) -> bool {
        rng.next_f32() < evasion_chance.clamp(0.0, MAX_EVASION)
    }

    /// Apply an incoming hit to a defender.
    ///
    /// Evasion is checked first and fully negates the hit; otherwise
    /// `max(1, floor(raw - defense * 0.5))`.
    pub fn defend(
        &self,
        raw_damage: f32,
        defender: &EffectiveStats,
        rng: &mut dyn RandomSource,
    ) -> DefenseOutcome {
        if self.roll_evasion(defender.evasion, rng) {
            return DefenseOutcome {
                damage: 0,
                evaded: true,
            };
        }
        let mitigated = raw_damage - defender.defense * self.config.physical_defense_factor;
        DefenseOutcome {
            damage: mitigated.floor().max(self.config.min_damage) as u32,
            evaded: false,
        }
    }

    fn crit_multiplier_for(&self, attacker: &EffectiveStats) -> f32 {
        attacker
            .crit_override
            .unwrap_or(self.config.crit_multiplier)
    }

    fn finish(
        &self,
        base: f32,
        crit_chance: f32,
        crit_multiplier: f32,
        damage_type: DamageType,
        element: Element,
        roll: DamageRoll<'_>,
    ) -> AttackResolution {
        let floored = base.max(self.config.min_damage);

        let (is_critical, variance_factor) = match roll {
            DamageRoll::Preview => (false, 1.0),
            DamageRoll::Live(rng) => {
                let is_critical = rng.next_f32() < crit_chance.clamp(0.0, MAX_CRIT_CHANCE);
                let variance = self.config.variance.max(0.0);
                let factor = 1.0 - variance + 2.0 * variance * rng.next_f32();
                (is_critical, factor)
            },
        };

        let crit_factor = if is_critical { crit_multiplier } else { 1.0 };
        let damage = (floored * crit_factor * variance_factor)
            .floor()
            .max(self.config.min_damage) as u32;

        AttackResolution {
            damage,
            is_critical,
            damage_type,
            element,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::BuffBonuses;
    use crate::stats::{effective_stats, Attributes, CombatantStats, Equipment, Job};
    use emberfall_common::SkillId;
    use proptest::prelude::*;

    fn no_variance() -> CombatResolver {
        CombatResolver::with_config(ResolverConfig {
            variance: 0.0,
            ..ResolverConfig::default()
        })
    }

    fn stats_for(job: Job, attributes: Attributes) -> EffectiveStats {
        let base = CombatantStats::new(job)
            .with_attributes(attributes)
            .with_base_attack(10.0);
        effective_stats(&base, &Equipment::new(), BuffBonuses::default())
    }

    // Roll of 0.99 never crits (chance is capped at 0.5).
    const NO_CRIT: f32 = 0.99;

    #[test]
    fn test_warrior_scenario() {
        let warrior = stats_for(Job::Warrior, Attributes::new(20, 0, 0, 0, 0));
        let mut rng = FixedRandom(NO_CRIT);
        let hit = no_variance().resolve_basic_attack(&warrior, 10.0, DamageRoll::Live(&mut rng));

        // floor((10 + 20*2) * 1.1 - 5)
        assert_eq!(hit.damage, 50);
        assert!(!hit.is_critical);
        assert_eq!(hit.damage_type, DamageType::Physical);
    }

    #[test]
    fn test_always_crit_with_variance() {
        let warrior = stats_for(Job::Warrior, Attributes::new(20, 0, 0, 0, 0));
        let resolver = CombatResolver::new();
        // Roll 0.0: crit succeeds and variance takes its lowest value (0.9).
        let mut rng = FixedRandom(0.0);
        let hit = resolver.resolve_basic_attack(&warrior, 10.0, DamageRoll::Live(&mut rng));

        assert!(hit.is_critical);
        assert_eq!(hit.damage, (50.0_f32 * 1.5 * 0.9).floor() as u32);
    }

    #[test]
    fn test_crit_then_variance_draw_order() {
        let warrior = stats_for(Job::Warrior, Attributes::new(20, 0, 0, 0, 0));
        let resolver = CombatResolver::new();
        // First roll decides crit, second sets variance to 0.9 + 0.2 * 0.75.
        let mut rng = SequenceRandom::new(vec![NO_CRIT, 0.75]);
        let hit = resolver.resolve_basic_attack(&warrior, 10.0, DamageRoll::Live(&mut rng));

        assert!(!hit.is_critical);
        assert_eq!(hit.damage, 52);
    }

    #[test]
    fn test_job_crit_overrides() {
        let resolver = no_variance();
        for (job, multiplier) in [(Job::Bowmaster, 2.5), (Job::Assassin, 2.0), (Job::Hero, 1.5)] {
            let stats = stats_for(job, Attributes::new(10, 10, 0, 0, 0));
            let normal = resolver.resolve_basic_attack(&stats, 0.0, DamageRoll::Preview);
            let mut rng = FixedRandom(0.0);
            let crit = resolver.resolve_basic_attack(&stats, 0.0, DamageRoll::Live(&mut rng));

            let base = stats.attack.max(1.0);
            assert_eq!(normal.damage, base.floor() as u32);
            assert_eq!(crit.damage, (base * multiplier).floor() as u32, "{job:?}");
        }
    }

    #[test]
    fn test_damage_floor_against_heavy_defense() {
        let beginner = stats_for(Job::Beginner, Attributes::default());
        let mut rng = FixedRandom(NO_CRIT);
        let hit = CombatResolver::new().resolve_basic_attack(&beginner, 10_000.0, DamageRoll::Live(&mut rng));
        assert_eq!(hit.damage, 1);
    }

    #[test]
    fn test_magic_skill_formula() {
        let magician = stats_for(Job::Magician, Attributes::new(0, 0, 20, 0, 0));
        let skill = Skill::new(SkillId::new(1), "Bolt").with_multiplier(2.0).as_magic();
        let hit = no_variance().resolve_skill_attack(&magician, &skill, 25.0, DamageRoll::Preview);

        // attack = (10 + 20*1.5) * 1.05 = 42; (42 + 60) * 2 - 7.5 = 196.5
        assert_eq!(hit.damage_type, DamageType::Magic);
        assert_eq!(hit.damage, 196);
    }

    #[test]
    fn test_physical_skill_formula_and_crit_bonus() {
        let warrior = stats_for(Job::Warrior, Attributes::new(20, 0, 0, 0, 0));
        let skill = Skill::new(SkillId::new(1), "Strike")
            .with_multiplier(2.0)
            .with_crit_bonus(0.3)
            .with_element(Element::Fire);

        // Base crit chance 5%; roll 0.2 only crits with the 30% bonus.
        let mut rng = FixedRandom(0.2);
        let hit = no_variance().resolve_skill_attack(&warrior, &skill, 10.0, DamageRoll::Live(&mut rng));

        assert!(hit.is_critical);
        assert_eq!(hit.element, Element::Fire);
        // (55 * 2 - 5) * 1.5
        assert_eq!(hit.damage, 157);
    }

    #[test]
    fn test_preview_matches_live_without_randomness() {
        let thief = stats_for(Job::Thief, Attributes::new(10, 30, 0, 0, 0));
        let resolver = no_variance();
        let mut rng = FixedRandom(NO_CRIT);
        let live = resolver.resolve_basic_attack(&thief, 0.0, DamageRoll::Live(&mut rng));
        assert_eq!(resolver.attack_power_preview(&thief), live.damage);
    }

    #[test]
    fn test_evasion_negates_hit() {
        let mut dodgy = stats_for(Job::Thief, Attributes::default());
        dodgy.evasion = 1.0;
        let resolver = CombatResolver::new();

        // Capped at 0.7, so any roll below that evades.
        let mut rng = FixedRandom(0.69);
        let outcome = resolver.defend(500.0, &dodgy, &mut rng);
        assert_eq!(outcome, DefenseOutcome { damage: 0, evaded: true });

        let mut rng = FixedRandom(0.7);
        assert!(!resolver.defend(500.0, &dodgy, &mut rng).evaded);
    }

    #[test]
    fn test_defend_mitigation() {
        let mut tank = stats_for(Job::Warrior, Attributes::default());
        tank.evasion = 0.0;
        tank.defense = 20.0;
        let mut rng = FixedRandom(0.5);
        let resolver = CombatResolver::new();

        assert_eq!(resolver.defend(25.5, &tank, &mut rng).damage, 15);
        assert_eq!(resolver.defend(3.0, &tank, &mut rng).damage, 1);
    }

    proptest! {
        #[test]
        fn prop_damage_at_least_one(
            strength in 0u32..500,
            defense in 0.0f32..10_000.0,
            crit_roll in 0.0f32..1.0,
            variance_roll in 0.0f32..1.0,
        ) {
            let stats = stats_for(Job::Warrior, Attributes::new(strength, 0, 0, 0, 0));
            let mut rng = SequenceRandom::new(vec![crit_roll, variance_roll]);
            let hit = CombatResolver::new().resolve_basic_attack(&stats, defense, DamageRoll::Live(&mut rng));
            prop_assert!(hit.damage >= 1);
        }
    }
}
