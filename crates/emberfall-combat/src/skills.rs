//! Skill definitions and the skill book.
//!
//! This module provides:
//! - Static `Skill` definitions (immutable reference data)
//! - The built-in skill book for every job line
//! - Loading additional skills from TOML with validation
//! - Job/level eligibility checks

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use emberfall_common::SkillId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::buffs::BuffKind;
use crate::error::{CombatError, CombatResult};
use crate::stats::Job;

/// Errors that can occur while loading skill definitions.
#[derive(Debug, Error)]
pub enum SkillBookError {
    /// File not found.
    #[error("Skill file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read skill file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse skill TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error.
    #[error("Skill validation error: {0}")]
    ValidationError(String),

    /// Duplicate skill ID.
    #[error("Duplicate skill ID: {0}")]
    DuplicateId(SkillId),
}

/// Result type for skill book operations.
pub type SkillBookResult<T> = Result<T, SkillBookError>;

// ============================================================================
// Skill Definition
// ============================================================================

/// Element tag carried through to damage events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    /// No element.
    #[default]
    Neutral,
    /// Fire.
    Fire,
    /// Ice.
    Ice,
    /// Lightning.
    Lightning,
    /// Poison.
    Poison,
    /// Holy.
    Holy,
    /// Dark.
    Dark,
}

/// What a skill does when it lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillEffect {
    /// Deals damage to eligible targets.
    #[default]
    Damage,
    /// Restores the caster's HP.
    Heal {
        /// HP restored
        amount: u32,
    },
    /// Moves the caster along the aim direction.
    Teleport {
        /// Distance moved in world units
        range: f32,
    },
    /// Grants the caster a timed buff.
    Buff {
        /// Buff kind
        buff: BuffKind,
        /// Fractional bonus
        magnitude: f32,
        /// Duration in milliseconds
        duration_ms: u64,
    },
}

/// A skill definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Unique skill identifier.
    pub id: SkillId,
    /// Display name.
    pub name: String,
    /// Job lines that may use this skill (empty = every job).
    #[serde(default)]
    pub jobs: Vec<Job>,
    /// Minimum character level.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,
    /// MP cost.
    #[serde(default)]
    pub mp_cost: u32,
    /// Cooldown in milliseconds.
    #[serde(default)]
    pub cooldown_ms: u64,
    /// Damage multiplier applied to attack.
    #[serde(default = "default_multiplier")]
    pub damage_multiplier: f32,
    /// Reach in world units.
    #[serde(default = "default_range")]
    pub range: f32,
    /// AoE radius around the caster (None = directional).
    #[serde(default)]
    pub aoe_radius: Option<f32>,
    /// Hits per target.
    #[serde(default = "default_hit_count")]
    pub hit_count: u32,
    /// Element tag.
    #[serde(default)]
    pub element: Element,
    /// Added critical chance.
    #[serde(default)]
    pub crit_bonus: f32,
    /// Scales off INT and uses magic mitigation.
    #[serde(default)]
    pub magic: bool,
    /// Projectile skills use the wider projectile cone.
    #[serde(default)]
    pub projectile: bool,
    /// Special effect.
    #[serde(default)]
    pub effect: SkillEffect,
}

const fn default_unlock_level() -> u32 {
    1
}

const fn default_multiplier() -> f32 {
    1.0
}

const fn default_range() -> f32 {
    70.0
}

const fn default_hit_count() -> u32 {
    1
}

impl Skill {
    /// Create a single-hit damage skill with default values.
    #[must_use]
    pub fn new(id: SkillId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            jobs: Vec::new(),
            unlock_level: default_unlock_level(),
            mp_cost: 0,
            cooldown_ms: 0,
            damage_multiplier: default_multiplier(),
            range: default_range(),
            aoe_radius: None,
            hit_count: default_hit_count(),
            element: Element::Neutral,
            crit_bonus: 0.0,
            magic: false,
            projectile: false,
            effect: SkillEffect::Damage,
        }
    }

    /// Restrict to job lines.
    #[must_use]
    pub fn with_jobs(mut self, jobs: &[Job]) -> Self {
        self.jobs = jobs.to_vec();
        self
    }

    /// Set unlock level.
    #[must_use]
    pub fn with_unlock_level(mut self, level: u32) -> Self {
        self.unlock_level = level;
        self
    }

    /// Set MP cost.
    #[must_use]
    pub fn with_mp_cost(mut self, mp_cost: u32) -> Self {
        self.mp_cost = mp_cost;
        self
    }

    /// Set cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Set damage multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    /// Set range.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    /// Make the skill an AoE centered on the caster.
    #[must_use]
    pub fn with_aoe(mut self, radius: f32) -> Self {
        self.aoe_radius = Some(radius);
        self
    }

    /// Set hits per target.
    #[must_use]
    pub fn with_hits(mut self, hit_count: u32) -> Self {
        self.hit_count = hit_count;
        self
    }

    /// Set element.
    #[must_use]
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    /// Set crit bonus.
    #[must_use]
    pub fn with_crit_bonus(mut self, bonus: f32) -> Self {
        self.crit_bonus = bonus;
        self
    }

    /// Mark as magic.
    #[must_use]
    pub fn as_magic(mut self) -> Self {
        self.magic = true;
        self
    }

    /// Mark as projectile.
    #[must_use]
    pub fn as_projectile(mut self) -> Self {
        self.projectile = true;
        self
    }

    /// Set special effect.
    #[must_use]
    pub fn with_effect(mut self, effect: SkillEffect) -> Self {
        self.effect = effect;
        self
    }

    /// Returns true if this skill deals damage.
    #[must_use]
    pub fn deals_damage(&self) -> bool {
        matches!(self.effect, SkillEffect::Damage)
    }

    /// Returns true if this skill hits everything around the caster.
    #[must_use]
    pub fn is_aoe(&self) -> bool {
        self.aoe_radius.is_some()
    }

    /// Returns true if `job` belongs to one of the skill's job lines.
    #[must_use]
    pub fn allows_job(&self, job: Job) -> bool {
        self.jobs.is_empty() || self.jobs.iter().any(|&line| job.descends_from(line))
    }

    /// Check job line and level requirements.
    pub fn check_usable(&self, job: Job, level: u32) -> CombatResult<()> {
        if !self.allows_job(job) {
            return Err(CombatError::JobIneligible {
                skill: self.id,
                job,
            });
        }
        if level < self.unlock_level {
            return Err(CombatError::SkillLocked {
                skill: self.id,
                required: self.unlock_level,
                current: level,
            });
        }
        Ok(())
    }

    /// Validates the skill definition.
    pub fn validate(&self) -> SkillBookResult<()> {
        if self.name.is_empty() {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has empty name",
                self.id
            )));
        }

        if self.hit_count == 0 {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has zero hit count",
                self.id
            )));
        }

        if self.damage_multiplier < 0.0 {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has negative damage multiplier: {}",
                self.id, self.damage_multiplier
            )));
        }

        if self.range <= 0.0 {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has invalid range: {}",
                self.id, self.range
            )));
        }

        if self.aoe_radius.is_some_and(|r| r <= 0.0) {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has non-positive AoE radius",
                self.id
            )));
        }

        if !(0.0..=1.0).contains(&self.crit_bonus) {
            return Err(SkillBookError::ValidationError(format!(
                "Skill {} has invalid crit_bonus: {} (must be 0.0-1.0)",
                self.id, self.crit_bonus
            )));
        }

        match self.effect {
            SkillEffect::Heal { amount: 0 } => {
                return Err(SkillBookError::ValidationError(format!(
                    "Skill {} heals for zero",
                    self.id
                )));
            },
            SkillEffect::Teleport { range } if range <= 0.0 => {
                return Err(SkillBookError::ValidationError(format!(
                    "Skill {} has invalid teleport range: {range}",
                    self.id
                )));
            },
            SkillEffect::Buff {
                magnitude,
                duration_ms,
                ..
            } if magnitude <= 0.0 || duration_ms == 0 => {
                return Err(SkillBookError::ValidationError(format!(
                    "Skill {} has an empty buff",
                    self.id
                )));
            },
            _ => {},
        }

        Ok(())
    }
}

// ============================================================================
// Skill Book
// ============================================================================

/// A collection of skills from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Skills in this file.
    #[serde(default)]
    pub skills: Vec<Skill>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Skill registry with lookup by ID and name.
#[derive(Debug, Clone, Default)]
pub struct SkillBook {
    /// Skills by ID.
    by_id: HashMap<SkillId, Skill>,
    /// Skill IDs by name (lowercase).
    by_name: HashMap<String, SkillId>,
}

impl SkillBook {
    /// Creates a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a book holding the built-in skills.
    #[must_use]
    pub fn standard() -> Self {
        let mut book = Self::new();
        for skill in builtin_skills() {
            book.by_name.insert(skill.name.to_lowercase(), skill.id);
            book.by_id.insert(skill.id, skill);
        }
        book
    }

    /// Parses and registers every skill in a TOML document.
    pub fn from_toml_str(content: &str) -> SkillBookResult<Self> {
        let mut book = Self::new();
        book.extend_from_toml_str(content)?;
        Ok(book)
    }

    /// Returns the number of registered skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Registers a skill after validating it.
    pub fn register(&mut self, skill: Skill) -> SkillBookResult<()> {
        skill.validate()?;
        if self.by_id.contains_key(&skill.id) {
            return Err(SkillBookError::DuplicateId(skill.id));
        }

        self.by_name.insert(skill.name.to_lowercase(), skill.id);
        self.by_id.insert(skill.id, skill);
        Ok(())
    }

    /// Gets a skill by ID.
    #[must_use]
    pub fn get(&self, id: SkillId) -> Option<&Skill> {
        self.by_id.get(&id)
    }

    /// Gets a skill by ID, or `UnknownSkill`.
    pub fn require(&self, id: SkillId) -> CombatResult<&Skill> {
        self.get(id).ok_or(CombatError::UnknownSkill(id))
    }

    /// Gets a skill by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Skill> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    /// Returns an iterator over all skills.
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.by_id.values()
    }

    /// Skills usable by a job at a level, ordered by ID.
    #[must_use]
    pub fn available_for(&self, job: Job, level: u32) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self
            .by_id
            .values()
            .filter(|s| s.check_usable(job, level).is_ok())
            .collect();
        skills.sort_by_key(|s| s.id);
        skills
    }

    /// Parses a TOML document and registers its skills.
    pub fn extend_from_toml_str(&mut self, content: &str) -> SkillBookResult<usize> {
        let file: SkillFile = toml::from_str(content)?;
        let mut count = 0;
        for skill in file.skills {
            self.register(skill)?;
            count += 1;
        }
        Ok(count)
    }

    /// Loads skills from a single file.
    pub fn load_file(&mut self, path: &Path) -> SkillBookResult<usize> {
        if !path.exists() {
            return Err(SkillBookError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let count = self.extend_from_toml_str(&content)?;
        debug!("Loaded {} skills from {:?}", count, path);
        info!("Skill book now holds {} skills", self.len());
        Ok(count)
    }
}

/// The built-in skills, one short list per job line.
#[must_use]
pub fn builtin_skills() -> Vec<Skill> {
    use Job::{Archer, Assassin, Magician, Thief, Warrior};

    vec![
        // Warrior line
        Skill::new(SkillId::new(1001), "Power Strike")
            .with_jobs(&[Warrior])
            .with_unlock_level(10)
            .with_mp_cost(8)
            .with_cooldown(800)
            .with_multiplier(2.6)
            .with_range(80.0),
        Skill::new(SkillId::new(1002), "Slash Blast")
            .with_jobs(&[Warrior])
            .with_unlock_level(12)
            .with_mp_cost(16)
            .with_cooldown(1_500)
            .with_multiplier(1.8)
            .with_aoe(110.0),
        Skill::new(SkillId::new(1003), "Rage")
            .with_jobs(&[Warrior])
            .with_unlock_level(15)
            .with_mp_cost(20)
            .with_cooldown(60_000)
            .with_effect(SkillEffect::Buff {
                buff: BuffKind::Attack,
                magnitude: 0.2,
                duration_ms: 120_000,
            }),
        // Magician line
        Skill::new(SkillId::new(2001), "Magic Claw")
            .with_jobs(&[Magician])
            .with_unlock_level(10)
            .with_mp_cost(12)
            .with_cooldown(900)
            .with_multiplier(1.4)
            .with_range(220.0)
            .with_hits(2)
            .as_magic()
            .as_projectile(),
        Skill::new(SkillId::new(2002), "Fire Arrow")
            .with_jobs(&[Magician])
            .with_unlock_level(15)
            .with_mp_cost(18)
            .with_cooldown(1_200)
            .with_multiplier(2.2)
            .with_range(260.0)
            .with_element(Element::Fire)
            .as_magic()
            .as_projectile(),
        Skill::new(SkillId::new(2003), "Heal")
            .with_jobs(&[Magician])
            .with_unlock_level(12)
            .with_mp_cost(24)
            .with_cooldown(3_000)
            .with_element(Element::Holy)
            .as_magic()
            .with_effect(SkillEffect::Heal { amount: 120 }),
        Skill::new(SkillId::new(2004), "Teleport")
            .with_jobs(&[Magician])
            .with_unlock_level(10)
            .with_mp_cost(10)
            .with_cooldown(1_000)
            .with_effect(SkillEffect::Teleport { range: 150.0 }),
        Skill::new(SkillId::new(2101), "Thunder Bolt")
            .with_jobs(&[Job::Wizard])
            .with_unlock_level(30)
            .with_mp_cost(30)
            .with_cooldown(2_000)
            .with_multiplier(1.6)
            .with_aoe(140.0)
            .with_element(Element::Lightning)
            .as_magic(),
        // Archer line
        Skill::new(SkillId::new(3001), "Double Shot")
            .with_jobs(&[Archer])
            .with_unlock_level(10)
            .with_mp_cost(10)
            .with_cooldown(700)
            .with_multiplier(1.3)
            .with_range(280.0)
            .with_hits(2)
            .as_projectile(),
        Skill::new(SkillId::new(3002), "Focused Shot")
            .with_jobs(&[Archer])
            .with_unlock_level(15)
            .with_mp_cost(16)
            .with_cooldown(1_500)
            .with_multiplier(2.4)
            .with_range(320.0)
            .with_crit_bonus(0.2)
            .as_projectile(),
        // Thief line
        Skill::new(SkillId::new(4001), "Lucky Seven")
            .with_jobs(&[Thief])
            .with_unlock_level(10)
            .with_mp_cost(14)
            .with_cooldown(800)
            .with_multiplier(1.5)
            .with_range(240.0)
            .with_hits(2)
            .with_crit_bonus(0.1)
            .as_projectile(),
        Skill::new(SkillId::new(4101), "Savage Blow")
            .with_jobs(&[Assassin])
            .with_unlock_level(30)
            .with_mp_cost(22)
            .with_cooldown(1_500)
            .with_multiplier(0.6)
            .with_range(80.0)
            .with_hits(6)
            .with_element(Element::Dark),
        // Shared
        Skill::new(SkillId::new(9001), "Iron Body")
            .with_mp_cost(10)
            .with_cooldown(30_000)
            .with_effect(SkillEffect::Buff {
                buff: BuffKind::Defense,
                magnitude: 0.15,
                duration_ms: 60_000,
            }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_skills_valid_and_unique() {
        let skills = builtin_skills();
        for skill in &skills {
            assert!(skill.validate().is_ok(), "{}", skill.name);
        }
        let book = SkillBook::standard();
        assert_eq!(book.len(), skills.len());
        assert!(book.get_by_name("power strike").is_some());
    }

    #[test]
    fn test_job_line_inheritance() {
        let book = SkillBook::standard();
        let power_strike = book.get(SkillId::new(1001)).expect("built-in");

        assert!(power_strike.check_usable(Job::Hero, 50).is_ok());
        assert_eq!(
            power_strike.check_usable(Job::Wizard, 50),
            Err(CombatError::JobIneligible {
                skill: SkillId::new(1001),
                job: Job::Wizard
            })
        );
        assert_eq!(
            power_strike.check_usable(Job::Warrior, 5),
            Err(CombatError::SkillLocked {
                skill: SkillId::new(1001),
                required: 10,
                current: 5
            })
        );
    }

    #[test]
    fn test_shared_skill_any_job() {
        let book = SkillBook::standard();
        let iron_body = book.get(SkillId::new(9001)).expect("built-in");
        for job in Job::ALL {
            assert!(iron_body.allows_job(job));
        }
    }

    #[test]
    fn test_available_for_sorted() {
        let book = SkillBook::standard();
        let skills = book.available_for(Job::Magician, 12);
        let ids: Vec<u32> = skills.iter().map(|s| s.id.raw()).collect();
        assert_eq!(ids, vec![2001, 2003, 2004, 9001]);
    }

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            version = "1.0.0"

            [[skills]]
            id = 5001
            name = "Flame Wheel"
            jobs = ["magician"]
            mp_cost = 25
            cooldown_ms = 2000
            damage_multiplier = 1.7
            aoe_radius = 120.0
            element = "fire"
            magic = true

            [[skills]]
            id = 5002
            name = "Bless"
            effect = { kind = "buff", buff = "defense", magnitude = 0.1, duration_ms = 30000 }
        "#;

        let book = SkillBook::from_toml_str(toml).expect("valid toml");
        assert_eq!(book.len(), 2);

        let wheel = book.get(SkillId::new(5001)).expect("loaded");
        assert_eq!(wheel.element, Element::Fire);
        assert_eq!(wheel.hit_count, 1);
        assert_eq!(wheel.unlock_level, 1);
        assert!(wheel.is_aoe());

        let bless = book.get(SkillId::new(5002)).expect("loaded");
        assert!(!bless.deals_damage());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut book = SkillBook::standard();
        let result = book.register(Skill::new(SkillId::new(1001), "Copy"));
        assert!(matches!(result, Err(SkillBookError::DuplicateId(_))));
    }

    #[test]
    fn test_validation_rejects_bad_definitions() {
        let zero_hits = Skill::new(SkillId::new(1), "Nothing").with_hits(0);
        assert!(matches!(
            zero_hits.validate(),
            Err(SkillBookError::ValidationError(_))
        ));

        let bad_heal = Skill::new(SkillId::new(2), "Mend").with_effect(SkillEffect::Heal { amount: 0 });
        assert!(bad_heal.validate().is_err());

        let bad_crit = Skill::new(SkillId::new(3), "Gamble").with_crit_bonus(1.5);
        assert!(bad_crit.validate().is_err());
    }

    #[test]
    fn test_require_unknown() {
        let book = SkillBook::new();
        assert_eq!(
            book.require(SkillId::new(77)).err(),
            Some(CombatError::UnknownSkill(SkillId::new(77)))
        );
    }
}
