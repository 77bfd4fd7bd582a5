//! Character progression.
//!
//! Experience and leveling, ability-point allocation and job advancement.
//! These are the only paths that mutate `CombatantStats`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CombatError, CombatResult};
use crate::stats::{AttributeKind, CombatantStats, Job};

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 200;

/// Minimum level for each advancement tier (tier 1, 2, 3).
pub const JOB_ADVANCE_LEVELS: [u32; 3] = [10, 30, 70];

/// Growth granted per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Ability points per level.
    pub ability_points_per_level: u32,
    /// Base max HP per level.
    pub hp_per_level: u32,
    /// Base max MP per level.
    pub mp_per_level: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            ability_points_per_level: 5,
            hp_per_level: 12,
            mp_per_level: 6,
        }
    }
}

/// Experience needed to go from `level` to `level + 1`.
#[must_use]
pub fn exp_to_next_level(level: u32) -> u64 {
    let level = u64::from(level.max(1));
    12 * level * level + 15
}

/// Minimum character level for a job.
#[must_use]
pub fn required_level(job: Job) -> u32 {
    match job.tier() {
        0 => 1,
        tier => JOB_ADVANCE_LEVELS[usize::from(tier - 1).min(JOB_ADVANCE_LEVELS.len() - 1)],
    }
}

/// Experience and unspent points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    /// Experience toward the next level.
    pub experience: u64,
    /// Unspent ability points.
    pub ability_points: u32,
}

impl Progression {
    /// Create a fresh progression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of the way to the next level.
    #[must_use]
    pub fn level_progress(&self, level: u32) -> f32 {
        if level >= MAX_LEVEL {
            return 1.0;
        }
        (self.experience as f64 / exp_to_next_level(level) as f64) as f32
    }

    /// Add experience, leveling as many times as it covers.
    ///
    /// Returns each new level reached, in order.
    pub fn gain_experience(
        &mut self,
        stats: &mut CombatantStats,
        amount: u64,
        config: &ProgressionConfig,
    ) -> Vec<u32> {
        let mut reached = Vec::new();
        if stats.level >= MAX_LEVEL {
            return reached;
        }

        self.experience = self.experience.saturating_add(amount);
        while stats.level < MAX_LEVEL {
            let needed = exp_to_next_level(stats.level);
            if self.experience < needed {
                break;
            }
            self.experience -= needed;
            stats.level += 1;
            stats.base_max_hp = stats.base_max_hp.saturating_add(config.hp_per_level);
            stats.base_max_mp = stats.base_max_mp.saturating_add(config.mp_per_level);
            self.ability_points = self
                .ability_points
                .saturating_add(config.ability_points_per_level);
            reached.push(stats.level);
            info!("Reached level {}", stats.level);
        }

        if stats.level >= MAX_LEVEL {
            self.experience = 0;
        }
        reached
    }

    /// Spend one ability point on an attribute.
    pub fn allocate_stat(&mut self, stats: &mut CombatantStats, kind: AttributeKind) -> CombatResult<()> {
        if self.ability_points == 0 {
            return Err(CombatError::NoStatPoints);
        }
        self.ability_points -= 1;
        stats.attributes.add_points(kind, 1);
        Ok(())
    }
}

/// Change job along the advancement tree.
pub fn advance_job(stats: &mut CombatantStats, to: Job) -> CombatResult<()> {
    let from = stats.job;
    if !from.advancements().contains(&to) || stats.level < required_level(to) {
        return Err(CombatError::InvalidJobAdvance { from, to });
    }
    stats.job = to;
    info!("Advanced from {:?} to {:?}", from, to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_up_awards_points() {
        let mut stats = CombatantStats::new(Job::Beginner);
        let mut progress = Progression::new();
        let config = ProgressionConfig::default();

        // Level 1 needs 27, level 2 needs 63.
        let reached = progress.gain_experience(&mut stats, 27 + 63 + 5, &config);

        assert_eq!(reached, vec![2, 3]);
        assert_eq!(stats.level, 3);
        assert_eq!(progress.experience, 5);
        assert_eq!(progress.ability_points, 10);
        assert_eq!(stats.base_max_hp, 50 + 24);
    }

    #[test]
    fn test_no_level_below_threshold() {
        let mut stats = CombatantStats::new(Job::Beginner);
        let mut progress = Progression::new();
        assert!(progress
            .gain_experience(&mut stats, 26, &ProgressionConfig::default())
            .is_empty());
        assert!((progress.level_progress(1) - 26.0 / 27.0).abs() < 1e-5);
    }

    #[test]
    fn test_allocate_requires_points() {
        let mut stats = CombatantStats::new(Job::Warrior);
        let mut progress = Progression::new();
        assert_eq!(
            progress.allocate_stat(&mut stats, AttributeKind::Strength),
            Err(CombatError::NoStatPoints)
        );

        progress.ability_points = 1;
        let before = stats.attributes.strength;
        assert!(progress.allocate_stat(&mut stats, AttributeKind::Strength).is_ok());
        assert_eq!(stats.attributes.strength, before + 1);
        assert_eq!(progress.ability_points, 0);
    }

    #[test]
    fn test_job_advance_requires_level_and_path() {
        let mut stats = CombatantStats::new(Job::Beginner).with_level(9);
        assert!(advance_job(&mut stats, Job::Warrior).is_err());

        stats.level = 10;
        assert!(advance_job(&mut stats, Job::Warrior).is_ok());
        assert_eq!(
            advance_job(&mut stats, Job::Wizard),
            Err(CombatError::InvalidJobAdvance {
                from: Job::Warrior,
                to: Job::Wizard
            })
        );

        stats.level = 29;
        assert!(advance_job(&mut stats, Job::Knight).is_err());
        stats.level = 30;
        assert!(advance_job(&mut stats, Job::Knight).is_ok());
    }

    #[test]
    fn test_required_levels() {
        assert_eq!(required_level(Job::Beginner), 1);
        assert_eq!(required_level(Job::Thief), 10);
        assert_eq!(required_level(Job::Ranger), 30);
        assert_eq!(required_level(Job::Archmage), 70);
    }
}
