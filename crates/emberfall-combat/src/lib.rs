//! # Emberfall Combat
//!
//! Real-time combat and hostile-entity simulation for Emberfall.
//!
//! This crate provides:
//! - Stat aggregation (base stats, equipment and timed buffs)
//! - Skill cooldowns, MP ledger and the basic-attack swing timer
//! - Skill definitions and the TOML skill book
//! - Damage formulas with crit, variance, evasion and mitigation
//! - Cone and radius targeting
//! - Player attack, dash and gathering state machines
//! - Monster AI (idle/chase/attack/return/dead) and respawn
//! - Experience, leveling and job advancement
//! - A tick driver that runs all of the above in a fixed order and emits
//!   `CombatEvent`s on a bounded bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buffs;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod events;
pub mod monster;
pub mod player;
pub mod progression;
pub mod resolver;
pub mod simulation;
pub mod skills;
pub mod stats;
pub mod targeting;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffs::*;
    pub use crate::config::*;
    pub use crate::cooldown::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::monster::*;
    pub use crate::player::*;
    pub use crate::progression::*;
    pub use crate::resolver::*;
    pub use crate::simulation::*;
    pub use crate::skills::*;
    pub use crate::stats::*;
    pub use crate::targeting::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use emberfall_common::{SkillId, Vec2};

    #[test]
    fn test_warrior_scenario_end_to_end() {
        // STR 20 warrior, no gear, target defense 10, no crit, no variance:
        // floor((10 + 20 * 2) * 1.1 - 5) = 50
        let stats = CombatantStats::new(Job::Warrior).with_attributes(Attributes::new(20, 4, 4, 4, 4));
        let snapshot = effective_stats(&stats, &Equipment::new(), BuffBonuses::default());
        let resolver = CombatResolver::with_config(ResolverConfig {
            variance: 0.0,
            ..ResolverConfig::default()
        });
        let hit = resolver.resolve_basic_attack(&snapshot, 10.0, DamageRoll::Live(&mut FixedRandom(0.99)));
        assert_eq!(hit.damage, 50);
        assert!(!hit.is_critical);
    }

    #[test]
    fn test_cooldown_gate_through_player() {
        let stats = CombatantStats::new(Job::Warrior).with_level(20);
        let mut player = PlayerCombatant::new(stats, Vec2::ZERO);
        let skill = Skill::new(SkillId::new(5), "Bash").with_cooldown(1_000);

        assert!(player.use_skill(&skill, 0).is_ok());
        assert!(!player.cooldowns().can_use_skill(skill.id, 999));
        assert!(player.cooldowns().can_use_skill(skill.id, 1_000));
    }

    #[test]
    fn test_prelude_covers_simulation() {
        let sim = CombatSimulation::from_stats(
            CombatantStats::new(Job::Beginner),
            Vec2::ZERO,
            CombatConfig::default(),
        );
        assert_eq!(sim.now_ms(), 0);
        assert!(sim.registry().is_empty());
        assert!(!sim.skills().is_empty());
    }
}
