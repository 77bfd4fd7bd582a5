//! Player combat state.
//!
//! This module provides:
//! - `PlayerCombatant`, which owns the player's stats, gear, buffs, pools
//!   and cooldowns
//! - The attack swing and dash state machines
//! - The gathering channel (harvest/fishing), cancelled by movement
//! - Defeat and revival

use emberfall_common::{heading, unit_from_heading, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffs::{BuffBonuses, BuffSet, ConsumableEffect, TimedBuff};
use crate::cooldown::{ResourcePool, SkillCooldowns, SwingTimer};
use crate::error::{CombatError, CombatResult};
use crate::progression::Progression;
use crate::resolver::DefenseOutcome;
use crate::skills::Skill;
use crate::stats::{
    effective_stats, CombatantStats, EffectiveStats, Equipment, EquipmentItem, EquipmentSlot,
};

/// Player movement and channel tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Base movement speed in units per second.
    pub move_speed: f32,
    /// Speed multiplier while dashing.
    pub dash_speed_multiplier: f32,
    /// Dash duration in milliseconds.
    pub dash_duration_ms: u64,
    /// Cooldown after a dash ends, in milliseconds.
    pub dash_cooldown_ms: u64,
    /// Harvest channel duration in milliseconds.
    pub harvest_duration_ms: u64,
    /// Fishing channel duration in milliseconds.
    pub fishing_duration_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 160.0,
            dash_speed_multiplier: 3.0,
            dash_duration_ms: 200,
            dash_cooldown_ms: 1_000,
            harvest_duration_ms: 3_000,
            fishing_duration_ms: 5_000,
        }
    }
}

// ============================================================================
// Dash
// ============================================================================

/// Dash state machine: `Ready -> Dashing -> Cooldown -> Ready`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DashState {
    /// A dash may start.
    #[default]
    Ready,
    /// Dashing along a fixed direction.
    Dashing {
        /// Time left in the dash
        remaining_ms: u64,
        /// Unit direction captured at start
        direction: Vec2,
    },
    /// Waiting before the next dash.
    Cooldown {
        /// Time left on the cooldown
        remaining_ms: u64,
    },
}

impl DashState {
    /// Returns true while the dash timer is active.
    #[must_use]
    pub const fn is_dashing(&self) -> bool {
        matches!(self, Self::Dashing { .. })
    }
}

// ============================================================================
// Gathering
// ============================================================================

/// Kind of gathering channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatherKind {
    /// Harvesting a plant or node.
    Harvest,
    /// Fishing at a spot.
    Fishing,
}

/// Gathering channel state, owned by the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherState {
    /// Not gathering.
    #[default]
    Idle,
    /// Channeling on a resource node.
    Channeling {
        /// Channel kind
        kind: GatherKind,
        /// External resource node ID
        node: u64,
        /// Time left in the channel
        remaining_ms: u64,
    },
}

/// A finished or interrupted gathering channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherOutcome {
    /// Channel kind
    pub kind: GatherKind,
    /// External resource node ID
    pub node: u64,
}

/// What a consumable did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConsumableOutcome {
    /// HP restored.
    Healed(u32),
    /// MP restored.
    ManaRestored(u32),
    /// A buff was applied.
    Buffed(TimedBuff),
}

/// Result of a hit landing on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHit {
    /// HP after the hit
    pub new_hp: u32,
    /// Damage taken
    pub damage: u32,
    /// Whether the hit was evaded
    pub evaded: bool,
    /// Whether this hit defeated the player
    pub defeated: bool,
    /// Channel interrupted by the defeat, if any
    pub interrupted: Option<GatherOutcome>,
}

// ============================================================================
// Player Combatant
// ============================================================================

/// The local player's combat state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCombatant {
    stats: CombatantStats,
    equipment: Equipment,
    buffs: BuffSet,
    pool: ResourcePool,
    cooldowns: SkillCooldowns,
    progression: Progression,
    swing: SwingTimer,
    dash: DashState,
    gather: GatherState,
    position: Vec2,
    facing: f32,
    movement_input: Vec2,
    defeated: bool,
    config: PlayerConfig,
}

impl PlayerCombatant {
    /// Create a player at `position` with full pools.
    #[must_use]
    pub fn new(stats: CombatantStats, position: Vec2) -> Self {
        Self::with_config(stats, position, PlayerConfig::default())
    }

    /// Create a player with custom configuration.
    #[must_use]
    pub fn with_config(stats: CombatantStats, position: Vec2, config: PlayerConfig) -> Self {
        let equipment = Equipment::new();
        let snapshot = effective_stats(&stats, &equipment, BuffBonuses::default());
        Self {
            stats,
            equipment,
            buffs: BuffSet::new(),
            pool: ResourcePool::full(snapshot.max_hp, snapshot.max_mp),
            cooldowns: SkillCooldowns::new(),
            progression: Progression::new(),
            swing: SwingTimer::new(),
            dash: DashState::Ready,
            gather: GatherState::Idle,
            position,
            facing: 0.0,
            movement_input: Vec2::ZERO,
            defeated: false,
            config,
        }
    }

    /// Persistent stats.
    #[must_use]
    pub fn stats(&self) -> &CombatantStats {
        &self.stats
    }

    /// Equipment.
    #[must_use]
    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    /// Active buffs (may hold unpruned entries).
    #[must_use]
    pub fn buffs(&self) -> &BuffSet {
        &self.buffs
    }

    /// HP/MP pool.
    #[must_use]
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Skill cooldown ledger.
    #[must_use]
    pub fn cooldowns(&self) -> &SkillCooldowns {
        &self.cooldowns
    }

    /// Experience and unspent points.
    #[must_use]
    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    /// Swing timer.
    #[must_use]
    pub fn swing(&self) -> &SwingTimer {
        &self.swing
    }

    /// Dash state.
    #[must_use]
    pub fn dash(&self) -> DashState {
        self.dash
    }

    /// Gathering state.
    #[must_use]
    pub fn gather(&self) -> GatherState {
        self.gather
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Facing heading in radians.
    #[must_use]
    pub fn facing(&self) -> f32 {
        self.facing
    }

    /// Whether the player is defeated.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Set position directly.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Turn to face `angle`.
    pub fn face(&mut self, angle: f32) {
        self.facing = angle;
    }

    /// Mutable stats and progression, for leveling and allocation.
    pub(crate) fn progression_parts(&mut self) -> (&mut CombatantStats, &mut Progression) {
        (&mut self.stats, &mut self.progression)
    }

    /// Mutable stats, for job changes.
    pub(crate) fn stats_mut(&mut self) -> &mut CombatantStats {
        &mut self.stats
    }

    /// Prune expired buffs and return them.
    pub fn prune_buffs(&mut self, now_ms: u64) -> Vec<TimedBuff> {
        self.buffs.prune_expired(now_ms)
    }

    /// Effective stats at `now_ms`, pruning expired buffs first.
    pub fn effective_stats(&mut self, now_ms: u64) -> EffectiveStats {
        let bonuses = self.buffs.active_bonuses(now_ms);
        effective_stats(&self.stats, &self.equipment, bonuses)
    }

    /// Re-read pool maxima after gear, level or attribute changes.
    pub fn sync_pool_maxima(&mut self) {
        let snapshot = effective_stats(&self.stats, &self.equipment, BuffBonuses::default());
        self.pool.set_max(snapshot.max_hp, snapshot.max_mp);
    }

    /// Equip an item, returning the one it replaced.
    pub fn equip(&mut self, item: EquipmentItem) -> Option<EquipmentItem> {
        let previous = self.equipment.equip(item);
        self.sync_pool_maxima();
        previous
    }

    /// Unequip a slot.
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<EquipmentItem> {
        let removed = self.equipment.unequip(slot);
        self.sync_pool_maxima();
        removed
    }

    // ------------------------------------------------------------------------
    // Attack and skills
    // ------------------------------------------------------------------------

    /// Start a weapon swing.
    pub fn start_attack(&mut self) -> CombatResult<()> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        let cooldown_ms = self
            .equipment
            .weapon_profile()
            .map_or(crate::stats::DEFAULT_SWING_COOLDOWN_MS, |w| w.swing_cooldown_ms);
        self.swing.start(cooldown_ms)
    }

    /// Validate and commit a skill use: job line, level, cooldown, then MP.
    pub fn use_skill(&mut self, skill: &Skill, now_ms: u64) -> CombatResult<()> {
        self.check_skill(skill, now_ms)?;
        self.cooldowns.use_skill(skill, &mut self.pool, now_ms)
    }

    /// Check whether a skill could be used now without committing anything.
    pub fn check_skill(&self, skill: &Skill, now_ms: u64) -> CombatResult<()> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        skill.check_usable(self.stats.job, self.stats.level)?;
        let remaining_ms = self.cooldowns.remaining_ms(skill.id, now_ms);
        if remaining_ms > 0 {
            return Err(CombatError::OnCooldown { remaining_ms });
        }
        if self.pool.mp() < skill.mp_cost {
            return Err(CombatError::InsufficientResource {
                needed: skill.mp_cost,
                available: self.pool.mp(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Movement and dash
    // ------------------------------------------------------------------------

    /// Set the movement input direction.
    ///
    /// Non-zero input turns the player and cancels any gathering channel.
    pub fn set_movement_input(&mut self, direction: Vec2) -> Option<GatherOutcome> {
        self.movement_input = direction;
        if direction.length_squared() > f32::EPSILON {
            self.facing = heading(direction);
            return self.cancel_gathering();
        }
        None
    }

    /// Current movement input.
    #[must_use]
    pub fn movement_input(&self) -> Vec2 {
        self.movement_input
    }

    /// Start a dash along the movement input, or facing when idle.
    ///
    /// Returns the captured unit direction.
    pub fn start_dash(&mut self) -> CombatResult<Vec2> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        match self.dash {
            DashState::Dashing { .. } => Err(CombatError::AlreadyInState),
            DashState::Cooldown { remaining_ms } => Err(CombatError::OnCooldown { remaining_ms }),
            DashState::Ready => {
                let direction = self
                    .movement_input
                    .try_normalize()
                    .unwrap_or_else(|| unit_from_heading(self.facing));
                self.dash = DashState::Dashing {
                    remaining_ms: self.config.dash_duration_ms,
                    direction,
                };
                Ok(direction)
            },
        }
    }

    /// Movement speed, multiplied only while dashing.
    #[must_use]
    pub fn movement_speed(&self) -> f32 {
        if self.dash.is_dashing() {
            self.config.move_speed * self.config.dash_speed_multiplier
        } else {
            self.config.move_speed
        }
    }

    /// Velocity in units per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        if self.defeated {
            return Vec2::ZERO;
        }
        let direction = match self.dash {
            DashState::Dashing { direction, .. } => direction,
            _ => self.movement_input.normalize_or_zero(),
        };
        direction * self.movement_speed()
    }

    // ------------------------------------------------------------------------
    // Gathering
    // ------------------------------------------------------------------------

    /// Start a gathering channel on a resource node.
    pub fn start_gathering(&mut self, kind: GatherKind, node: u64) -> CombatResult<()> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        if matches!(self.gather, GatherState::Channeling { .. }) {
            return Err(CombatError::AlreadyInState);
        }
        let remaining_ms = match kind {
            GatherKind::Harvest => self.config.harvest_duration_ms,
            GatherKind::Fishing => self.config.fishing_duration_ms,
        };
        self.gather = GatherState::Channeling {
            kind,
            node,
            remaining_ms,
        };
        Ok(())
    }

    /// Cancel the gathering channel, if any.
    pub fn cancel_gathering(&mut self) -> Option<GatherOutcome> {
        match std::mem::take(&mut self.gather) {
            GatherState::Idle => None,
            GatherState::Channeling { kind, node, .. } => {
                debug!("Gathering cancelled: {:?} node {}", kind, node);
                Some(GatherOutcome { kind, node })
            },
        }
    }

    // ------------------------------------------------------------------------
    // Per-tick advance
    // ------------------------------------------------------------------------

    /// Advance swing, dash and gathering timers and apply movement.
    ///
    /// Returns a completed gathering channel, if one finished this tick.
    pub fn advance(&mut self, dt_ms: u64) -> Option<GatherOutcome> {
        self.swing.advance(dt_ms);

        let velocity = self.velocity();
        self.position += velocity * (dt_ms as f32 / 1000.0);

        self.dash = match self.dash {
            DashState::Dashing {
                remaining_ms,
                direction,
            } => {
                if remaining_ms > dt_ms {
                    DashState::Dashing {
                        remaining_ms: remaining_ms - dt_ms,
                        direction,
                    }
                } else {
                    DashState::Cooldown {
                        remaining_ms: self.config.dash_cooldown_ms,
                    }
                }
            },
            DashState::Cooldown { remaining_ms } if remaining_ms > dt_ms => DashState::Cooldown {
                remaining_ms: remaining_ms - dt_ms,
            },
            DashState::Cooldown { .. } | DashState::Ready => DashState::Ready,
        };

        if let GatherState::Channeling {
            kind,
            node,
            remaining_ms,
        } = self.gather
        {
            if remaining_ms > dt_ms {
                self.gather = GatherState::Channeling {
                    kind,
                    node,
                    remaining_ms: remaining_ms - dt_ms,
                };
            } else {
                self.gather = GatherState::Idle;
                return Some(GatherOutcome { kind, node });
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Damage, healing and consumables
    // ------------------------------------------------------------------------

    /// Apply a resolved hit. Evaded hits leave HP untouched.
    pub fn take_hit(&mut self, outcome: DefenseOutcome) -> PlayerHit {
        if outcome.evaded || self.defeated {
            return PlayerHit {
                new_hp: self.pool.hp(),
                damage: 0,
                evaded: outcome.evaded,
                defeated: false,
                interrupted: None,
            };
        }

        let damage = self.pool.take_hp(outcome.damage);
        let mut interrupted = None;
        let defeated = self.pool.is_depleted();
        if defeated {
            self.defeated = true;
            self.dash = DashState::Ready;
            self.movement_input = Vec2::ZERO;
            interrupted = self.cancel_gathering();
            debug!("Player defeated");
        }

        PlayerHit {
            new_hp: self.pool.hp(),
            damage,
            evaded: false,
            defeated,
            interrupted,
        }
    }

    /// Restore HP, returning the amount restored.
    pub fn heal(&mut self, amount: u32) -> CombatResult<u32> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        Ok(self.pool.restore_hp(amount))
    }

    /// Apply a buff.
    pub fn apply_buff(&mut self, buff: TimedBuff) -> CombatResult<()> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        self.buffs.apply(buff);
        Ok(())
    }

    /// Use a consumable.
    pub fn use_consumable(&mut self, effect: ConsumableEffect, now_ms: u64) -> CombatResult<ConsumableOutcome> {
        if self.defeated {
            return Err(CombatError::Incapacitated);
        }
        let outcome = match effect {
            ConsumableEffect::RestoreHp { amount } => ConsumableOutcome::Healed(self.pool.restore_hp(amount)),
            ConsumableEffect::RestoreMp { amount } => {
                ConsumableOutcome::ManaRestored(self.pool.restore_mp(amount))
            },
            ConsumableEffect::Buff {
                kind,
                magnitude,
                duration_ms,
            } => {
                let buff = TimedBuff::new(kind, magnitude, now_ms, duration_ms);
                self.buffs.apply(buff);
                ConsumableOutcome::Buffed(buff)
            },
        };
        Ok(outcome)
    }

    /// Revive with a fraction of max HP (at least 1).
    pub fn revive(&mut self, hp_fraction: f32) -> CombatResult<u32> {
        if !self.defeated {
            return Err(CombatError::AlreadyInState);
        }
        let hp = ((self.pool.max_hp() as f32 * hp_fraction.clamp(0.0, 1.0)) as u32).max(1);
        self.pool.set_hp(hp);
        self.buffs.clear();
        self.defeated = false;
        Ok(self.pool.hp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::BuffKind;
    use crate::stats::{Attributes, EquipmentBonus, Job, WeaponProfile, WeaponStyle};
    use emberfall_common::SkillId;

    fn player() -> PlayerCombatant {
        let stats = CombatantStats::new(Job::Warrior)
            .with_attributes(Attributes::new(20, 5, 4, 5, 4))
            .with_level(15);
        PlayerCombatant::new(stats, Vec2::ZERO)
    }

    #[test]
    fn test_pools_start_full() {
        let p = player();
        // 50 + 5*10, 10 + 4*5
        assert_eq!(p.pool().hp(), 100);
        assert_eq!(p.pool().max_mp(), 30);
    }

    #[test]
    fn test_attack_uses_weapon_cooldown() {
        let mut p = player();
        p.equip(EquipmentItem::weapon(
            "Axe",
            EquipmentBonus::default(),
            WeaponProfile {
                style: WeaponStyle::Melee,
                swing_cooldown_ms: 800,
            },
        ));
        assert!(p.start_attack().is_ok());
        assert_eq!(p.swing().remaining_ms(), 800);
        assert_eq!(p.start_attack(), Err(CombatError::AlreadyInState));

        p.advance(400);
        assert!(!p.swing().is_swinging());
        assert_eq!(
            p.start_attack(),
            Err(CombatError::OnCooldown { remaining_ms: 400 })
        );
    }

    #[test]
    fn test_dash_cycle() {
        let mut p = player();
        p.set_movement_input(Vec2::new(0.0, 2.0));
        let direction = p.start_dash().expect("ready");
        assert!((direction - Vec2::Y).length() < 1e-6);
        assert!((p.movement_speed() - 480.0).abs() < 1e-3);
        assert_eq!(p.start_dash(), Err(CombatError::AlreadyInState));

        p.advance(200);
        assert!(matches!(p.dash(), DashState::Cooldown { remaining_ms: 1_000 }));
        assert!((p.movement_speed() - 160.0).abs() < 1e-3);
        assert_eq!(
            p.start_dash(),
            Err(CombatError::OnCooldown { remaining_ms: 1_000 })
        );

        p.advance(1_000);
        assert_eq!(p.dash(), DashState::Ready);
    }

    #[test]
    fn test_dash_falls_back_to_facing() {
        let mut p = player();
        p.face(std::f32::consts::PI);
        let direction = p.start_dash().expect("ready");
        assert!((direction - Vec2::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_dash_moves_player() {
        let mut p = player();
        p.face(0.0);
        assert!(p.start_dash().is_ok());
        p.advance(100);
        // 480 units/s for 0.1 s
        assert!((p.position().x - 48.0).abs() < 1e-3);
    }

    #[test]
    fn test_movement_cancels_gathering() {
        let mut p = player();
        assert!(p.start_gathering(GatherKind::Fishing, 7).is_ok());
        assert_eq!(
            p.start_gathering(GatherKind::Harvest, 8),
            Err(CombatError::AlreadyInState)
        );

        assert!(p.set_movement_input(Vec2::ZERO).is_none());
        let cancelled = p.set_movement_input(Vec2::X);
        assert_eq!(
            cancelled,
            Some(GatherOutcome {
                kind: GatherKind::Fishing,
                node: 7
            })
        );
        assert_eq!(p.gather(), GatherState::Idle);
    }

    #[test]
    fn test_gathering_completes() {
        let mut p = player();
        assert!(p.start_gathering(GatherKind::Harvest, 3).is_ok());
        assert!(p.advance(2_999).is_none());
        assert_eq!(
            p.advance(1),
            Some(GatherOutcome {
                kind: GatherKind::Harvest,
                node: 3
            })
        );
    }

    #[test]
    fn test_evaded_hit_keeps_hp() {
        let mut p = player();
        let hit = p.take_hit(DefenseOutcome {
            damage: 0,
            evaded: true,
        });
        assert!(hit.evaded);
        assert_eq!(hit.new_hp, 100);
    }

    #[test]
    fn test_defeat_blocks_actions_until_revive() {
        let mut p = player();
        let hit = p.take_hit(DefenseOutcome {
            damage: 500,
            evaded: false,
        });
        assert!(hit.defeated);
        assert_eq!(hit.damage, 100);
        assert!(p.is_defeated());
        assert_eq!(p.start_attack(), Err(CombatError::Incapacitated));
        assert_eq!(p.start_dash(), Err(CombatError::Incapacitated));
        assert_eq!(p.velocity(), Vec2::ZERO);

        assert_eq!(p.revive(0.5), Ok(50));
        assert!(p.start_attack().is_ok());
    }

    #[test]
    fn test_skill_checks_order() {
        let mut p = player();
        let skill = Skill::new(SkillId::new(1), "Cleave")
            .with_jobs(&[Job::Warrior])
            .with_mp_cost(20)
            .with_cooldown(1_000);

        assert!(p.use_skill(&skill, 0).is_ok());
        assert_eq!(p.pool().mp(), 10);
        assert_eq!(
            p.use_skill(&skill, 500),
            Err(CombatError::OnCooldown { remaining_ms: 500 })
        );
        assert_eq!(
            p.use_skill(&skill, 1_000),
            Err(CombatError::InsufficientResource {
                needed: 20,
                available: 10
            })
        );
    }

    #[test]
    fn test_consumables() {
        let mut p = player();
        assert!(p.use_skill(&Skill::new(SkillId::new(2), "Drain").with_mp_cost(30), 0).is_ok());
        assert_eq!(
            p.use_consumable(ConsumableEffect::BLUE_POTION, 0),
            Ok(ConsumableOutcome::ManaRestored(30))
        );

        let outcome = p.use_consumable(ConsumableEffect::WARRIOR_ELIXIR, 1_000);
        assert!(matches!(outcome, Ok(ConsumableOutcome::Buffed(_))));
        let boosted = p.effective_stats(1_000);
        let expired = p.effective_stats(181_000);
        assert!(boosted.attack > expired.attack);
        assert!(p.buffs().get(BuffKind::Attack).is_none());
    }

    #[test]
    fn test_equip_updates_pool_max() {
        let mut p = player();
        p.equip(EquipmentItem::armor(
            "Plate",
            EquipmentSlot::Body,
            EquipmentBonus {
                hp: 40,
                ..EquipmentBonus::default()
            },
        ));
        assert_eq!(p.pool().max_hp(), 140);
        p.unequip(EquipmentSlot::Body);
        assert_eq!(p.pool().max_hp(), 100);
    }
}
