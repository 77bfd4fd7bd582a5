//! Hostile entities and their AI.
//!
//! This module provides:
//! - Monster kinds and their stat profiles
//! - The per-entity state machine (idle/chase/attack/return/dead)
//! - Damage application, death and respawn
//! - `EntityRegistry`, which spawns and owns every hostile entity

use std::f32::consts::TAU;

use emberfall_common::{step_toward, EntityId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolver::RandomSource;
use crate::targeting::Targetable;

// ============================================================================
// Monster Kinds
// ============================================================================

/// Monster species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterKind {
    /// Slow, weak starter monster.
    Snail,
    /// Bouncy starter monster.
    Slime,
    /// Forest monster.
    Mushroom,
    /// Tough, slow forest monster.
    Stump,
    /// Fast charger.
    Boar,
    /// Heavy elite.
    Golem,
}

/// Stat profile for a monster kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonsterProfile {
    /// Max HP
    pub max_hp: u32,
    /// Raw damage dealt to the player per attack
    pub attack: u32,
    /// Flat damage subtracted from each incoming hit
    pub defense: u32,
    /// Movement speed in units per second
    pub speed: f32,
    /// Distance at which an idle monster notices the player
    pub aggro_range: f32,
    /// Distance at which the monster can attack
    pub attack_range: f32,
    /// Time from death to respawn in milliseconds
    pub respawn_ms: u64,
    /// Experience awarded on kill
    pub exp_reward: u64,
    /// Radius around spawn used for wandering
    pub wander_radius: f32,
}

impl MonsterKind {
    /// All kinds.
    pub const ALL: [Self; 6] = [
        Self::Snail,
        Self::Slime,
        Self::Mushroom,
        Self::Stump,
        Self::Boar,
        Self::Golem,
    ];

    /// Default profile for this kind.
    #[must_use]
    pub const fn profile(self) -> MonsterProfile {
        let (max_hp, attack, defense, speed, aggro_range, attack_range, respawn_ms, exp_reward) =
            match self {
                Self::Snail => (15, 5, 0, 30.0, 100.0, 30.0, 8_000, 3),
                Self::Slime => (50, 12, 2, 60.0, 150.0, 40.0, 10_000, 10),
                Self::Mushroom => (80, 18, 5, 50.0, 160.0, 40.0, 12_000, 16),
                Self::Stump => (120, 22, 12, 35.0, 120.0, 45.0, 15_000, 22),
                Self::Boar => (160, 30, 8, 110.0, 200.0, 45.0, 15_000, 35),
                Self::Golem => (400, 55, 25, 45.0, 180.0, 60.0, 30_000, 90),
            };
        MonsterProfile {
            max_hp,
            attack,
            defense,
            speed,
            aggro_range,
            attack_range,
            respawn_ms,
            exp_reward,
            wander_radius: 80.0,
        }
    }
}

// ============================================================================
// AI Configuration
// ============================================================================

/// Tuning shared by every monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterAiConfig {
    /// Time between attacks in milliseconds.
    pub attack_cooldown_ms: u64,
    /// Shortest wander re-pick interval.
    pub wander_min_ms: u64,
    /// Longest wander re-pick interval.
    pub wander_max_ms: u64,
    /// Wander speed as a fraction of full speed.
    pub wander_speed_factor: f32,
    /// Leash: return when further than this many aggro ranges from spawn.
    pub leash_factor: f32,
    /// Return when the player is further than this many aggro ranges.
    pub escape_factor: f32,
    /// Drop from attack to chase beyond this many attack ranges.
    pub attack_exit_factor: f32,
    /// Re-aggro while returning within this many aggro ranges.
    pub reaggro_factor: f32,
    /// Distance to spawn that counts as arrived.
    pub arrival_epsilon: f32,
    /// Fraction of max HP healed on arriving home.
    pub return_heal_fraction: f32,
}

impl Default for MonsterAiConfig {
    fn default() -> Self {
        Self {
            attack_cooldown_ms: 1_500,
            wander_min_ms: 2_000,
            wander_max_ms: 5_000,
            wander_speed_factor: 0.5,
            leash_factor: 2.0,
            escape_factor: 1.5,
            attack_exit_factor: 1.2,
            reaggro_factor: 0.8,
            arrival_epsilon: 1.0,
            return_heal_fraction: 0.1,
        }
    }
}

// ============================================================================
// Hostile Entity
// ============================================================================

/// AI state of a hostile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiState {
    /// Wandering near spawn.
    Idle,
    /// Moving toward the player.
    Chase,
    /// In range and attacking.
    Attack,
    /// Walking back to spawn.
    Return,
    /// Waiting to respawn.
    Dead,
}

/// Outcome of damage applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHit {
    /// Damage actually removed
    pub damage: u32,
    /// HP after the hit
    pub new_hp: u32,
    /// Whether the hit killed the entity
    pub killed: bool,
    /// State change caused by the hit, if any
    pub transition: Option<AiState>,
}

/// What one AI step produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonsterStep {
    /// New state, if the entity changed state
    pub transition: Option<AiState>,
    /// Raw damage aimed at the player this tick
    pub attack: Option<f32>,
    /// Whether the entity respawned this tick
    pub respawned: bool,
}

/// A monster tracked by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileEntity {
    id: EntityId,
    kind: MonsterKind,
    profile: MonsterProfile,
    position: Vec2,
    spawn: Vec2,
    hp: u32,
    state: AiState,
    wander_target: Vec2,
    idle_timer_ms: u64,
    attack_cooldown_ms: u64,
    respawn_timer_ms: u64,
}

impl HostileEntity {
    /// Create an idle entity at its spawn anchor with the kind's profile.
    #[must_use]
    pub fn new(id: EntityId, kind: MonsterKind, spawn: Vec2) -> Self {
        Self::with_profile(id, kind, kind.profile(), spawn)
    }

    /// Create an entity with a custom profile.
    #[must_use]
    pub fn with_profile(id: EntityId, kind: MonsterKind, profile: MonsterProfile, spawn: Vec2) -> Self {
        Self {
            id,
            kind,
            profile,
            position: spawn,
            spawn,
            hp: profile.max_hp,
            state: AiState::Idle,
            wander_target: spawn,
            idle_timer_ms: 0,
            attack_cooldown_ms: 0,
            respawn_timer_ms: 0,
        }
    }

    /// Entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Kind.
    #[must_use]
    pub fn kind(&self) -> MonsterKind {
        self.kind
    }

    /// Stat profile.
    #[must_use]
    pub fn profile(&self) -> &MonsterProfile {
        &self.profile
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Spawn anchor.
    #[must_use]
    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// Current HP.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Max HP.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        self.profile.max_hp
    }

    /// AI state.
    #[must_use]
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Check if alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != AiState::Dead
    }

    /// Time until respawn while dead.
    #[must_use]
    pub fn respawn_remaining_ms(&self) -> u64 {
        self.respawn_timer_ms
    }

    fn enter(&mut self, state: AiState) -> Option<AiState> {
        if self.state == state {
            return None;
        }
        debug!("{} {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
        Some(state)
    }

    fn die(&mut self) -> Option<AiState> {
        self.hp = 0;
        self.respawn_timer_ms = self.profile.respawn_ms;
        self.enter(AiState::Dead)
    }

    /// Apply a hit: `max(1, incoming - defense)`.
    ///
    /// Returns `None` for dead entities. Damage always aggroes an idle or
    /// returning entity.
    pub fn apply_damage(&mut self, incoming: u32) -> Option<EntityHit> {
        if !self.is_alive() {
            return None;
        }
        let actual = incoming.saturating_sub(self.profile.defense).max(1);
        let damage = actual.min(self.hp);
        self.hp -= damage;

        let (killed, transition) = if self.hp == 0 {
            (true, self.die())
        } else if matches!(self.state, AiState::Idle | AiState::Return) {
            (false, self.enter(AiState::Chase))
        } else {
            (false, None)
        };

        Some(EntityHit {
            damage,
            new_hp: self.hp,
            killed,
            transition,
        })
    }

    /// Lower HP to `new_hp` from an outside source. HP never rises this way
    /// and no aggro is drawn.
    pub fn reconcile_hp(&mut self, new_hp: u32) -> Option<EntityHit> {
        if !self.is_alive() || new_hp >= self.hp {
            return None;
        }
        let damage = self.hp - new_hp;
        self.hp = new_hp;
        let (killed, transition) = if new_hp == 0 {
            (true, self.die())
        } else {
            (false, None)
        };
        Some(EntityHit {
            damage,
            new_hp,
            killed,
            transition,
        })
    }

    /// Advance one tick against the local player.
    ///
    /// `player` is `None` while the player is defeated. Transitions are
    /// evaluated first, then the current state's action runs.
    pub fn advance(
        &mut self,
        dt_ms: u64,
        player: Option<Vec2>,
        config: &MonsterAiConfig,
        rng: &mut dyn RandomSource,
    ) -> MonsterStep {
        let mut step = MonsterStep::default();
        self.attack_cooldown_ms = self.attack_cooldown_ms.saturating_sub(dt_ms);

        if self.state == AiState::Dead {
            self.respawn_timer_ms = self.respawn_timer_ms.saturating_sub(dt_ms);
            if self.respawn_timer_ms == 0 {
                self.respawn();
                step.respawned = true;
                step.transition = Some(AiState::Idle);
            }
            return step;
        }

        let next = self.evaluate(player, config);
        if next == AiState::Idle && self.state == AiState::Return {
            let heal = (self.profile.max_hp as f32 * config.return_heal_fraction) as u32;
            self.hp = self.hp.saturating_add(heal).min(self.profile.max_hp);
            self.idle_timer_ms = 0;
        }
        step.transition = self.enter(next);

        let dt = dt_ms as f32 / 1000.0;
        match self.state {
            AiState::Idle => {
                if self.idle_timer_ms <= dt_ms {
                    self.pick_wander_target(config, rng);
                } else {
                    self.idle_timer_ms -= dt_ms;
                }
                let speed = self.profile.speed * config.wander_speed_factor;
                self.position = step_toward(self.position, self.wander_target, speed * dt);
            },
            AiState::Chase => {
                if let Some(target) = player {
                    self.position = step_toward(self.position, target, self.profile.speed * dt);
                }
            },
            AiState::Attack => {
                if self.attack_cooldown_ms == 0 {
                    self.attack_cooldown_ms = config.attack_cooldown_ms;
                    step.attack = Some(self.profile.attack as f32);
                }
            },
            AiState::Return => {
                self.position = step_toward(self.position, self.spawn, self.profile.speed * dt);
            },
            AiState::Dead => {},
        }

        step
    }

    fn evaluate(&self, player: Option<Vec2>, config: &MonsterAiConfig) -> AiState {
        let aggro = self.profile.aggro_range;
        let to_player = player.map(|p| self.position.distance(p));
        let to_spawn = self.position.distance(self.spawn);

        match (self.state, to_player) {
            (AiState::Idle, Some(d)) if d < aggro => AiState::Chase,
            (AiState::Chase | AiState::Attack, None) => AiState::Return,
            (AiState::Chase, Some(d)) => {
                if to_spawn > aggro * config.leash_factor || d > aggro * config.escape_factor {
                    AiState::Return
                } else if d < self.profile.attack_range {
                    AiState::Attack
                } else {
                    AiState::Chase
                }
            },
            (AiState::Attack, Some(d)) if d > self.profile.attack_range * config.attack_exit_factor => {
                AiState::Chase
            },
            (AiState::Return, Some(d)) if d < aggro * config.reaggro_factor => AiState::Chase,
            (AiState::Return, _) if to_spawn < config.arrival_epsilon => AiState::Idle,
            (state, _) => state,
        }
    }

    fn pick_wander_target(&mut self, config: &MonsterAiConfig, rng: &mut dyn RandomSource) {
        let angle = rng.next_f32() * TAU;
        let radius = rng.next_f32().sqrt() * self.profile.wander_radius;
        self.wander_target = self.spawn + Vec2::new(angle.cos(), angle.sin()) * radius;

        let span = config.wander_max_ms.saturating_sub(config.wander_min_ms);
        self.idle_timer_ms = config.wander_min_ms + (rng.next_f32() * span as f32) as u64;
    }

    fn respawn(&mut self) {
        self.hp = self.profile.max_hp;
        self.position = self.spawn;
        self.wander_target = self.spawn;
        self.idle_timer_ms = 0;
        self.attack_cooldown_ms = 0;
        self.respawn_timer_ms = 0;
        self.state = AiState::Idle;
        debug!("{} respawned", self.id);
    }
}

impl Targetable for HostileEntity {
    fn target_id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn is_targetable(&self) -> bool {
        self.is_alive()
    }
}

// ============================================================================
// Entity Registry
// ============================================================================

/// Spawn configuration for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Kind to spawn.
    pub kind: MonsterKind,
    /// Spawn anchor X.
    pub x: f32,
    /// Spawn anchor Y.
    pub y: f32,
}

impl SpawnPoint {
    /// Create a spawn point.
    #[must_use]
    pub const fn new(kind: MonsterKind, x: f32, y: f32) -> Self {
        Self { kind, x, y }
    }

    /// Anchor position.
    #[must_use]
    pub fn anchor(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Owner of every hostile entity, in spawn order.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<HostileEntity>,
    next_id: u64,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Spawn one entity.
    pub fn spawn(&mut self, point: &SpawnPoint) -> EntityId {
        self.insert_with(|id| HostileEntity::new(id, point.kind, point.anchor()))
    }

    /// Spawn one entity with a custom profile.
    pub fn spawn_with_profile(&mut self, point: &SpawnPoint, profile: MonsterProfile) -> EntityId {
        self.insert_with(|id| HostileEntity::with_profile(id, point.kind, profile, point.anchor()))
    }

    /// Spawn every point, returning the new IDs in order.
    pub fn spawn_all<'a>(&mut self, points: impl IntoIterator<Item = &'a SpawnPoint>) -> Vec<EntityId> {
        points.into_iter().map(|p| self.spawn(p)).collect()
    }

    fn insert_with(&mut self, build: impl FnOnce(EntityId) -> HostileEntity) -> EntityId {
        self.next_id = self.next_id.max(1);
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        self.entities.push(build(id));
        id
    }

    /// Number of entities, alive or dead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing has spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&HostileEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Get an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut HostileEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Iterate entities in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &HostileEntity> {
        self.entities.iter()
    }

    /// Iterate entities mutably in spawn order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HostileEntity> {
        self.entities.iter_mut()
    }

    /// Iterate live entities.
    pub fn alive(&self) -> impl Iterator<Item = &HostileEntity> {
        self.entities.iter().filter(|e| e.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FixedRandom;

    fn slime_at(x: f32, y: f32) -> HostileEntity {
        HostileEntity::new(EntityId::from_raw(1), MonsterKind::Slime, Vec2::new(x, y))
    }

    fn step(e: &mut HostileEntity, dt: u64, player: Option<Vec2>) -> MonsterStep {
        e.advance(dt, player, &MonsterAiConfig::default(), &mut FixedRandom(0.5))
    }

    #[test]
    fn test_slime_aggro_scenario() {
        let mut slime = slime_at(100.0, 100.0);
        assert_eq!(slime.profile().aggro_range, 150.0);

        let result = step(&mut slime, 16, Some(Vec2::new(200.0, 100.0)));
        assert_eq!(result.transition, Some(AiState::Chase));
        assert_eq!(slime.state(), AiState::Chase);
    }

    #[test]
    fn test_idle_aggro_boundary() {
        let mut inside = slime_at(0.0, 0.0);
        step(&mut inside, 16, Some(Vec2::new(149.0, 0.0)));
        assert_eq!(inside.state(), AiState::Chase);

        let mut edge = slime_at(0.0, 0.0);
        step(&mut edge, 16, Some(Vec2::new(150.0, 0.0)));
        assert_eq!(edge.state(), AiState::Idle);
    }

    #[test]
    fn test_chase_escape_returns() {
        let mut slime = slime_at(0.0, 0.0);
        step(&mut slime, 16, Some(Vec2::new(100.0, 0.0)));
        assert_eq!(slime.state(), AiState::Chase);

        let result = step(&mut slime, 16, Some(Vec2::new(300.0, 0.0)));
        assert_eq!(result.transition, Some(AiState::Return));
    }

    #[test]
    fn test_chase_leash_returns() {
        let mut slime = slime_at(0.0, 0.0);
        slime.state = AiState::Chase;
        slime.position = Vec2::new(301.0, 0.0);

        step(&mut slime, 16, Some(Vec2::new(380.0, 0.0)));
        assert_eq!(slime.state(), AiState::Return);
    }

    #[test]
    fn test_chase_moves_toward_player() {
        let mut slime = slime_at(0.0, 0.0);
        step(&mut slime, 1_000, Some(Vec2::new(100.0, 0.0)));
        // 60 units/s for one second
        assert!((slime.position().x - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_attack_cycle() {
        let mut slime = slime_at(0.0, 0.0);
        let player = Some(Vec2::new(30.0, 0.0));

        step(&mut slime, 16, player); // idle -> chase
        let first = step(&mut slime, 16, player); // chase -> attack, swings
        assert_eq!(first.transition, Some(AiState::Attack));
        assert_eq!(first.attack, Some(12.0));

        assert!(step(&mut slime, 1_000, player).attack.is_none());
        assert_eq!(step(&mut slime, 500, player).attack, Some(12.0));

        // Beyond 1.2x attack range drops back to chase.
        let result = step(&mut slime, 16, Some(Vec2::new(49.0, 0.0)));
        assert_eq!(result.transition, Some(AiState::Chase));
    }

    #[test]
    fn test_defeated_player_not_chased() {
        let mut slime = slime_at(0.0, 0.0);
        slime.state = AiState::Attack;
        let result = step(&mut slime, 16, None);
        assert_eq!(result.transition, Some(AiState::Return));
        assert!(result.attack.is_none());
    }

    #[test]
    fn test_return_heals_on_arrival() {
        let mut slime = slime_at(0.0, 0.0);
        slime.state = AiState::Return;
        slime.hp = 20;
        slime.position = Vec2::new(30.0, 0.0);

        step(&mut slime, 1_000, None); // walks home
        assert_eq!(slime.position(), Vec2::ZERO);
        let result = step(&mut slime, 16, None);
        assert_eq!(result.transition, Some(AiState::Idle));
        assert_eq!(slime.hp(), 25);
    }

    #[test]
    fn test_return_reaggro() {
        let mut slime = slime_at(0.0, 0.0);
        slime.state = AiState::Return;
        slime.position = Vec2::new(50.0, 0.0);

        // 0.8 * 150 = 120
        step(&mut slime, 16, Some(Vec2::new(175.0, 0.0)));
        assert_eq!(slime.state(), AiState::Return);
        step(&mut slime, 16, Some(Vec2::new(150.0, 0.0)));
        assert_eq!(slime.state(), AiState::Chase);
    }

    #[test]
    fn test_damage_aggroes_and_mitigates() {
        let mut slime = slime_at(0.0, 0.0);
        let hit = slime.apply_damage(10).expect("alive");
        assert_eq!(hit.damage, 8);
        assert_eq!(hit.new_hp, 42);
        assert_eq!(hit.transition, Some(AiState::Chase));

        // Floors at 1 even when defense exceeds the hit.
        assert_eq!(slime.apply_damage(1).map(|h| h.damage), Some(1));
    }

    #[test]
    fn test_death_and_respawn() {
        let mut slime = slime_at(100.0, 100.0);
        slime.position = Vec2::new(150.0, 120.0);
        let hit = slime.apply_damage(1_000).expect("alive");
        assert!(hit.killed);
        assert_eq!(slime.state(), AiState::Dead);
        assert!(!slime.is_targetable());
        assert!(slime.apply_damage(10).is_none());
        assert!(slime.reconcile_hp(0).is_none());

        assert!(!step(&mut slime, 9_999, Some(Vec2::ZERO)).respawned);
        let result = step(&mut slime, 1, Some(Vec2::ZERO));
        assert!(result.respawned);
        assert_eq!(slime.state(), AiState::Idle);
        assert_eq!(slime.hp(), slime.max_hp());
        assert_eq!(slime.position(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_reconcile_only_lowers() {
        let mut slime = slime_at(0.0, 0.0);
        assert!(slime.reconcile_hp(60).is_none());
        let hit = slime.reconcile_hp(30).expect("lowered");
        assert_eq!(hit.damage, 20);
        assert_eq!(slime.state(), AiState::Idle);
        assert!(slime.reconcile_hp(0).expect("killed").killed);
    }

    #[test]
    fn test_wander_stays_near_spawn() {
        let mut slime = slime_at(0.0, 0.0);
        for _ in 0..200 {
            step(&mut slime, 100, None);
        }
        assert_eq!(slime.state(), AiState::Idle);
        assert!(slime.position().length() <= slime.profile().wander_radius + 1e-3);
    }

    #[test]
    fn test_registry_ids() {
        let mut registry = EntityRegistry::new();
        let ids = registry.spawn_all(&[
            SpawnPoint::new(MonsterKind::Snail, 0.0, 0.0),
            SpawnPoint::new(MonsterKind::Golem, 10.0, 0.0),
        ]);
        assert_eq!(ids, vec![EntityId::from_raw(1), EntityId::from_raw(2)]);
        assert_eq!(registry.get(ids[1]).map(HostileEntity::kind), Some(MonsterKind::Golem));

        if let Some(snail) = registry.get_mut(ids[0]) {
            snail.apply_damage(1_000);
        }
        assert_eq!(registry.alive().count(), 1);
    }
}
