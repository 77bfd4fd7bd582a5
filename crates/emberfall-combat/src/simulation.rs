//! Per-tick combat orchestration.
//!
//! `CombatSimulation` owns the player, every hostile entity, the skill book
//! and the RNG. Hosts write intents between ticks and read events after.
//!
//! Each tick runs in a fixed order:
//! 1. Advance the clock, prune expired buffs, take the `EffectiveStats`
//!    snapshot used for the rest of the tick
//! 2. Advance the player's swing, dash and gathering timers
//! 3. Drain queued intents and resolve player attacks
//! 4. Advance monster AI and collect attacks on the player
//! 5. Apply those attacks through the evasion/defense path

use std::collections::VecDeque;

use emberfall_common::{unit_from_heading, EntityId, SkillId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffs::{BuffBonuses, ConsumableEffect, TimedBuff};
use crate::config::CombatConfig;
use crate::error::{CombatError, CombatResult};
use crate::events::{CombatEvent, CombatEventBus};
use crate::monster::{AiState, EntityHit, EntityRegistry, SpawnPoint};
use crate::player::{ConsumableOutcome, GatherKind, GatherOutcome, PlayerCombatant};
use crate::progression::advance_job;
use crate::resolver::{AttackResolution, CombatResolver, DamageRoll, DamageType};
use crate::skills::{Element, Skill, SkillBook, SkillEffect};
use crate::stats::{
    effective_stats, AttributeKind, CombatantStats, EffectiveStats, EquipmentItem, EquipmentSlot,
    Job,
};
use crate::targeting::{entities_in_cone, entities_in_radius, nearest, Targetable};

/// An action requested by the host, applied on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Swing the equipped weapon toward `aim` (radians).
    BasicAttack {
        /// Aim heading
        aim: f32,
    },
    /// Cast a skill; `None` aims along the current facing.
    Skill {
        /// Skill to cast
        skill: SkillId,
        /// Aim heading
        aim: Option<f32>,
    },
    /// Use a consumable item.
    Consumable {
        /// Item effect
        effect: ConsumableEffect,
    },
    /// Change movement input.
    Move {
        /// Direction X
        x: f32,
        /// Direction Y
        y: f32,
    },
    /// Start a dash.
    Dash,
    /// Start gathering on a resource node.
    Gather {
        /// Channel kind
        kind: GatherKind,
        /// Resource node ID
        node: u64,
    },
}

/// Entity state as seen by readers after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity ID
    pub id: EntityId,
    /// Position X
    pub x: f32,
    /// Position Y
    pub y: f32,
    /// Current HP
    pub hp: u32,
    /// Max HP
    pub max_hp: u32,
    /// AI state
    pub state: AiState,
}

/// The combat core.
#[derive(Debug)]
pub struct CombatSimulation {
    player: PlayerCombatant,
    registry: EntityRegistry,
    skills: SkillBook,
    resolver: CombatResolver,
    rng: fastrand::Rng,
    now_ms: u64,
    snapshot: EffectiveStats,
    intents: VecDeque<Intent>,
    events: CombatEventBus,
    config: CombatConfig,
}

impl CombatSimulation {
    /// Create a simulation around an existing player.
    #[must_use]
    pub fn new(mut player: PlayerCombatant, config: CombatConfig) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let snapshot = player.effective_stats(0);
        Self {
            player,
            registry: EntityRegistry::new(),
            skills: SkillBook::standard(),
            resolver: CombatResolver::with_config(config.resolver.clone()),
            rng,
            now_ms: 0,
            snapshot,
            intents: VecDeque::new(),
            events: CombatEventBus::new(config.event_capacity),
            config,
        }
    }

    /// Create a simulation with a fresh player built from `stats`.
    #[must_use]
    pub fn from_stats(stats: CombatantStats, position: Vec2, config: CombatConfig) -> Self {
        let player = PlayerCombatant::with_config(stats, position, config.player.clone());
        Self::new(player, config)
    }

    /// Replace the skill book.
    #[must_use]
    pub fn with_skill_book(mut self, skills: SkillBook) -> Self {
        self.skills = skills;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Simulation clock in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &PlayerCombatant {
        &self.player
    }

    /// Hostile entities.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Skill book.
    #[must_use]
    pub fn skills(&self) -> &SkillBook {
        &self.skills
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Stats snapshot taken at the start of the last tick.
    #[must_use]
    pub fn effective_stats(&self) -> &EffectiveStats {
        &self.snapshot
    }

    /// Displayed attack power from the current snapshot.
    #[must_use]
    pub fn attack_power(&self) -> u32 {
        self.resolver.attack_power_preview(&self.snapshot)
    }

    /// Read-only view of every entity for renderers.
    #[must_use]
    pub fn entity_snapshots(&self) -> Vec<EntitySnapshot> {
        self.registry
            .iter()
            .map(|e| EntitySnapshot {
                id: e.id(),
                x: e.position().x,
                y: e.position().y,
                hp: e.hp(),
                max_hp: e.max_hp(),
                state: e.state(),
            })
            .collect()
    }

    /// Base stats with gear but without buffs, for character sheets.
    #[must_use]
    pub fn unbuffed_stats(&self) -> EffectiveStats {
        effective_stats(
            self.player.stats(),
            self.player.equipment(),
            BuffBonuses::default(),
        )
    }

    /// Intents waiting for the next tick.
    #[must_use]
    pub fn pending_intents(&self) -> usize {
        self.intents.len()
    }

    /// Event bus, for readers that hold their own receiver.
    #[must_use]
    pub fn events(&self) -> &CombatEventBus {
        &self.events
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Spawn a hostile entity.
    pub fn spawn(&mut self, point: &SpawnPoint) -> EntityId {
        self.registry.spawn(point)
    }

    /// Spawn several hostile entities.
    pub fn spawn_all<'a>(&mut self, points: impl IntoIterator<Item = &'a SpawnPoint>) -> Vec<EntityId> {
        self.registry.spawn_all(points)
    }

    // ========================================================================
    // Inbound requests
    // ========================================================================

    /// Queue a basic attack.
    pub fn request_basic_attack(&mut self, aim: f32) -> CombatResult<()> {
        if self.player.is_defeated() {
            return Err(CombatError::Incapacitated);
        }
        self.intents.push_back(Intent::BasicAttack { aim });
        Ok(())
    }

    /// Queue a skill cast after checking it could be used right now.
    pub fn request_skill(&mut self, skill: SkillId, aim: Option<f32>) -> CombatResult<()> {
        let def = self.skills.require(skill)?;
        self.player.check_skill(def, self.now_ms)?;
        self.intents.push_back(Intent::Skill { skill, aim });
        Ok(())
    }

    /// Queue a consumable.
    pub fn request_consumable(&mut self, effect: ConsumableEffect) -> CombatResult<()> {
        if self.player.is_defeated() {
            return Err(CombatError::Incapacitated);
        }
        self.intents.push_back(Intent::Consumable { effect });
        Ok(())
    }

    /// Queue a movement input change.
    pub fn set_movement_input(&mut self, direction: Vec2) {
        self.intents.push_back(Intent::Move {
            x: direction.x,
            y: direction.y,
        });
    }

    /// Queue a dash.
    pub fn request_dash(&mut self) -> CombatResult<()> {
        if self.player.is_defeated() {
            return Err(CombatError::Incapacitated);
        }
        self.intents.push_back(Intent::Dash);
        Ok(())
    }

    /// Queue a gathering channel.
    pub fn request_gathering(&mut self, kind: GatherKind, node: u64) -> CombatResult<()> {
        if self.player.is_defeated() {
            return Err(CombatError::Incapacitated);
        }
        self.intents.push_back(Intent::Gather { kind, node });
        Ok(())
    }

    /// Queue a raw intent.
    pub fn push_intent(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    /// Move the player; the host owns collision and map geometry.
    pub fn set_player_position(&mut self, position: Vec2) {
        self.player.set_position(position);
    }

    /// Lower an entity's HP to match a peer's report.
    ///
    /// HP never rises this way. A kill awards the local player nothing.
    pub fn apply_external_damage_to_entity(&mut self, id: EntityId, new_hp: u32) -> CombatResult<()> {
        let entity = self
            .registry
            .get_mut(id)
            .filter(|e| e.is_alive())
            .ok_or(CombatError::InvalidTarget)?;
        if let Some(hit) = entity.reconcile_hp(new_hp) {
            let resolution = AttackResolution {
                damage: hit.damage,
                is_critical: false,
                damage_type: DamageType::Physical,
                element: Element::Neutral,
            };
            self.record_entity_hit(id, &hit, &resolution, 0);
        }
        Ok(())
    }

    /// Equip an item.
    pub fn equip(&mut self, item: EquipmentItem) -> Option<EquipmentItem> {
        self.player.equip(item)
    }

    /// Unequip a slot.
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<EquipmentItem> {
        self.player.unequip(slot)
    }

    /// Spend one ability point.
    pub fn allocate_stat(&mut self, kind: AttributeKind) -> CombatResult<()> {
        let (stats, progression) = self.player.progression_parts();
        progression.allocate_stat(stats, kind)?;
        self.player.sync_pool_maxima();
        Ok(())
    }

    /// Advance to a new job.
    pub fn advance_job(&mut self, job: Job) -> CombatResult<()> {
        advance_job(self.player.stats_mut(), job)?;
        self.player.sync_pool_maxima();
        self.events.publish(CombatEvent::JobAdvanced { job });
        Ok(())
    }

    /// Revive a defeated player with a fraction of max HP.
    pub fn revive_player(&mut self, hp_fraction: f32) -> CombatResult<u32> {
        let hp = self.player.revive(hp_fraction)?;
        info!("Player revived with {} HP", hp);
        Ok(hp)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the simulation by `dt_ms`.
    pub fn tick(&mut self, dt_ms: u64) {
        // 1. Clock, buffs, snapshot
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        for buff in self.player.prune_buffs(self.now_ms) {
            self.events.publish(CombatEvent::BuffExpired { kind: buff.kind });
        }
        self.snapshot = self.player.effective_stats(self.now_ms);

        // 2. Player timers
        if let Some(done) = self.player.advance(dt_ms) {
            self.publish_gathering(done, true);
        }

        // 3. Intents
        while let Some(intent) = self.intents.pop_front() {
            if let Err(e) = self.apply_intent(intent) {
                debug!("Intent {:?} rejected: {}", intent, e);
            }
        }

        // 4. Monster AI
        let target = (!self.player.is_defeated()).then(|| self.player.position());
        let mut attacks = Vec::new();
        for entity in self.registry.iter_mut() {
            let step = entity.advance(dt_ms, target, &self.config.monster_ai, &mut self.rng);
            if step.respawned {
                let spawn = entity.spawn();
                self.events.publish(CombatEvent::EntityRespawned {
                    entity_id: entity.id(),
                    x: spawn.x,
                    y: spawn.y,
                });
            }
            if let Some(new_state) = step.transition {
                self.events.publish(CombatEvent::EntityStateChanged {
                    entity_id: entity.id(),
                    new_state,
                });
            }
            if let Some(raw) = step.attack {
                attacks.push((entity.id(), raw));
            }
        }

        // 5. Attacks on the player
        for (source, raw) in attacks {
            if self.player.is_defeated() {
                break;
            }
            let outcome = self.resolver.defend(raw, &self.snapshot, &mut self.rng);
            let hit = self.player.take_hit(outcome);
            self.events.publish(CombatEvent::PlayerDamaged {
                new_hp: hit.new_hp,
                damage: hit.damage,
                evaded: hit.evaded,
                source,
            });
            if let Some(cancelled) = hit.interrupted {
                self.publish_gathering(cancelled, false);
            }
            if hit.defeated {
                info!("Player defeated by {}", source);
                self.events.publish(CombatEvent::PlayerDefeated);
            }
        }
    }

    fn apply_intent(&mut self, intent: Intent) -> CombatResult<()> {
        match intent {
            Intent::BasicAttack { aim } => self.perform_basic_attack(aim),
            Intent::Skill { skill, aim } => self.perform_skill(skill, aim),
            Intent::Consumable { effect } => self.perform_consumable(effect),
            Intent::Move { x, y } => {
                if let Some(cancelled) = self.player.set_movement_input(Vec2::new(x, y)) {
                    self.publish_gathering(cancelled, false);
                }
                Ok(())
            },
            Intent::Dash => {
                let direction = self.player.start_dash()?;
                self.events.publish(CombatEvent::DashStarted {
                    dir_x: direction.x,
                    dir_y: direction.y,
                });
                Ok(())
            },
            Intent::Gather { kind, node } => self.player.start_gathering(kind, node),
        }
    }

    fn perform_basic_attack(&mut self, aim: f32) -> CombatResult<()> {
        self.player.start_attack()?;
        self.player.face(aim);
        self.events.publish(CombatEvent::BasicAttackStarted { aim });

        let origin = self.player.position();
        let cone = self.config.targeting.basic_attack_cone(self.snapshot.weapon.style);
        let in_cone = entities_in_cone(origin, aim, cone, self.registry.iter());
        let Some(target) = nearest(origin, in_cone).map(|e| e.target_id()) else {
            return Ok(());
        };

        let Some(entity) = self.registry.get_mut(target) else {
            return Ok(());
        };
        let exp_reward = entity.profile().exp_reward;
        let defense = entity.profile().defense as f32;
        let resolution = self.resolver.resolve_basic_attack(
            &self.snapshot,
            defense,
            DamageRoll::Live(&mut self.rng),
        );
        if let Some(hit) = entity.apply_damage(resolution.damage) {
            self.record_entity_hit(target, &hit, &resolution, exp_reward);
        }
        Ok(())
    }

    fn perform_skill(&mut self, id: SkillId, aim: Option<f32>) -> CombatResult<()> {
        let skill = self.skills.require(id)?.clone();
        self.player.use_skill(&skill, self.now_ms)?;

        let aim = aim.unwrap_or_else(|| self.player.facing());
        self.player.face(aim);
        let origin = self.player.position();
        let target_point = if skill.is_aoe() || !skill.deals_damage() {
            origin
        } else {
            origin + unit_from_heading(aim) * skill.range
        };

        match skill.effect {
            SkillEffect::Damage => self.strike_with_skill(&skill, origin, aim),
            SkillEffect::Heal { amount } => {
                let restored = self.player.heal(amount)?;
                self.events.publish(CombatEvent::PlayerHealed {
                    new_hp: self.player.pool().hp(),
                    amount: restored,
                });
            },
            SkillEffect::Teleport { range } => {
                self.player
                    .set_position(origin + unit_from_heading(aim) * range);
            },
            SkillEffect::Buff {
                buff,
                magnitude,
                duration_ms,
            } => {
                let buff = TimedBuff::new(buff, magnitude, self.now_ms, duration_ms);
                self.player.apply_buff(buff)?;
                self.publish_buff(buff);
            },
        }

        let landed = match skill.effect {
            SkillEffect::Teleport { .. } => self.player.position(),
            _ => target_point,
        };
        self.events.publish(CombatEvent::SkillUsed {
            skill_id: id,
            target_x: landed.x,
            target_y: landed.y,
        });
        Ok(())
    }

    fn strike_with_skill(&mut self, skill: &Skill, origin: Vec2, aim: f32) {
        let targets: Vec<EntityId> = match skill.aoe_radius {
            Some(radius) => entities_in_radius(origin, radius, self.registry.iter())
                .into_iter()
                .map(Targetable::target_id)
                .collect(),
            None => {
                let cone = self.config.targeting.skill_cone(skill);
                entities_in_cone(origin, aim, cone, self.registry.iter())
                    .into_iter()
                    .map(Targetable::target_id)
                    .collect()
            },
        };

        for target in targets {
            for _ in 0..skill.hit_count.max(1) {
                let Some(entity) = self.registry.get_mut(target) else {
                    break;
                };
                let exp_reward = entity.profile().exp_reward;
                let defense = entity.profile().defense as f32;
                let resolution = self.resolver.resolve_skill_attack(
                    &self.snapshot,
                    skill,
                    defense,
                    DamageRoll::Live(&mut self.rng),
                );
                let Some(hit) = entity.apply_damage(resolution.damage) else {
                    break;
                };
                self.record_entity_hit(target, &hit, &resolution, exp_reward);
                if hit.killed {
                    break;
                }
            }
        }
    }

    fn perform_consumable(&mut self, effect: ConsumableEffect) -> CombatResult<()> {
        match self.player.use_consumable(effect, self.now_ms)? {
            ConsumableOutcome::Healed(amount) => {
                self.events.publish(CombatEvent::PlayerHealed {
                    new_hp: self.player.pool().hp(),
                    amount,
                });
            },
            ConsumableOutcome::ManaRestored(amount) => {
                self.events.publish(CombatEvent::PlayerManaRestored {
                    new_mp: self.player.pool().mp(),
                    amount,
                });
            },
            ConsumableOutcome::Buffed(buff) => self.publish_buff(buff),
        }
        Ok(())
    }

    fn record_entity_hit(
        &mut self,
        id: EntityId,
        hit: &EntityHit,
        resolution: &AttackResolution,
        exp_reward: u64,
    ) {
        self.events.publish(CombatEvent::EntityDamaged {
            entity_id: id,
            new_hp: hit.new_hp,
            damage: hit.damage,
            was_critical: resolution.is_critical,
            element: resolution.element,
        });
        if let Some(new_state) = hit.transition {
            self.events.publish(CombatEvent::EntityStateChanged {
                entity_id: id,
                new_state,
            });
        }
        if hit.killed {
            info!("{} killed, {} exp", id, exp_reward);
            self.events.publish(CombatEvent::EntityKilled {
                entity_id: id,
                exp_reward,
            });
            self.award_experience(exp_reward);
        }
    }

    fn award_experience(&mut self, amount: u64) {
        if amount == 0 {
            return;
        }
        let (stats, progression) = self.player.progression_parts();
        let reached = progression.gain_experience(stats, amount, &self.config.progression);
        if reached.is_empty() {
            return;
        }
        self.player.sync_pool_maxima();
        for level in reached {
            self.events.publish(CombatEvent::LeveledUp { level });
        }
    }

    fn publish_buff(&self, buff: TimedBuff) {
        self.events.publish(CombatEvent::BuffApplied {
            kind: buff.kind,
            magnitude: buff.magnitude,
            expires_at_ms: buff.expires_at_ms,
        });
    }

    fn publish_gathering(&self, outcome: GatherOutcome, completed: bool) {
        let GatherOutcome { kind, node } = outcome;
        self.events.publish(if completed {
            CombatEvent::GatheringCompleted { kind, node }
        } else {
            CombatEvent::GatheringCancelled { kind, node }
        });
    }
}
