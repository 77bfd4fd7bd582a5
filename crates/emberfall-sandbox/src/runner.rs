//! Drives a `CombatSimulation` through a scenario.

use emberfall_combat::config::CombatConfig;
use emberfall_combat::error::CombatResult;
use emberfall_combat::events::CombatEvent;
use emberfall_combat::simulation::{CombatSimulation, EntitySnapshot};
use emberfall_combat::skills::{SkillBook, SkillBookError};
use emberfall_common::{DataFileError, EmberfallError, EntityId, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioAction, ScriptedAction};

/// Sandbox errors.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Scenario or tuning file problem
    #[error(transparent)]
    Data(#[from] DataFileError),
    /// Skill file problem
    #[error(transparent)]
    SkillBook(#[from] SkillBookError),
    /// Strict run hit a rejected action
    #[error(transparent)]
    Emberfall(#[from] EmberfallError),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// An event stamped with the tick that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Tick index
    pub tick: u64,
    /// Simulation clock after the tick (ms)
    pub time_ms: u64,
    /// The event
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name
    pub scenario: String,
    /// Ticks executed
    pub ticks: u64,
    /// Final clock (ms)
    pub elapsed_ms: u64,
    /// Every event, in emission order
    pub events: Vec<TimedEvent>,
    /// Scripted actions that were rejected
    pub rejected_actions: usize,
    /// Entities killed by the player
    pub kills: usize,
    /// Player HP at the end
    pub player_hp: u32,
    /// Player level at the end
    pub player_level: u32,
    /// Whether the player ended defeated
    pub player_defeated: bool,
    /// Final entity states
    pub entities: Vec<EntitySnapshot>,
}

/// Build the simulation a scenario describes.
pub fn build_simulation(scenario: &Scenario, base_config: CombatConfig) -> SandboxResult<CombatSimulation> {
    let mut config = match &scenario.combat_config {
        Some(path) => CombatConfig::try_load_from(path)?,
        None => base_config,
    };
    if scenario.seed.is_some() {
        config.rng_seed = scenario.seed;
    }

    let mut skills = SkillBook::standard();
    if let Some(path) = &scenario.skills {
        let added = skills.load_file(path)?;
        info!("Added {} skills from {}", added, path.display());
    }

    let position = Vec2::new(scenario.player.x, scenario.player.y);
    let mut sim = CombatSimulation::from_stats(scenario.player.stats(), position, config)
        .with_skill_book(skills);
    let ids = sim.spawn_all(&scenario.spawns);
    debug!("Spawned {} entities", ids.len());
    Ok(sim)
}

/// Apply one scripted action.
pub fn apply_action(sim: &mut CombatSimulation, action: ScenarioAction) -> CombatResult<()> {
    match action {
        ScenarioAction::BasicAttack { aim } => sim.request_basic_attack(aim),
        ScenarioAction::Skill { skill, aim } => sim.request_skill(skill, aim),
        ScenarioAction::Consume { item } => sim.request_consumable(item.effect()),
        ScenarioAction::Move { x, y } => {
            sim.set_movement_input(Vec2::new(x, y));
            Ok(())
        },
        ScenarioAction::Dash => sim.request_dash(),
        ScenarioAction::Gather { kind, node } => sim.request_gathering(kind, node),
        ScenarioAction::Place { x, y } => {
            sim.set_player_position(Vec2::new(x, y));
            Ok(())
        },
        ScenarioAction::ExternalDamage { entity, new_hp } => {
            sim.apply_external_damage_to_entity(EntityId::from_raw(entity), new_hp)
        },
        ScenarioAction::Allocate { attribute } => sim.allocate_stat(attribute),
        ScenarioAction::AdvanceJob { job } => sim.advance_job(job),
        ScenarioAction::Revive { fraction } => sim.revive_player(fraction).map(|_| ()),
    }
}

/// Run a scenario to completion.
pub fn run(scenario: &Scenario, base_config: CombatConfig) -> SandboxResult<RunReport> {
    let mut sim = build_simulation(scenario, base_config)?;
    let mut events = Vec::new();
    let mut rejected_actions = 0;

    info!("Running '{}' for {} ticks", scenario.name, scenario.ticks);
    for tick in 0..scenario.ticks {
        for &ScriptedAction { action, .. } in scenario.actions_at(tick) {
            if let Err(e) = apply_action(&mut sim, action) {
                if scenario.strict {
                    return Err(EmberfallError::Rejected(format!("tick {tick}: {action:?}: {e}")).into());
                }
                warn!("Tick {}: {:?} rejected: {}", tick, action, e);
                rejected_actions += 1;
            }
        }

        sim.tick(scenario.tick_ms);
        let time_ms = sim.now_ms();
        events.extend(
            sim.drain_events()
                .into_iter()
                .map(|event| TimedEvent { tick, time_ms, event }),
        );
    }

    let kills = events
        .iter()
        .filter(|e| matches!(e.event, CombatEvent::EntityKilled { exp_reward, .. } if exp_reward > 0))
        .count();
    let player = sim.player();
    let report = RunReport {
        scenario: scenario.name.clone(),
        ticks: scenario.ticks,
        elapsed_ms: sim.now_ms(),
        rejected_actions,
        kills,
        player_hp: player.pool().hp(),
        player_level: player.stats().level,
        player_defeated: player.is_defeated(),
        entities: sim.entity_snapshots(),
        events,
    };
    info!(
        "'{}' finished: {} events, {} kills, player HP {}",
        report.scenario,
        report.events.len(),
        report.kills,
        report.player_hp
    );
    Ok(report)
}
