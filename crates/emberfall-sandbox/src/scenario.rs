//! Scenario files.
//!
//! A scenario is a TOML document describing the player, the spawn layout
//! and a script of actions keyed by tick number.

use std::fs;
use std::path::{Path, PathBuf};

use emberfall_combat::buffs::ConsumableEffect;
use emberfall_combat::monster::SpawnPoint;
use emberfall_combat::player::GatherKind;
use emberfall_combat::stats::{AttributeKind, Attributes, CombatantStats, Job};
use emberfall_common::{DataFileError, DataFileResult, SkillId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default tick length (ms).
pub const DEFAULT_TICK_MS: u64 = 50;

/// Starting player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSetup {
    /// Job
    pub job: Job,
    /// Level
    pub level: u32,
    /// Base attributes
    pub attributes: Attributes,
    /// Start X
    pub x: f32,
    /// Start Y
    pub y: f32,
}

impl Default for PlayerSetup {
    fn default() -> Self {
        Self {
            job: Job::Beginner,
            level: 1,
            attributes: CombatantStats::default().attributes,
            x: 0.0,
            y: 0.0,
        }
    }
}

impl PlayerSetup {
    /// Persistent stats for this setup.
    #[must_use]
    pub fn stats(&self) -> CombatantStats {
        CombatantStats::new(self.job)
            .with_attributes(self.attributes)
            .with_level(self.level)
    }
}

/// Named consumable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableItem {
    /// Restores HP
    RedPotion,
    /// Restores MP
    BluePotion,
    /// Attack buff
    WarriorElixir,
    /// Defense buff
    GuardElixir,
}

impl ConsumableItem {
    /// Effect of using the item.
    #[must_use]
    pub const fn effect(self) -> ConsumableEffect {
        match self {
            Self::RedPotion => ConsumableEffect::RED_POTION,
            Self::BluePotion => ConsumableEffect::BLUE_POTION,
            Self::WarriorElixir => ConsumableEffect::WARRIOR_ELIXIR,
            Self::GuardElixir => ConsumableEffect::GUARD_ELIXIR,
        }
    }
}

/// One scripted action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Basic attack toward `aim` radians
    BasicAttack {
        /// Aim heading
        aim: f32,
    },
    /// Cast a skill
    Skill {
        /// Skill ID
        skill: SkillId,
        /// Aim heading (facing when omitted)
        #[serde(default)]
        aim: Option<f32>,
    },
    /// Use a consumable
    Consume {
        /// Item
        item: ConsumableItem,
    },
    /// Change movement input
    Move {
        /// Direction X
        x: f32,
        /// Direction Y
        y: f32,
    },
    /// Dash
    Dash,
    /// Start gathering
    Gather {
        /// Channel kind
        kind: GatherKind,
        /// Resource node
        node: u64,
    },
    /// Place the player
    Place {
        /// X
        x: f32,
        /// Y
        y: f32,
    },
    /// Peer damage report for an entity
    ExternalDamage {
        /// Raw entity ID
        entity: u64,
        /// Reported HP
        new_hp: u32,
    },
    /// Spend an ability point
    Allocate {
        /// Attribute
        attribute: AttributeKind,
    },
    /// Advance job
    AdvanceJob {
        /// Target job
        job: Job,
    },
    /// Revive the player
    Revive {
        /// HP fraction restored
        fraction: f32,
    },
}

/// An action and the tick it fires on (before that tick runs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedAction {
    /// Tick index, starting at 0
    pub tick: u64,
    /// What to do
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Display name
    pub name: String,
    /// RNG seed; overrides the combat config seed
    pub seed: Option<u64>,
    /// Number of ticks to run
    pub ticks: u64,
    /// Tick length in milliseconds
    pub tick_ms: u64,
    /// Combat tuning file, relative to the scenario file
    pub combat_config: Option<PathBuf>,
    /// Extra skill definitions, relative to the scenario file
    pub skills: Option<PathBuf>,
    /// Abort on the first rejected action
    pub strict: bool,
    /// Player setup
    pub player: PlayerSetup,
    /// Spawn layout
    pub spawns: Vec<SpawnPoint>,
    /// Scripted actions
    pub actions: Vec<ScriptedAction>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            seed: None,
            ticks: 100,
            tick_ms: DEFAULT_TICK_MS,
            combat_config: None,
            skills: None,
            strict: false,
            player: PlayerSetup::default(),
            spawns: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl Scenario {
    /// Parse and validate a scenario document.
    pub fn from_toml_str(contents: &str) -> DataFileResult<Self> {
        let mut scenario: Self = toml::from_str(contents)?;
        scenario.validate()?;
        scenario.actions.sort_by_key(|a| a.tick);
        Ok(scenario)
    }

    /// Load a scenario file. Relative data paths are resolved against the
    /// scenario's directory.
    pub fn load(path: &Path) -> DataFileResult<Self> {
        if !path.exists() {
            return Err(DataFileError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let mut scenario = Self::from_toml_str(&contents)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        scenario.combat_config = scenario.combat_config.map(|p| base.join(p));
        scenario.skills = scenario.skills.map(|p| base.join(p));

        info!(
            "Loaded scenario '{}' ({} ticks, {} spawns, {} actions)",
            scenario.name,
            scenario.ticks,
            scenario.spawns.len(),
            scenario.actions.len()
        );
        Ok(scenario)
    }

    /// Check ranges that would make the run meaningless.
    pub fn validate(&self) -> DataFileResult<()> {
        if self.tick_ms == 0 {
            return Err(DataFileError::Validation("tick_ms must be positive".to_string()));
        }
        if let Some(action) = self.actions.iter().find(|a| a.tick >= self.ticks) {
            return Err(DataFileError::Validation(format!(
                "action at tick {} is past the last tick ({})",
                action.tick,
                self.ticks.saturating_sub(1)
            )));
        }
        if self.player.level == 0 {
            return Err(DataFileError::Validation("player level must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Actions scheduled for `tick`.
    pub fn actions_at(&self, tick: u64) -> impl Iterator<Item = &ScriptedAction> {
        self.actions.iter().filter(move |a| a.tick == tick)
    }
}
