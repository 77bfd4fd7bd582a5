//! Combat tuning configuration.
//!
//! Every tunable constant lives in one `CombatConfig`, loadable from TOML.
//! Missing fields fall back to their defaults.

use std::fs;
use std::path::Path;

use emberfall_common::{DataFileError, DataFileResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::monster::MonsterAiConfig;
use crate::player::PlayerConfig;
use crate::progression::ProgressionConfig;
use crate::resolver::ResolverConfig;
use crate::targeting::TargetingConfig;

/// Default config file name.
pub const CONFIG_FILE: &str = "combat.toml";

/// Complete combat configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Damage formula constants
    pub resolver: ResolverConfig,
    /// Hit-area presets
    pub targeting: TargetingConfig,
    /// Player movement and channels
    pub player: PlayerConfig,
    /// Monster AI tuning
    pub monster_ai: MonsterAiConfig,
    /// Level growth
    pub progression: ProgressionConfig,
    /// Event bus capacity
    pub event_capacity: usize,
    /// RNG seed (None = seeded from entropy)
    pub rng_seed: Option<u64>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            targeting: TargetingConfig::default(),
            player: PlayerConfig::default(),
            monster_ai: MonsterAiConfig::default(),
            progression: ProgressionConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            rng_seed: None,
        }
    }
}

impl CombatConfig {
    /// Load configuration from a path.
    /// Returns default config if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Combat config not found at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load combat config: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration from a path, reporting every failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> DataFileResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataFileError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded combat config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> DataFileResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> DataFileResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a path, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> DataFileResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        info!("Saved combat config to {}", path.display());
        Ok(())
    }

    /// Reject values the formulas cannot work with.
    pub fn validate(&self) -> DataFileResult<()> {
        let r = &self.resolver;
        if r.crit_multiplier < 1.0 {
            return Err(DataFileError::Validation(format!(
                "crit_multiplier must be >= 1.0, got {}",
                r.crit_multiplier
            )));
        }
        if !(0.0..1.0).contains(&r.variance) {
            return Err(DataFileError::Validation(format!(
                "variance must be in [0, 1), got {}",
                r.variance
            )));
        }
        if r.min_damage < 1.0 {
            return Err(DataFileError::Validation(
                "min_damage must be at least 1".to_string(),
            ));
        }

        let ai = &self.monster_ai;
        if ai.wander_min_ms > ai.wander_max_ms {
            return Err(DataFileError::Validation(format!(
                "wander_min_ms ({}) exceeds wander_max_ms ({})",
                ai.wander_min_ms, ai.wander_max_ms
            )));
        }
        if ai.arrival_epsilon <= 0.0 {
            return Err(DataFileError::Validation(
                "arrival_epsilon must be positive".to_string(),
            ));
        }

        if self.player.move_speed < 0.0 || self.player.dash_speed_multiplier < 1.0 {
            return Err(DataFileError::Validation(
                "player speeds must be non-negative and dash multiplier >= 1".to_string(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(DataFileError::Validation(
                "event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = CombatConfig::default();
        config.resolver.variance = 0.0;
        config.rng_seed = Some(42);

        let text = config.to_toml_string().expect("serializable");
        assert!(text.contains("[monster_ai]"));
        let back = CombatConfig::from_toml_str(&text).expect("parseable");
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CombatConfig::from_toml_str(
            r#"
            [monster_ai]
            attack_cooldown_ms = 900

            [player]
            dash_duration_ms = 250
            "#,
        )
        .expect("valid");

        assert_eq!(config.monster_ai.attack_cooldown_ms, 900);
        assert_eq!(config.monster_ai.leash_factor, 2.0);
        assert_eq!(config.player.dash_duration_ms, 250);
        assert_eq!(config.player.dash_cooldown_ms, 1_000);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = CombatConfig::from_toml_str("[resolver]\ncrit_multiplier = 0.5\n");
        assert!(matches!(result, Err(DataFileError::Validation(_))));

        let result = CombatConfig::from_toml_str("event_capacity = \"lots\"\n");
        assert!(matches!(result, Err(DataFileError::Parse(_))));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = CombatConfig::load_from("/nonexistent/emberfall/combat.toml");
        assert_eq!(config, CombatConfig::default());
        assert!(matches!(
            CombatConfig::try_load_from("/nonexistent/emberfall/combat.toml"),
            Err(DataFileError::NotFound(_))
        ));
    }
}
