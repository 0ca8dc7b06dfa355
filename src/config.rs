//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `RULEBOOK_*` environment variables (`__` separates nested keys,
//! e.g. `RULEBOOK_AFFINITY__RESISTANCE__ROUND_UP=true`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::AffinityPolicy;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RULEBOOK_";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("max_nesting_depth must be at least 1")]
    ZeroNestingDepth,

    #[error("die_faces_check must be at least 2, got {0}")]
    InvalidCheckDie(i64),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

/// Ruleset policy the subevent pipelines consult
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest chain of nested branches and effect riders allowed
    pub max_nesting_depth: usize,
    /// Die used for checks, saves, and attack rolls
    pub die_faces_check: i64,
    /// Damage dice count multiplier on a critical hit
    pub critical_hit_dice_multiplier: i64,
    pub affinity: AffinityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 32,
            die_faces_check: 20,
            critical_hit_dice_multiplier: 2,
            affinity: AffinityPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Provider chain: defaults, optional TOML file, environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: EngineConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::ZeroNestingDepth);
        }
        if self.die_faces_check < 2 {
            return Err(ConfigError::InvalidCheckDie(self.die_faces_check));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Scale;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_nesting_depth, 32);
        assert_eq!(config.die_faces_check, 20);
        assert_eq!(config.critical_hit_dice_multiplier, 2);
        assert_eq!(config.affinity.resistance, Scale::half(false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_nesting_depth = 4

[affinity.resistance]
numerator = 1
denominator = 2
round_up = true
"#
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_nesting_depth, 4);
        assert_eq!(config.affinity.resistance, Scale::half(true));
        assert_eq!(config.affinity.vulnerability, Scale::new(2, 1, false));
        assert_eq!(config.die_faces_check, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_nesting_depth = 0").unwrap();
        assert!(matches!(
            EngineConfig::load(Some(file.path())),
            Err(ConfigError::ZeroNestingDepth)
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "die_faces_check = \"twenty\"").unwrap();
        assert!(matches!(
            EngineConfig::load(Some(file.path())),
            Err(ConfigError::Figment(_))
        ));
    }
}
