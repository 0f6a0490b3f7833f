//! Input configuration loaded with figment.
//!
//! Sources are merged in precedence order (later sources override earlier
//! ones):
//! 1. Default values
//! 2. `input.toml`, `input.yaml`, `input.yml`, `input.json` in the config directory
//! 3. Environment variables prefixed `SAH_INPUT_`, nested with `__`
//!    (e.g. `SAH_INPUT_MATCHING__ERROR_KEY=confirmMismatch`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable prefix for input settings.
pub const ENV_PREFIX: &str = "SAH_INPUT_";

/// Error key reported when a dependent field does not match its reference.
pub const DEFAULT_MATCH_ERROR_KEY: &str = "passwordMatch";

/// Settings for numeric-only fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericConfig {
    /// Keys admitted in addition to the built-in allow-list.
    pub extra_keys: Vec<String>,
    /// Accept `ArrowLeft`/`ArrowRight` as aliases of `Left`/`Right`.
    pub arrow_aliases: bool,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            extra_keys: Vec::new(),
            arrow_aliases: true,
        }
    }
}

/// Settings for cross-field matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub error_key: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            error_key: DEFAULT_MATCH_ERROR_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub numeric: NumericConfig,
    pub matching: MatchingConfig,
}

impl InputConfig {
    /// Build the figment for a config directory without extracting it.
    pub fn figment(config_dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(InputConfig::default()))
            .merge(Toml::file(config_dir.join("input.toml")))
            .merge(Yaml::file(config_dir.join("input.yaml")))
            .merge(Yaml::file(config_dir.join("input.yml")))
            .merge(Json::file(config_dir.join("input.json")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from `config_dir` and the environment.
    ///
    /// Missing files are skipped; malformed files are an error.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config: InputConfig = Self::figment(config_dir).extract()?;
        debug!(
            extra_keys = config.numeric.extra_keys.len(),
            error_key = %config.matching.error_key,
            "loaded input configuration"
        );
        Ok(config)
    }
}
