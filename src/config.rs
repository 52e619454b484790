//! Engine configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock setup: `base` and `ai-ml` seed packs, ten inference rounds and the
//! 0.8 / 0.9 confidence decays.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infer::InferenceConfig;
use crate::registry::DEFAULT_MAX_DEPTH;
use crate::typing::{DEFAULT_MODEL_FAMILIES, PatternTyping};

/// Errors from configuration loading and validation.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(onto::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(onto::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(onto::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for {field}: {message}")]
    #[diagnostic(code(onto::config::invalid))]
    Invalid { field: &'static str, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Type registry limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum parent-chain length.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Settings for the identifier-pattern typing fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingConfig {
    /// Substrings that mark an entity id as an `LLM`.
    #[serde(default = "default_model_families")]
    pub model_families: Vec<String>,
    /// Type assigned when no pattern matches.
    #[serde(default = "default_type")]
    pub default_type: String,
}

/// Which seed packs to load at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_seed_packs")]
    pub seed_packs: Vec<String>,
    /// Directory of additional packs, one `seed.toml` per subdirectory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds_dir: Option<PathBuf>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_model_families() -> Vec<String> {
    DEFAULT_MODEL_FAMILIES.iter().map(|f| f.to_string()).collect()
}
fn default_type() -> String {
    "Entity".into()
}
fn default_seed_packs() -> Vec<String> {
    vec!["base".into(), "ai-ml".into()]
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            model_families: default_model_families(),
            default_type: default_type(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            seed_packs: default_seed_packs(),
            seeds_dir: None,
        }
    }
}

impl TypingConfig {
    /// The pattern heuristic described by this config.
    pub fn heuristic(&self) -> PatternTyping {
        PatternTyping::with_model_families(&self.model_families)
            .with_default_type(self.default_type.as_str())
    }
}

impl EngineConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let inf = &self.inference;
        if inf.max_rounds == 0 {
            return Err(invalid("inference.max_rounds", "must be at least 1"));
        }
        check_decay("inference.transitive_decay", inf.transitive_decay)?;
        check_decay("inference.capability_decay", inf.capability_decay)?;
        if inf.improvement_relation.is_empty() {
            return Err(invalid("inference.improvement_relation", "cannot be empty"));
        }
        if inf.capability_relation.is_empty() {
            return Err(invalid("inference.capability_relation", "cannot be empty"));
        }
        if self.registry.max_depth == 0 {
            return Err(invalid("registry.max_depth", "must be at least 1"));
        }
        if self.typing.default_type.is_empty() {
            return Err(invalid("typing.default_type", "cannot be empty"));
        }
        if self.bootstrap.seed_packs.is_empty() {
            return Err(invalid(
                "bootstrap.seed_packs",
                "at least one pack is needed to supply a root type",
            ));
        }
        Ok(())
    }
}

fn check_decay(field: &'static str, value: f32) -> ConfigResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is outside (0, 1]")))
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.inference.max_rounds, 10);
        assert_eq!(config.registry.max_depth, 64);
        assert_eq!(config.bootstrap.seed_packs, vec!["base", "ai-ml"]);
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
[inference]
max_rounds = 3

[typing]
default_type = "Thing"
"#,
        )
        .unwrap();
        assert_eq!(config.inference.max_rounds, 3);
        assert!((config.inference.transitive_decay - 0.8).abs() < 1e-6);
        assert_eq!(config.typing.default_type, "Thing");
        assert!(config.typing.model_families.iter().any(|f| f == "gpt"));
    }

    #[test]
    fn rejects_bad_decay() {
        let mut config = EngineConfig::default();
        config.inference.capability_decay = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "inference.capability_decay", .. })
        ));
        config.inference.capability_decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_rounds_and_depth() {
        let mut config = EngineConfig::default();
        config.inference.max_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.registry.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn heuristic_follows_typing_config() {
        let typing = TypingConfig {
            model_families: vec!["palm".into()],
            default_type: "Thing".into(),
        };
        let h = typing.heuristic();
        assert_eq!(h.infer_type("PaLM-2"), "LLM");
        assert_eq!(h.infer_type("GPT-4"), "Thing");
    }
}
