//! Curation configuration
//!
//! The declarative document selecting which rules run and with what
//! arguments:
//!
//! ```toml
//! [tests.silent_interval]
//! run = true
//! args = { max_silence_s = 20 }
//!
//! [pre_processing.remove_instruments]
//! run = true
//! args = { percussive = true }
//!
//! [metadata.functions.composer_filename]
//! run = true
//! args = { composer_names = ["bach", "mozart"] }
//!
//! [metadata.manual]
//! composer = ["bach", "mozart"]
//!
//! [tokenizer.guidance]
//! min_ms = 5000
//! max_ms = 60000
//! ```
//!
//! Rule entries are kept as raw JSON values in declaration order and parsed
//! one at a time by the [`resolver`], so a malformed entry is
//! reported against its rule name.
//!
//! # Locating the document
//! Priority order, highest first:
//! 1. Command-line argument
//! 2. `MCUR_CONFIG` environment variable
//! 3. `mcur/curation.toml` in the user config directory
//! 4. Built-in default document

pub mod plan;
pub mod resolver;

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use plan::{ExecutionPlan, GuidanceWindow, PlanEntry, PlanStep};
pub use resolver::{resolve, resolve_builtin};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "MCUR_CONFIG";

/// Built-in default configuration
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default.toml");

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationConfig {
    /// Quality-gate rules by name
    #[serde(default)]
    pub tests: Map<String, Value>,
    /// Transform rules by name
    #[serde(default)]
    pub pre_processing: Map<String, Value>,
    #[serde(default)]
    pub metadata: MetadataSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<TokenizerSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataSection {
    /// Extractor rules by name
    #[serde(default)]
    pub functions: Map<String, Value>,
    /// Closed vocabulary for operator tags; never executed
    #[serde(default)]
    pub manual: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenizerSection {
    #[serde(default)]
    pub guidance: Option<GuidanceWindow>,
}

/// One rule entry: `{run, args}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub run: bool,
    #[serde(default)]
    pub args: Value,
}

impl CurationConfig {
    /// Build from an already-parsed document
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "JSON",
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let value: Value = toml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// The built-in default document
    pub fn builtin_default() -> ConfigResult<Self> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }
}

/// Load a configuration file, choosing the parser by extension
///
/// `.json` files are parsed as JSON; everything else as TOML.
pub fn load_config_file(path: &Path) -> ConfigResult<CurationConfig> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    debug!(path = %path.display(), json = is_json, "Loading curation config");
    if is_json {
        CurationConfig::from_json_str(&text)
    } else {
        CurationConfig::from_toml_str(&text)
    }
}

/// Where the configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltinDefault,
}

impl ConfigSource {
    pub fn load(&self) -> ConfigResult<CurationConfig> {
        match self {
            ConfigSource::File(path) => load_config_file(path),
            ConfigSource::BuiltinDefault => CurationConfig::builtin_default(),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::BuiltinDefault => f.write_str("<built-in default>"),
        }
    }
}

/// Pick the configuration source by priority
///
/// An explicit CLI path or environment variable is returned even if the file
/// does not exist, so the load fails loudly instead of silently falling back.
pub fn resolve_config_source(cli_arg: Option<&Path>, env_var_name: &str) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::File(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return ConfigSource::File(PathBuf::from(path));
        }
    }

    // Priority 3: User config file
    if let Some(path) = user_config_path().filter(|p| p.exists()) {
        return ConfigSource::File(path);
    }

    // Priority 4: Built-in default
    ConfigSource::BuiltinDefault
}

/// `<config dir>/mcur/curation.toml` for the current platform
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mcur").join("curation.toml"))
}
