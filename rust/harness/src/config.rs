//! Configuration parsing for the harness.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use drive_config::{Environment, ModelSize, Platform, RunParams, SpeedVariant};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from TOML (raw, before merging).
#[derive(Debug, Clone, Deserialize)]
struct RawHarnessConfig {
    #[serde(default)]
    pub harness: HarnessSettings,
    #[serde(default = "empty_table")]
    pub defaults: toml::Value,
}

fn empty_table() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

/// Configuration after merging `[defaults]` over the built-in run parameters.
#[derive(Debug, Clone, Default)]
pub struct HarnessConfig {
    pub harness: HarnessSettings,
    pub defaults: RunParams,
}

/// How the external framework is launched and where it writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Python interpreter; auto-detected when unset.
    #[serde(default)]
    pub python: Option<String>,
    /// Framework entry point, relative to `working_dir`.
    #[serde(default = "default_script")]
    pub script: String,
    /// Directory the framework is launched from.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Base directory holding one subdirectory per run.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
    /// Extra environment variables for both stages.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            python: None,
            script: default_script(),
            working_dir: None,
            log_root: default_log_root(),
            env: BTreeMap::new(),
        }
    }
}

impl HarnessSettings {
    /// Absolute log root as the framework sees it.
    ///
    /// A relative `log_root` is taken relative to `working_dir` when one is
    /// set, since that is where the framework process starts.
    pub fn resolved_log_root(&self) -> std::io::Result<PathBuf> {
        let root = match self.working_dir {
            Some(ref dir) if self.log_root.is_relative() => dir.join(&self.log_root),
            _ => self.log_root.clone(),
        };
        std::path::absolute(root)
    }
}

fn default_script() -> String {
    "dreamerv3/main.py".to_string()
}

fn default_log_root() -> PathBuf {
    PathBuf::from("./logdir")
}

/// Merge two TOML tables, with `overlay` values taking precedence.
fn merge_toml(base: &toml::Value, overlay: &toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) => {
            let mut merged = base_map.clone();
            for (k, v) in overlay_map {
                merged.insert(
                    k.clone(),
                    if let Some(base_v) = base_map.get(k) {
                        merge_toml(base_v, v)
                    } else {
                        v.clone()
                    },
                );
            }
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

impl HarnessConfig {
    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawHarnessConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let base = toml::Value::try_from(RunParams::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        let defaults: RunParams = merge_toml(&base, &raw.defaults)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;

        Ok(Self {
            harness: raw.harness,
            defaults,
        })
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

/// Command-line overrides for [`RunParams`].
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunOverrides {
    /// Environment: highway, merge, roundabout, intersection
    #[arg(long)]
    pub env: Option<Environment>,
    /// Vehicle speed variant
    #[arg(long, value_enum)]
    pub speed: Option<SpeedVariant>,
    /// World-model size preset
    #[arg(long, value_enum)]
    pub size: Option<ModelSize>,
    /// Accelerator platform
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,
    /// Training batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Training environment steps
    #[arg(long)]
    pub steps: Option<u64>,
    /// Training wall-clock budget in minutes
    #[arg(long)]
    pub minutes: Option<u64>,
    /// Number of evaluation episodes to record
    #[arg(long)]
    pub eval_episodes: Option<usize>,
    /// Show a live render window while training
    #[arg(long)]
    pub render: bool,
}

impl RunOverrides {
    /// Apply the overrides that were given on top of `params`.
    pub fn apply(&self, params: &mut RunParams) {
        if let Some(env) = self.env {
            params.env = env;
        }
        if let Some(speed) = self.speed {
            params.speed = speed;
        }
        if let Some(size) = self.size {
            params.size = size;
        }
        if let Some(platform) = self.platform {
            params.platform = platform;
        }
        if let Some(batch_size) = self.batch_size {
            params.batch_size = batch_size;
        }
        if let Some(steps) = self.steps {
            params.train_steps = steps;
        }
        if let Some(minutes) = self.minutes {
            params.train_minutes = minutes;
        }
        if let Some(episodes) = self.eval_episodes {
            params.eval_episodes = episodes;
        }
        if self.render {
            params.render = true;
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}
