//! Per-invocation run parameters and external command-line construction.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{EnvSpec, Environment, ModelSize, Platform, RenderMode, SpeedVariant, catalog};

/// Parameters for one train/evaluate invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunParams {
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub speed: SpeedVariant,
    #[serde(default)]
    pub size: ModelSize,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Environment steps for the training stage.
    #[serde(default = "default_train_steps")]
    pub train_steps: u64,
    /// Wall-clock budget for the training stage, enforced by the framework.
    #[serde(default = "default_train_minutes")]
    pub train_minutes: u64,
    #[serde(default = "default_eval_episodes")]
    pub eval_episodes: usize,
    /// Show a live window while training.
    #[serde(default)]
    pub render: bool,
}

fn default_batch_size() -> usize {
    16
}
fn default_train_steps() -> u64 {
    100_000
}
fn default_train_minutes() -> u64 {
    60
}
fn default_eval_episodes() -> usize {
    3
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            speed: SpeedVariant::default(),
            size: ModelSize::default(),
            platform: Platform::default(),
            batch_size: default_batch_size(),
            train_steps: default_train_steps(),
            train_minutes: default_train_minutes(),
            eval_episodes: default_eval_episodes(),
            render: false,
        }
    }
}

impl RunParams {
    /// Catalog row for the selected environment and speed.
    pub fn spec(&self) -> Result<&'static EnvSpec, ParamError> {
        catalog::lookup(self.env, self.speed)
    }

    /// Framework config blocks: `[environment, model size]`.
    pub fn config_ids(&self) -> Result<[String; 2], ParamError> {
        Ok([self.spec()?.config_id.to_string(), self.size.config_id()])
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        self.spec()?;
        if self.batch_size == 0 {
            return Err(ParamError::Invalid("batch_size must be > 0".into()));
        }
        if self.train_steps == 0 {
            return Err(ParamError::Invalid("train_steps must be > 0".into()));
        }
        if self.train_minutes == 0 {
            return Err(ParamError::Invalid("train_minutes must be > 0".into()));
        }
        if self.eval_episodes == 0 {
            return Err(ParamError::Invalid("eval_episodes must be > 0".into()));
        }
        self.train_seconds()?;
        self.eval_steps()?;
        Ok(())
    }

    /// Training wall-clock budget in seconds.
    pub fn train_seconds(&self) -> Result<u64, ParamError> {
        self.train_minutes
            .checked_mul(60)
            .ok_or_else(|| ParamError::Invalid("train_minutes is too large".into()))
    }

    /// Directory name for a fresh run, e.g. `merge_fast_12m_20260101-120000`.
    #[must_use]
    pub fn run_name(&self, stamp: &str) -> String {
        match self.speed {
            SpeedVariant::Default => format!("{}_{}_{stamp}", self.env, self.size),
            SpeedVariant::Fast => format!("{}_fast_{}_{stamp}", self.env, self.size),
        }
    }

    /// Environment steps covering all evaluation episodes.
    pub fn eval_steps(&self) -> Result<usize, ParamError> {
        self.eval_episodes
            .checked_mul(self.spec()?.max_episode_steps)
            .ok_or_else(|| ParamError::Invalid("eval_episodes is too large".into()))
    }

    /// Arguments for the training stage (after the framework script path).
    pub fn train_args(&self, logdir: &Path) -> Result<Vec<String>, ParamError> {
        let [env_cfg, size_cfg] = self.config_ids()?;
        let render = if self.render {
            RenderMode::Human
        } else {
            RenderMode::None
        };
        Ok(vec![
            "--logdir".into(),
            logdir.display().to_string(),
            "--configs".into(),
            env_cfg,
            size_cfg,
            "--run.steps".into(),
            self.train_steps.to_string(),
            "--run.duration".into(),
            self.train_seconds()?.to_string(),
            "--jax.platform".into(),
            self.platform.to_string(),
            "--batch_size".into(),
            self.batch_size.to_string(),
            "--env.highway.render_mode".into(),
            render.to_string(),
        ])
    }

    /// Arguments for the evaluation stage (after the framework script path).
    pub fn eval_args(
        &self,
        logdir: &Path,
        checkpoint: &Path,
        video_dir: &Path,
    ) -> Result<Vec<String>, ParamError> {
        let [env_cfg, size_cfg] = self.config_ids()?;
        Ok(vec![
            "--script".into(),
            "eval_only".into(),
            "--logdir".into(),
            logdir.display().to_string(),
            "--configs".into(),
            env_cfg,
            size_cfg,
            "--run.from_checkpoint".into(),
            checkpoint.display().to_string(),
            "--run.steps".into(),
            self.eval_steps()?.to_string(),
            "--run.num_envs".into(),
            "1".into(),
            "--jax.platform".into(),
            self.platform.to_string(),
            "--env.highway.render_mode".into(),
            RenderMode::RgbArray.to_string(),
            "--env.highway.video_dir".into(),
            video_dir.display().to_string(),
        ])
    }
}

fn available_speeds(env: &Environment) -> String {
    catalog::speeds_for(*env)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors for invalid run parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error(
        "speed variant '{speed}' is not available for environment '{env}' (available: {})",
        available_speeds(.env)
    )]
    UnsupportedCombination {
        env: Environment,
        speed: SpeedVariant,
    },
    #[error("invalid run parameters: {0}")]
    Invalid(String),
}
