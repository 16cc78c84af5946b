//! Two-stage train/evaluate pipeline.
//!
//! Stage 1 trains a fresh run, stage 2 evaluates a checkpoint and records
//! videos. Stages run strictly one after the other; a failed stage aborts
//! the pipeline.

use std::path::{Path, PathBuf};

use drive_config::{ParamError, RunParams};

use crate::{
    checkpoint::{CHECKPOINT_MARKER, CheckpointError, CheckpointRef, find_latest_checkpoint},
    config::HarnessSettings,
    runner::{Invocation, Launcher, RunError, Stage, StageResult},
    video,
};

/// What the caller wants the pipeline to do.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub params: RunParams,
    /// Checkpoint to evaluate when training is skipped.
    pub checkpoint: Option<PathBuf>,
    pub skip_train: bool,
    pub skip_eval: bool,
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Run directory created by training, or owning the evaluated checkpoint.
    pub run_dir: Option<PathBuf>,
    pub checkpoint: Option<CheckpointRef>,
    pub video_dir: Option<PathBuf>,
    pub videos: Vec<PathBuf>,
    pub stages: Vec<StageResult>,
}

/// Drives the external framework through training and evaluation.
pub struct Orchestrator<L> {
    settings: HarnessSettings,
    python: String,
    launcher: L,
}

impl<L: Launcher> Orchestrator<L> {
    #[must_use]
    pub fn new(settings: HarnessSettings, python: impl Into<String>, launcher: L) -> Self {
        Self {
            settings,
            python: python.into(),
            launcher,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    #[must_use]
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run the pipeline to completion or to the first failure.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineReport, PipelineError> {
        if request.skip_train && request.skip_eval {
            return Err(PipelineError::NothingToDo);
        }
        let params = &request.params;
        params.validate()?;

        let log_root = self.log_root()?;
        let mut report = PipelineReport::default();

        if !request.skip_train {
            if let Some(ref ckpt) = request.checkpoint {
                tracing::warn!(
                    "Ignoring --checkpoint {} because training runs first",
                    ckpt.display()
                );
            }
            let run_dir = log_root.join(params.run_name(&timestamp()));
            tracing::info!("Training run directory: {}", run_dir.display());

            let invocation = self.train_invocation(params, &run_dir)?;
            let result = self.launch(&invocation).await?;
            report.stages.push(result);
            report.run_dir = Some(run_dir);
        }

        if request.skip_eval {
            return Ok(report);
        }

        let checkpoint = resolve_checkpoint(request, report.run_dir.as_deref(), &log_root)?;
        tracing::info!("Evaluating checkpoint {}", checkpoint.path.display());

        let video_dir = video::video_dir(&checkpoint.run_dir, &timestamp());
        std::fs::create_dir_all(&video_dir)
            .map_err(|e| PipelineError::Io(video_dir.clone(), e))?;

        let invocation = self.eval_invocation(params, &checkpoint, &video_dir)?;
        let result = self.launch(&invocation).await?;
        report.stages.push(result);

        report.videos = video::list_videos(&video_dir);
        tracing::info!(
            "Recorded {} video(s) in {}",
            report.videos.len(),
            video_dir.display()
        );
        report.run_dir = Some(checkpoint.run_dir.clone());
        report.video_dir = Some(video_dir);
        report.checkpoint = Some(checkpoint);
        Ok(report)
    }

    /// Build the invocations `run` would launch, without launching anything.
    ///
    /// When training runs first, the evaluated checkpoint is not known yet and
    /// is shown as a placeholder inside the future run directory.
    pub fn preview(&self, request: &PipelineRequest) -> Result<Vec<Invocation>, PipelineError> {
        if request.skip_train && request.skip_eval {
            return Err(PipelineError::NothingToDo);
        }
        let params = &request.params;
        params.validate()?;
        let log_root = self.log_root()?;

        let mut invocations = Vec::new();
        let stamp = timestamp();
        let mut run_dir = None;

        if !request.skip_train {
            let dir = log_root.join(params.run_name(&stamp));
            invocations.push(self.train_invocation(params, &dir)?);
            run_dir = Some(dir);
        }

        if !request.skip_eval {
            let checkpoint = match run_dir {
                Some(run_dir) => CheckpointRef {
                    path: run_dir.join(CHECKPOINT_MARKER).join("<latest>"),
                    run_dir,
                },
                None => resolve_checkpoint(request, None, &log_root)?,
            };
            let video_dir = video::video_dir(&checkpoint.run_dir, &stamp);
            invocations.push(self.eval_invocation(params, &checkpoint, &video_dir)?);
        }

        Ok(invocations)
    }

    fn log_root(&self) -> Result<PathBuf, PipelineError> {
        self.settings
            .resolved_log_root()
            .map_err(|e| PipelineError::LogRoot(self.settings.log_root.clone(), e))
    }

    async fn launch(&self, invocation: &Invocation) -> Result<StageResult, PipelineError> {
        let result = self.launcher.launch(invocation).await?;
        if !result.success {
            return Err(PipelineError::StageFailed {
                stage: result.stage,
                code: result.exit_code,
                detail: result.error.unwrap_or_default(),
            });
        }
        Ok(result)
    }

    fn train_invocation(
        &self,
        params: &RunParams,
        run_dir: &Path,
    ) -> Result<Invocation, PipelineError> {
        let mut args = vec![self.settings.script.clone()];
        args.extend(params.train_args(run_dir)?);
        Ok(self.invocation(Stage::Train, args, run_dir))
    }

    fn eval_invocation(
        &self,
        params: &RunParams,
        checkpoint: &CheckpointRef,
        video_dir: &Path,
    ) -> Result<Invocation, PipelineError> {
        let mut args = vec![self.settings.script.clone()];
        args.extend(params.eval_args(&checkpoint.run_dir, &checkpoint.path, video_dir)?);
        Ok(self.invocation(Stage::Eval, args, &checkpoint.run_dir))
    }

    fn invocation(&self, stage: Stage, args: Vec<String>, log_dir: &Path) -> Invocation {
        Invocation {
            stage,
            program: self.python.clone(),
            args,
            env: self.settings.env.clone(),
            working_dir: self.settings.working_dir.clone(),
            log_dir: log_dir.to_path_buf(),
        }
    }
}

/// Pick the checkpoint for evaluation.
///
/// After training only the new run is searched; otherwise an explicit
/// checkpoint wins over a scan of the whole log root.
fn resolve_checkpoint(
    request: &PipelineRequest,
    trained_run: Option<&Path>,
    log_root: &Path,
) -> Result<CheckpointRef, PipelineError> {
    if let Some(run_dir) = trained_run {
        return find_latest_checkpoint(run_dir)
            .ok_or_else(|| PipelineError::NoCheckpoint(run_dir.to_path_buf()));
    }
    if let Some(ref path) = request.checkpoint {
        return Ok(CheckpointRef::from_explicit(path)?);
    }
    find_latest_checkpoint(log_root)
        .ok_or_else(|| PipelineError::NoCheckpoint(log_root.to_path_buf()))
}

/// Local time formatted for directory names.
#[must_use]
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Errors that abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("nothing to do: both training and evaluation are skipped")]
    NothingToDo,
    #[error(transparent)]
    Params(#[from] ParamError),
    #[error("{stage} stage failed (exit code {code:?}): {detail}")]
    StageFailed {
        stage: Stage,
        code: Option<i32>,
        detail: String,
    },
    #[error("no checkpoint found under {0}")]
    NoCheckpoint(PathBuf),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("failed to create {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("cannot resolve log root {0}: {1}")]
    LogRoot(PathBuf, std::io::Error),
}
