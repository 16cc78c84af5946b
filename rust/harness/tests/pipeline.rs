//! End-to-end pipeline tests against a mock framework.
//!
//! The mock is a bash script standing in for the Python interpreter. It
//! records its arguments, writes a checkpoint under `--logdir` when training
//! and a video under `--env.highway.video_dir` when evaluating.

use std::{
    fs,
    path::{Path, PathBuf},
};

use drive_harness::{
    HarnessSettings, Orchestrator, PipelineError, PipelineRequest, Runner, Stage,
    find_latest_checkpoint,
};
use tempfile::{TempDir, tempdir};

/// Write an executable mock that exits with `train_exit` for training runs.
fn write_mock_framework(dir: &Path, train_exit: i32) -> (PathBuf, PathBuf) {
    let mock_bin = dir.join("mock_python");
    let args_file = dir.join("captured_args.txt");
    let script = format!(
        r#"#!/usr/bin/env bash
echo "$@" >> "{args}"
logdir=""
video=""
eval=0
while [ $# -gt 0 ]; do
  case "$1" in
    --logdir) logdir="$2"; shift ;;
    --env.highway.video_dir) video="$2"; shift ;;
    --script) [ "$2" = "eval_only" ] && eval=1; shift ;;
  esac
  shift
done
if [ "$eval" -eq 1 ]; then
  mkdir -p "$video"
  printf fake > "$video/episode-0.mp4"
  exit 0
fi
echo "training in $logdir"
mkdir -p "$logdir/ckpt/20260101T000000"
exit {train_exit}
"#,
        args = args_file.display()
    );
    fs::write(&mock_bin, script).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&mock_bin, fs::Permissions::from_mode(0o755)).unwrap();
    }

    (mock_bin, args_file)
}

fn orchestrator(train_exit: i32) -> (TempDir, PathBuf, Orchestrator<Runner>) {
    let dir = tempdir().unwrap();
    let (mock_bin, args_file) = write_mock_framework(dir.path(), train_exit);
    let settings = HarnessSettings {
        script: "main.py".to_string(),
        log_root: dir.path().join("logdir"),
        ..Default::default()
    };
    let orch = Orchestrator::new(settings, mock_bin.to_str().unwrap(), Runner::new(false));
    (dir, args_file, orch)
}

#[tokio::test]
#[ignore = "spawns subprocesses"]
async fn test_train_then_eval() {
    let (_dir, args_file, orch) = orchestrator(0);

    let report = orch.run(&PipelineRequest::default()).await.unwrap();

    let run_dir = report.run_dir.unwrap();
    let checkpoint = report.checkpoint.unwrap();
    assert_eq!(checkpoint.run_dir, run_dir);
    assert_eq!(checkpoint.path, run_dir.join("ckpt/20260101T000000"));
    assert_eq!(report.videos.len(), 1);

    let captured = fs::read_to_string(&args_file).unwrap();
    let lines: Vec<_> = captured.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("main.py --logdir"));
    assert!(lines[0].contains("--configs highway_merge size12m"));
    assert!(lines[1].contains("--script eval_only"));
    assert!(lines[1].contains(checkpoint.path.to_str().unwrap()));

    // Child output is teed into the run directory.
    let stdout = fs::read_to_string(run_dir.join("train.stdout.log")).unwrap();
    assert!(stdout.starts_with("training in "));
}

#[tokio::test]
#[ignore = "spawns subprocesses"]
async fn test_train_failure_skips_eval() {
    let (_dir, args_file, orch) = orchestrator(7);

    let err = orch.run(&PipelineRequest::default()).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: Stage::Train,
            code: Some(7),
            ..
        }
    ));
    let captured = fs::read_to_string(&args_file).unwrap();
    assert_eq!(captured.lines().count(), 1);
    assert!(!captured.contains("eval_only"));
}

#[tokio::test]
#[ignore = "spawns subprocesses"]
async fn test_eval_existing_run() {
    let (_dir, args_file, orch) = orchestrator(0);
    let train_only = PipelineRequest {
        skip_eval: true,
        ..Default::default()
    };
    let trained = orch.run(&train_only).await.unwrap();
    let run_dir = trained.run_dir.unwrap();
    assert!(find_latest_checkpoint(&run_dir).is_some());

    let eval_only = PipelineRequest {
        skip_train: true,
        ..Default::default()
    };
    let report = orch.run(&eval_only).await.unwrap();

    assert_eq!(report.run_dir.as_deref(), Some(run_dir.as_path()));
    assert!(report.video_dir.unwrap().starts_with(run_dir.join("videos")));
    let captured = fs::read_to_string(&args_file).unwrap();
    assert_eq!(captured.lines().count(), 2);
}

#[tokio::test]
#[ignore = "spawns subprocesses"]
async fn test_relative_log_root_under_working_dir() {
    let dir = tempdir().unwrap();
    let (mock_bin, _args_file) = write_mock_framework(dir.path(), 0);
    let framework_dir = dir.path().join("framework");
    fs::create_dir_all(&framework_dir).unwrap();
    let settings = HarnessSettings {
        script: "main.py".to_string(),
        working_dir: Some(framework_dir.clone()),
        log_root: PathBuf::from("rel_logdir"),
        ..Default::default()
    };
    let orch = Orchestrator::new(settings, mock_bin.to_str().unwrap(), Runner::new(false));

    let report = orch.run(&PipelineRequest::default()).await.unwrap();

    let run_dir = report.run_dir.unwrap();
    assert!(run_dir.starts_with(framework_dir.join("rel_logdir")));
    assert!(run_dir.join("train.stdout.log").is_file());
    assert!(run_dir.join("eval.stdout.log").is_file());
    assert_eq!(report.checkpoint.unwrap().run_dir, run_dir);
    assert_eq!(report.videos.len(), 1);
}
