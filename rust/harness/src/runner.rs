//! Subprocess execution for the training and evaluation stages.

use std::{
    collections::{BTreeMap, VecDeque},
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::{
    fs::OpenOptions,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};

/// Number of stderr lines kept for failure reports.
const STDERR_TAIL: usize = 20;

/// Pipeline stage backed by an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Train,
    Eval,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Eval => write!(f, "eval"),
        }
    }
}

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    /// Where stdout/stderr logs are written.
    pub log_dir: PathBuf,
}

impl Invocation {
    /// Value following `flag` in the argument list, if present.
    #[must_use]
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        let idx = self.args.iter().position(|a| a == flag)?;
        self.args.get(idx + 1).map(String::as_str)
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (k, v) in &self.env {
            write!(f, "{k}={v} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of one stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: Stage,
    pub success: bool,
    /// Exit code if available.
    pub exit_code: Option<i32>,
    /// Error message if failed.
    pub error: Option<String>,
}

/// Starts an invocation and waits for it to finish.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    async fn launch(&self, invocation: &Invocation) -> Result<StageResult, RunError>;
}

/// Runs invocations as child processes, teeing their output to log files.
pub struct Runner {
    /// Also print child stdout/stderr to the terminal.
    echo: bool,
}

impl Runner {
    #[must_use]
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }

    /// Find a Python interpreter for the training framework.
    #[must_use]
    pub fn find_python() -> Option<String> {
        let venv = "./.venv/bin/python";
        if Path::new(venv).exists() {
            return Some(venv.to_string());
        }

        for candidate in ["python3", "python"] {
            if let Ok(output) = std::process::Command::new("which").arg(candidate).output()
                && output.status.success()
            {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }

        None
    }
}

impl Launcher for Runner {
    async fn launch(&self, invocation: &Invocation) -> Result<StageResult, RunError> {
        let stage = invocation.stage;
        tokio::fs::create_dir_all(&invocation.log_dir)
            .await
            .map_err(|e| RunError::LogDir(invocation.log_dir.clone(), e))?;

        tracing::info!("Starting {stage} stage");
        tracing::debug!("Spawning: {invocation}");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|e| RunError::Spawn(stage, e))?;

        let stdout_task = child.stdout.take().map(|stdout| {
            let path = invocation.log_dir.join(format!("{stage}.stdout.log"));
            let echo = self.echo;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                let mut file = open_log(&path).await;
                while let Ok(Some(line)) = lines.next_line().await {
                    if echo {
                        println!("{line}");
                    }
                    if let Some(ref mut f) = file {
                        let _ = f.write_all(line.as_bytes()).await;
                        let _ = f.write_all(b"\n").await;
                    }
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            let path = invocation.log_dir.join(format!("{stage}.stderr.log"));
            let echo = self.echo;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut file = open_log(&path).await;
                let mut tail = VecDeque::with_capacity(STDERR_TAIL);
                while let Ok(Some(line)) = lines.next_line().await {
                    if echo {
                        eprintln!("{line}");
                    }
                    if let Some(ref mut f) = file {
                        let _ = f.write_all(line.as_bytes()).await;
                        let _ = f.write_all(b"\n").await;
                    }
                    if tail.len() >= STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail.into_iter().collect::<Vec<_>>()
            })
        });

        let status = child.wait().await;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.ok(),
            None => None,
        };

        let result = match status {
            Ok(status) if status.success() => StageResult {
                stage,
                success: true,
                exit_code: status.code(),
                error: None,
            },
            Ok(status) => {
                let error_msg = stderr_tail
                    .filter(|lines| !lines.is_empty())
                    .map_or_else(
                        || format!("Exit code: {:?}", status.code()),
                        |lines| lines.join("\n"),
                    );
                StageResult {
                    stage,
                    success: false,
                    exit_code: status.code(),
                    error: Some(error_msg),
                }
            }
            Err(e) => StageResult {
                stage,
                success: false,
                exit_code: None,
                error: Some(format!("Process error: {e}")),
            },
        };

        if result.success {
            tracing::info!("{stage} stage finished");
        } else {
            tracing::error!("{stage} stage exited with {:?}", result.exit_code);
        }
        Ok(result)
    }
}

/// Open a log file for appending; logging is best-effort.
async fn open_log(path: &Path) -> Option<tokio::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .ok()
}

/// Errors that can occur when running a subprocess.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn {0} process: {1}")]
    Spawn(Stage, std::io::Error),
    #[error("failed to create log directory {0}: {1}")]
    LogDir(PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn invocation(program: &str, args: &[&str], log_dir: &Path) -> Invocation {
        Invocation {
            stage: Stage::Train,
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: BTreeMap::new(),
            working_dir: None,
            log_dir: log_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let mut inv = invocation(
            "python",
            &["main.py", "--logdir", "/tmp/my runs"],
            Path::new("."),
        );
        inv.env.insert("MUJOCO_GL".into(), "egl".into());
        assert_eq!(
            inv.to_string(),
            "MUJOCO_GL=egl python main.py --logdir '/tmp/my runs'"
        );
    }

    #[test]
    fn test_arg_value() {
        let inv = invocation("python", &["main.py", "--logdir", "logs"], Path::new("."));
        assert_eq!(inv.arg_value("--logdir"), Some("logs"));
        assert_eq!(inv.arg_value("--configs"), None);
    }

    #[tokio::test]
    #[ignore = "spawns subprocesses"]
    async fn test_failure_reports_stderr_tail() {
        let dir = tempdir().unwrap();
        let inv = invocation(
            "sh",
            &["-c", "echo progress; echo boom >&2; exit 3"],
            dir.path(),
        );

        let result = Runner::new(false).launch(&inv).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.error.as_deref(), Some("boom"));

        let stdout = std::fs::read_to_string(dir.path().join("train.stdout.log")).unwrap();
        assert_eq!(stdout, "progress\n");
    }

    #[tokio::test]
    #[ignore = "spawns subprocesses"]
    async fn test_spawn_error() {
        let dir = tempdir().unwrap();
        let inv = invocation("/nonexistent/python", &[], dir.path());
        let err = Runner::new(false).launch(&inv).await.unwrap_err();
        assert!(matches!(err, RunError::Spawn(Stage::Train, _)));
    }
}
