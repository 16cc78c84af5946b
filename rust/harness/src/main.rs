//! Driving harness CLI
//!
//! Trains a world-model agent on a driving environment, then evaluates the
//! newest checkpoint and records videos.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drive_config::CATALOG;
use drive_harness::{
    config::{HarnessConfig, RunOverrides},
    find_latest_checkpoint,
    orchestrator::{Orchestrator, PipelineRequest},
    runner::Runner,
    video,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "drive-harness",
    about = "Train and evaluate world-model agents on highway driving environments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new run, then evaluate its newest checkpoint with video capture
    Run {
        /// Path to drive.toml config file
        #[arg(short, long, default_value = "drive.toml")]
        config: PathBuf,

        #[command(flatten)]
        overrides: RunOverrides,

        /// Checkpoint directory to evaluate (with --skip-train)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Skip training and evaluate an existing checkpoint
        #[arg(long, conflicts_with = "skip_eval")]
        skip_train: bool,

        /// Train only
        #[arg(long)]
        skip_eval: bool,

        /// Open the video folder when evaluation finishes
        #[arg(long)]
        open: bool,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,

        /// Override the base log directory
        #[arg(long)]
        log_root: Option<PathBuf>,

        /// Python interpreter (auto-detected if not specified)
        #[arg(long)]
        python: Option<String>,

        /// Do not echo framework output to the terminal
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the newest checkpoint under a directory
    Locate {
        /// Directory to search (defaults to the configured log root)
        root: Option<PathBuf>,

        /// Path to drive.toml config file
        #[arg(short, long, default_value = "drive.toml")]
        config: PathBuf,
    },

    /// List supported environments and speed variants
    Envs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            overrides,
            checkpoint,
            skip_train,
            skip_eval,
            open,
            dry_run,
            log_root,
            python,
            quiet,
        } => {
            let harness_config = HarnessConfig::load_or_default(&config)?;
            let mut settings = harness_config.harness;
            if let Some(log_root) = log_root {
                settings.log_root = log_root;
            }

            let mut params = harness_config.defaults;
            overrides.apply(&mut params);

            let python = python
                .or_else(|| settings.python.clone())
                .or_else(Runner::find_python)
                .ok_or("Could not find a Python interpreter. Please specify --python")?;

            let request = PipelineRequest {
                params,
                checkpoint,
                skip_train,
                skip_eval,
            };
            let orchestrator = Orchestrator::new(settings, python, Runner::new(!quiet));

            if dry_run {
                println!("=== Dry Run ===");
                for invocation in orchestrator.preview(&request)? {
                    println!("[{}] {invocation}", invocation.stage);
                }
                return Ok(());
            }

            let report = orchestrator.run(&request).await?;

            println!();
            println!("=== Harness Complete ===");
            if let Some(ref run_dir) = report.run_dir {
                println!("Run directory: {}", run_dir.display());
            }
            if let Some(ref checkpoint) = report.checkpoint {
                println!("Checkpoint: {}", checkpoint.path.display());
            }
            if let Some(ref video_dir) = report.video_dir {
                println!("Videos ({}): {}", report.videos.len(), video_dir.display());
                for path in &report.videos {
                    println!("  - {}", path.display());
                }
                if report.videos.is_empty() {
                    println!("  (no video files were produced)");
                }

                if open && let Err(e) = video::open_folder(video_dir) {
                    eprintln!("Warning: Failed to open {}: {e}", video_dir.display());
                }
            }
        }

        Commands::Locate { root, config } => {
            let root = match root {
                Some(root) => root,
                None => HarnessConfig::load_or_default(&config)?.harness.log_root,
            };

            let Some(checkpoint) = find_latest_checkpoint(&root) else {
                return Err(format!("No checkpoint found under {}", root.display()).into());
            };
            println!("Checkpoint: {}", checkpoint.path.display());
            println!("Run directory: {}", checkpoint.run_dir.display());
        }

        Commands::Envs => {
            println!("=== Environments ===");
            for spec in CATALOG {
                println!(
                    "{} [{}]: --configs {} ({}, {} steps/episode)",
                    spec.env, spec.speed, spec.config_id, spec.gym_id, spec.max_episode_steps
                );
                println!("  {}", spec.description);
                if let Some(profile) = spec.speed_profile {
                    let s = profile.scaled();
                    println!(
                        "  ego {:.1} m/s, traffic {:.1}-{:.1} m/s, merging {:.1} -> {:.1} m/s, \
                         reward speed {:.0}-{:.0} m/s",
                        s.ego_speed,
                        s.other_vehicles_speed_range.0,
                        s.other_vehicles_speed_range.1,
                        s.merging_vehicle_speed,
                        s.merging_vehicle_target_speed,
                        s.reward_speed_range.0,
                        s.reward_speed_range.1
                    );
                }
            }
        }
    }

    Ok(())
}
