#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! Driving world-model harness
//!
//! Trains a world-model agent on a highway driving environment through the
//! external framework, finds the newest checkpoint, and evaluates it with
//! video capture.

pub mod checkpoint;
pub mod config;
pub mod orchestrator;
pub mod runner;
pub mod video;

pub use checkpoint::{CheckpointRef, find_latest_checkpoint};
pub use config::{HarnessConfig, HarnessSettings, RunOverrides};
pub use orchestrator::{Orchestrator, PipelineError, PipelineReport, PipelineRequest};
pub use runner::{Invocation, Launcher, Runner, Stage, StageResult};
