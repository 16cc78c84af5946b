//! Checkpoint discovery.
//!
//! The training framework writes checkpoints as `<run_dir>/ckpt/<instance>/`,
//! one instance directory per save. The locator scans a tree for `ckpt`
//! directories and picks the most recently modified instance.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use walkdir::WalkDir;

/// Name of the directory holding checkpoint instances.
pub const CHECKPOINT_MARKER: &str = "ckpt";

/// A checkpoint instance and the run it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRef {
    /// Checkpoint instance directory.
    pub path: PathBuf,
    /// Root of the owning run (two levels above `path`).
    pub run_dir: PathBuf,
}

impl CheckpointRef {
    /// Build a reference from a user-supplied checkpoint directory.
    ///
    /// The path is made absolute but otherwise kept as given; symlinks are
    /// not resolved.
    pub fn from_explicit(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(CheckpointError::Missing(path.to_path_buf()));
        }
        let path =
            std::path::absolute(path).map_err(|e| CheckpointError::Io(path.to_path_buf(), e))?;
        let run_dir = path
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| CheckpointError::NoRunDir(path.clone()))?
            .to_path_buf();
        Ok(Self { path, run_dir })
    }
}

/// Find the most recently modified checkpoint instance under `search_root`.
///
/// Unreadable entries are skipped. Equal modification times are broken by
/// taking the lexicographically greatest path, so the result does not depend
/// on directory iteration order.
#[must_use]
pub fn find_latest_checkpoint(search_root: impl AsRef<Path>) -> Option<CheckpointRef> {
    let search_root = search_root.as_ref();
    let mut best: Option<(SystemTime, PathBuf)> = None;

    for marker in WalkDir::new(search_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir() && e.file_name() == CHECKPOINT_MARKER)
    {
        let Ok(children) = fs::read_dir(marker.path()) else {
            tracing::debug!("Skipping unreadable {}", marker.path().display());
            continue;
        };

        for child in children.filter_map(Result::ok) {
            let Ok(meta) = child.metadata() else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            let Ok(modified) = meta.modified() else {
                continue;
            };
            let path = child.path();
            let newer = best
                .as_ref()
                .is_none_or(|(t, p)| (modified, &path) > (*t, p));
            if newer {
                best = Some((modified, path));
            }
        }
    }

    let (_, path) = best?;
    let run_dir = path.parent().and_then(Path::parent)?.to_path_buf();
    tracing::debug!("Latest checkpoint: {}", path.display());
    Some(CheckpointRef { path, run_dir })
}

/// Errors for explicitly supplied checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    Missing(PathBuf),
    #[error("cannot infer run directory for checkpoint {0}")]
    NoRunDir(PathBuf),
    #[error("failed to resolve checkpoint {0}: {1}")]
    Io(PathBuf, std::io::Error),
}
