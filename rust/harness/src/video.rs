//! Evaluation video output.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File extensions recognized as rendered episodes.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "gif", "webm", "avi"];

/// Output directory for one evaluation: `<run_dir>/videos/<stamp>`.
#[must_use]
pub fn video_dir(run_dir: &Path, stamp: &str) -> PathBuf {
    run_dir.join("videos").join(stamp)
}

/// All video files under `dir`, sorted by path. Unreadable entries are skipped.
#[must_use]
pub fn list_videos(dir: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    videos.sort();
    videos
}

/// Open `path` in the platform file browser without waiting for it.
pub fn open_folder(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    Ok(())
}
