use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// A file is excluded when any exclusion token equals one of its path
/// segments or its full filename. Tokens never match substrings, so
/// excluding `skip` leaves `c_skip.mp4` alone.
pub fn is_excluded(path: &Path, exclude: &[String]) -> bool {
    exclude.iter().any(|token| {
        path.components()
            .any(|c| c.as_os_str().to_string_lossy() == *token)
    })
}

/// Recursively collect non-excluded `.mp4` files under `root`, in a stable
/// order.
pub fn find_video_files(root: &Path, exclude: &[String]) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("mp4"))
        })
        .filter(|path| {
            if is_excluded(path, exclude) {
                debug!(path = %path.display(), "excluded, skipping");
                false
            } else {
                true
            }
        })
        .collect();
    videos.sort();
    videos
}
