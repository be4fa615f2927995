//! Image discovery for batch runs.

use std::path::{Path, PathBuf};

/// File extensions treated as images (compared lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Check whether a path has a supported image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively find image files under `input_dir`, sorted by path.
///
/// Unreadable subdirectories are skipped with a warning.
pub fn find_images(input_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    let mut pending = vec![input_dir.to_path_buf()];
    let mut root = true;

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if root => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };
        root = false;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() && is_image(&path) {
                images.push(path);
            }
        }
    }

    images.sort();
    Ok(images)
}
