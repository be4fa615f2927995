//! Shared utilities for local OCR engines.

use std::path::{Path, PathBuf};

/// Resolve a binary name or path to an executable, searching PATH for bare names.
pub fn find_binary(binary: &Path) -> Option<PathBuf> {
    which::which(binary).ok()
}

/// Check if a binary is available.
pub fn check_binary(binary: &Path) -> bool {
    find_binary(binary).is_some()
}

/// Split an opaque engine option string into process arguments.
pub fn split_args(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("--psm 6  --oem 1"), vec!["--psm", "6", "--oem", "1"]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary(Path::new("definitely-not-a-real-ocr-binary")));
    }
}
