//! Engine abstraction shared by every OCR backend.
//!
//! Engines implement the fallible [`OcrEngine::extract`]; callers use
//! [`OcrEngine::analyze`], which never fails and folds every error into a
//! `success = false` result.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::result::{EngineKind, OcrResult};

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image file not found: {0}")]
    ImageNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{message} (code: {code})")]
    Api { code: i64, message: String },

    #[error("OCR failed: {0}")]
    InvocationFailed(String),
}

/// Trait for OCR engines.
///
/// Configuration is fixed at construction; implementations must be safe to
/// call concurrently from many tasks.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Which engine this is.
    fn kind(&self) -> EngineKind;

    /// Check if this engine can run (binary installed, credentials present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this engine available.
    fn availability_hint(&self) -> String;

    /// Core analysis: produce a result or the error that prevented one.
    async fn extract(&self, image_path: &Path) -> Result<OcrResult, OcrError>;

    /// Analyze an image. Never fails; errors become a failed result.
    async fn analyze(&self, image_path: &Path) -> OcrResult {
        match self.extract(image_path).await {
            Ok(result) => result,
            Err(e) => {
                let name = image_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| image_path.display().to_string());
                tracing::warn!("Error processing {} with {}: {}", name, self.kind(), e);
                OcrResult::failure(image_path.display().to_string(), self.kind(), e.to_string())
            }
        }
    }
}

/// Fail early with [`OcrError::ImageNotFound`] when the image is missing.
pub(crate) fn ensure_image_exists(image_path: &Path) -> Result<(), OcrError> {
    if image_path.is_file() {
        Ok(())
    } else {
        Err(OcrError::ImageNotFound(image_path.display().to_string()))
    }
}
