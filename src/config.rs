//! Engine configuration and construction.
//!
//! Settings are resolved by the CLI (flags, environment, `.env`) and turned
//! into a ready engine here. Missing credentials or binaries are reported
//! before any image is processed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ocr::{
    EngineKind, OcrEngine, OcrError, TesseractConfig, TesseractEngine, VisionConfig,
    VisionEngine, DEFAULT_VISION_ENDPOINT,
};

/// Resolved settings for building an engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub engine: EngineKind,
    pub vision: VisionConfig,
    pub tesseract: TesseractConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            engine: EngineKind::CloudVision,
            vision: VisionConfig::default(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl EngineSettings {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.vision.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.vision.endpoint = endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.vision.timeout = timeout;
        self
    }

    pub fn with_max_labels(mut self, max_labels: u32) -> Self {
        self.vision.max_labels = max_labels;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.tesseract.language = language.into();
        self
    }

    pub fn with_tesseract_options(mut self, options: impl Into<String>) -> Self {
        self.tesseract.options = options.into();
        self
    }

    pub fn with_tesseract_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.tesseract.binary = binary.into();
        self
    }
}

/// Build the selected engine, failing if it cannot run.
pub fn build_engine(settings: &EngineSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    let engine: Arc<dyn OcrEngine> = match settings.engine {
        EngineKind::CloudVision => Arc::new(VisionEngine::new(settings.vision.clone())?),
        EngineKind::LocalOcr => Arc::new(TesseractEngine::with_config(settings.tesseract.clone())),
    };

    if !engine.is_available() {
        return Err(OcrError::BackendNotAvailable(engine.availability_hint()));
    }

    Ok(engine)
}

/// Build every known engine for availability reporting, available or not.
pub fn all_engines(settings: &EngineSettings) -> Vec<Arc<dyn OcrEngine>> {
    let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();
    match VisionEngine::new(settings.vision.clone()) {
        Ok(engine) => engines.push(Arc::new(engine)),
        Err(e) => tracing::warn!("Could not construct Cloud Vision engine: {}", e),
    }
    engines.push(Arc::new(TesseractEngine::with_config(
        settings.tesseract.clone(),
    )));
    engines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_requires_api_key() {
        let settings = EngineSettings::new(EngineKind::CloudVision).with_api_key(Some("  ".into()));
        let err = build_engine(&settings).err().unwrap();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_vision_with_key_builds() {
        let settings = EngineSettings::new(EngineKind::CloudVision)
            .with_api_key(Some("secret".into()))
            .with_endpoint(None);
        let engine = build_engine(&settings).unwrap();
        assert_eq!(engine.kind(), EngineKind::CloudVision);
        assert_eq!(settings.vision.endpoint, DEFAULT_VISION_ENDPOINT);
    }

    #[test]
    fn test_missing_tesseract_is_reported() {
        let settings = EngineSettings::new(EngineKind::LocalOcr)
            .with_tesseract_binary("definitely-not-tesseract")
            .with_language("deu")
            .with_tesseract_options("--psm 6");
        assert_eq!(settings.tesseract.language, "deu");
        assert!(build_engine(&settings).is_err());
    }

    #[test]
    fn test_all_engines_lists_both() {
        let kinds: Vec<_> = all_engines(&EngineSettings::default())
            .iter()
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec![EngineKind::CloudVision, EngineKind::LocalOcr]);
    }
}
