//! Normalized OCR result types shared by every engine.

use serde::{Deserialize, Serialize};

/// Confidence reported when text was found but the engine gives no score for it.
pub const DEFAULT_TEXT_CONFIDENCE: f32 = 1.0;

/// Which engine produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Remote multi-feature annotation API.
    CloudVision,
    /// Locally installed Tesseract binary.
    LocalOcr,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::CloudVision => "cloud_vision",
            EngineKind::LocalOcr => "local_ocr",
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud_vision" | "vision" | "vision_api" => Ok(EngineKind::CloudVision),
            "local_ocr" | "tesseract" => Ok(EngineKind::LocalOcr),
            other => Err(format!("unknown engine: {}", other)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A detected concept, or the literal `"text"` marker for engines without labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Always within `[0, 1]`.
    pub score: f32,
}

impl Label {
    /// Create a label, clamping the score into `[0, 1]`.
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            score: clamp_unit(score),
        }
    }
}

/// Clamp a score into `[0, 1]`; NaN becomes 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Unified result of analyzing one image.
///
/// Construct through [`OcrResult::from_annotations`] or [`OcrResult::failure`],
/// which uphold the success/error invariants: a successful result never
/// carries an error, and a failed one carries nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub image_path: String,
    pub engine: EngineKind,
    pub full_text: String,
    pub labels: Vec<Label>,
    pub confidence: f32,
    pub success: bool,
    pub error: Option<String>,
}

impl OcrResult {
    /// Assemble a successful result from independently obtained features.
    ///
    /// Missing features become empty values; they are never an error.
    pub fn from_annotations(
        image_path: impl Into<String>,
        engine: EngineKind,
        annotations: Annotations,
    ) -> Self {
        let confidence = annotations
            .confidence
            .map(clamp_unit)
            .unwrap_or_else(|| annotations.derived_confidence());

        Self {
            image_path: image_path.into(),
            engine,
            full_text: annotations.text.unwrap_or_default(),
            labels: annotations.labels.unwrap_or_default(),
            confidence,
            success: true,
            error: None,
        }
    }

    /// A failed result. An empty message is replaced so `error` is never blank.
    pub fn failure(
        image_path: impl Into<String>,
        engine: EngineKind,
        error: impl Into<String>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }

        Self {
            image_path: image_path.into(),
            engine,
            full_text: String::new(),
            labels: Vec::new(),
            confidence: 0.0,
            success: false,
            error: Some(error),
        }
    }
}

/// Per-feature outputs gathered by an engine before final assembly.
///
/// `None` means the feature produced nothing; blank text counts as nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub text: Option<String>,
    pub labels: Option<Vec<Label>>,
    /// Engine-supplied overall confidence; derived from the features when absent.
    pub confidence: Option<f32>,
}

impl Annotations {
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = if labels.is_empty() { None } else { Some(labels) };
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Mean label score, else [`DEFAULT_TEXT_CONFIDENCE`] when only text exists, else 0.
    fn derived_confidence(&self) -> f32 {
        match (&self.labels, &self.text) {
            (Some(labels), _) => {
                let sum: f32 = labels.iter().map(|l| l.score).sum();
                clamp_unit(sum / labels.len() as f32)
            }
            (None, Some(_)) => DEFAULT_TEXT_CONFIDENCE,
            (None, None) => 0.0,
        }
    }
}
