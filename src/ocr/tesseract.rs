//! Tesseract OCR backend implementation.
//!
//! Runs the Tesseract command-line binary with TSV output, which carries
//! both the recognized words and their confidences (0-100) in one pass.
//! Tesseract does no label detection; a single `"text"` label is
//! synthesized when any text is recognized.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::backend::{ensure_image_exists, OcrEngine, OcrError};
use super::model_utils::{check_binary, split_args};
use super::result::{Annotations, EngineKind, Label, OcrResult};

/// TSV row level for a single word.
const WORD_LEVEL: u32 = 5;

/// Configuration for [`TesseractEngine`].
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Binary name (looked up in PATH) or path.
    pub binary: PathBuf,
    /// Language code(s), e.g. "eng" or "eng+deu".
    pub language: String,
    /// Extra options passed through verbatim, e.g. "--psm 6".
    pub options: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            options: String::new(),
        }
    }
}

/// Tesseract OCR engine.
pub struct TesseractEngine {
    config: TesseractConfig,
}

/// Raw recognition output before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TesseractOutput {
    pub text: String,
    /// Per-word confidences on Tesseract's native scale; may include -1.
    pub word_confidences: Vec<f32>,
}

impl TesseractEngine {
    /// Create a new Tesseract engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(TesseractConfig::default())
    }

    /// Create a new Tesseract engine with custom configuration.
    pub fn with_config(config: TesseractConfig) -> Self {
        Self { config }
    }

    /// Run Tesseract on an image file and return its TSV output.
    async fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.config.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .args(split_args(&self.config.options))
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::InvocationFailed(format!(
                        "tesseract failed ({}): {}",
                        output.status,
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.config.binary.display()
                )))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse Tesseract TSV output into text and word confidences.
///
/// Words on the same line are joined by spaces, lines by a newline, and a
/// new paragraph or block starts after a blank line.
pub fn parse_tsv(tsv: &str) -> Result<TesseractOutput, OcrError> {
    let mut output = TesseractOutput::default();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;

    for (index, row) in tsv.lines().enumerate() {
        if row.trim().is_empty() || (index == 0 && row.starts_with("level")) {
            continue;
        }

        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 11 {
            return Err(OcrError::MalformedResponse(format!(
                "unexpected TSV row {}: {:?}",
                index + 1,
                row
            )));
        }

        let number = |i: usize| -> Result<u32, OcrError> {
            fields[i].trim().parse().map_err(|_| {
                OcrError::MalformedResponse(format!("bad TSV field {} on row {}", i + 1, index + 1))
            })
        };

        if number(0)? != WORD_LEVEL {
            continue;
        }

        let confidence: f32 = fields[10].trim().parse().map_err(|_| {
            OcrError::MalformedResponse(format!("bad confidence on row {}", index + 1))
        })?;
        output.word_confidences.push(confidence);

        let word = fields.get(11).map(|w| w.trim()).unwrap_or("");
        if word.is_empty() {
            continue;
        }

        let line = (number(1)?, number(2)?, number(3)?, number(4)?);
        match current_line {
            Some(prev) if prev == line => output.text.push(' '),
            Some(prev) if (prev.0, prev.1, prev.2) == (line.0, line.1, line.2) => {
                output.text.push('\n')
            }
            Some(_) => output.text.push_str("\n\n"),
            None => {}
        }
        output.text.push_str(word);
        current_line = Some(line);
    }

    Ok(output)
}

/// Average of the in-range (0-100) confidences, rescaled to `[0, 1]`.
///
/// A word confidence of exactly 0 is a real score and counts toward the
/// average; only out-of-range markers such as `-1` are dropped.
pub fn normalize_confidence(word_confidences: &[f32]) -> f32 {
    let valid: Vec<f32> = word_confidences
        .iter()
        .copied()
        .filter(|c| (0.0..=100.0).contains(c))
        .collect();

    if valid.is_empty() {
        return 0.0;
    }

    let average = valid.iter().sum::<f32>() / valid.len() as f32;
    (average / 100.0).clamp(0.0, 1.0)
}

/// Map recognition output onto a result for `image_path`.
pub fn map_tesseract_output(image_path: &str, output: &TesseractOutput) -> OcrResult {
    let text = output.text.trim();
    let confidence = normalize_confidence(&output.word_confidences);

    let labels = if text.is_empty() {
        Vec::new()
    } else {
        vec![Label::new("text", confidence)]
    };

    let annotations = Annotations::default()
        .with_text(text)
        .with_labels(labels)
        .with_confidence(confidence);

    OcrResult::from_annotations(image_path, EngineKind::LocalOcr, annotations)
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::LocalOcr
    }

    fn is_available(&self) -> bool {
        check_binary(&self.config.binary)
    }

    fn availability_hint(&self) -> String {
        if !self.is_available() {
            format!(
                "Tesseract not found at '{}'. Install with: apt install tesseract-ocr",
                self.config.binary.display()
            )
        } else {
            format!("Tesseract is available (lang: {})", self.config.language)
        }
    }

    async fn extract(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        ensure_image_exists(image_path)?;

        let tsv = self.run_tesseract(image_path).await?;
        let output = parse_tsv(&tsv)?;
        let result = map_tesseract_output(&image_path.display().to_string(), &output);

        tracing::debug!(
            "Processed {} with Tesseract: {} chars, confidence: {:.2}",
            image_path.display(),
            result.full_text.len(),
            result.confidence
        );

        Ok(result)
    }
}
