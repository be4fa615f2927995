//! OCR engines and the normalized result model.
//!
//! ## Engines
//!
//! - **Cloud Vision**: remote annotate API, text plus semantic labels (API_KEY)
//! - **Tesseract**: local binary, text plus word confidences, no labels
//!
//! Every engine implements [`OcrEngine`] and maps its own response shape
//! onto [`OcrResult`]. `OcrEngine::analyze` never fails; errors are folded
//! into a result with `success = false`.

mod backend;
mod model_utils;
mod result;
mod tesseract;
mod vision;

pub use backend::{OcrEngine, OcrError};
pub use model_utils::{check_binary, find_binary};
pub use result::{clamp_unit, Annotations, EngineKind, Label, OcrResult, DEFAULT_TEXT_CONFIDENCE};
pub use tesseract::{
    map_tesseract_output, normalize_confidence, parse_tsv, TesseractConfig, TesseractEngine,
    TesseractOutput,
};
pub use vision::{map_vision_response, VisionConfig, VisionEngine, DEFAULT_VISION_ENDPOINT};
