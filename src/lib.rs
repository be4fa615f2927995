//! vis-cli - batch image OCR and label extraction.
//!
//! Runs one of several interchangeable OCR engines over a set of images and
//! normalizes their heterogeneous outputs into a single [`ocr::OcrResult`]
//! shape. Per-image failures are contained and reported alongside successes.

pub mod config;
pub mod discovery;
pub mod ocr;
pub mod output;
pub mod services;
