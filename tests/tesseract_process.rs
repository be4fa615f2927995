//! Tesseract engine against a stand-in binary that prints canned TSV.
//!
//! Scenarios share one test so the script is written before any process is
//! spawned from this test binary.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vis_cli::ocr::{EngineKind, OcrEngine, TesseractConfig, TesseractEngine};
use vis_cli::services::BatchRunner;

const FAKE_TESSERACT: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/args.txt"
header='level	page_num	block_num	par_num	line_num	word_num	left	top	width	height	conf	text'
case "$1" in
  *blank*)
    echo "$header"
    echo '1	1	0	0	0	0	0	0	640	480	-1	'
    ;;
  *crash*)
    echo "Error in pixReadStream: Unknown format" >&2
    exit 1
    ;;
  *)
    echo "$header"
    echo '5	1	1	1	1	1	10	10	20	10	90	AB'
    echo '5	1	1	1	1	2	40	10	20	10	80	C'
    echo '5	1	1	1	1	3	70	10	1	1	-1	'
    ;;
esac
"#;

fn install_script(dir: &Path) -> PathBuf {
    let path = dir.join("tesseract");
    std::fs::write(&path, FAKE_TESSERACT).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"\x89PNG").unwrap();
    path
}

#[tokio::test]
async fn test_tesseract_process_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let binary = install_script(dir.path());
    let engine = TesseractEngine::with_config(TesseractConfig {
        binary: binary.clone(),
        language: "eng+deu".to_string(),
        options: "--psm 6".to_string(),
    });
    assert!(engine.is_available());

    // Recognized words with one sentinel confidence.
    let words = write_image(dir.path(), "words.png");
    let result = engine.analyze(&words).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.engine, EngineKind::LocalOcr);
    assert_eq!(result.full_text, "AB C");
    assert!((result.confidence - 0.85).abs() < 1e-6);
    assert_eq!(result.labels.len(), 1);
    assert_eq!(result.labels[0].name, "text");

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert_eq!(
        args.trim(),
        format!("{} stdout -l eng+deu --psm 6 tsv", words.display())
    );

    // Nothing recognized is not an error.
    let blank = write_image(dir.path(), "blank.png");
    let result = engine.analyze(&blank).await;
    assert!(result.success);
    assert_eq!(result.full_text, "");
    assert!(result.labels.is_empty());
    assert_eq!(result.confidence, 0.0);

    // A failing invocation carries stderr.
    let crash = write_image(dir.path(), "crash.png");
    let result = engine.analyze(&crash).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Unknown format"));

    // Batch over all three keeps order and counts.
    let images = vec![words.clone(), crash.clone(), blank.clone()];
    let report = BatchRunner::new(Arc::new(engine)).with_workers(2).run(&images).await;
    assert_eq!(report.counts.total, 3);
    assert_eq!(report.counts.succeeded, 2);
    assert_eq!(report.counts.failed, 1);
    assert!(!report.results[1].success);
    assert_eq!(report.results[2].image_path, blank.display().to_string());
}
