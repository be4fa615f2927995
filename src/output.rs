//! Writing analysis results to disk.
//!
//! `json` writes one pretty-printed file per image, named after the image's
//! path below the input root plus `.json` (`a/img.png` → `a/img.png.json`);
//! `jsonl` appends one compact line per image to a single `results.jsonl`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ocr::OcrResult;

/// Name of the combined JSONL output file.
pub const JSONL_FILENAME: &str = "results.jsonl";

/// Output format for result records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One pretty JSON file per image
    #[default]
    Json,
    /// One JSON line per image in a single results.jsonl
    Jsonl,
}

/// Serialized shape of one result.
#[derive(Debug, Serialize)]
pub struct ResultRecord<'a> {
    pub image: &'a str,
    pub engine: &'a str,
    pub success: bool,
    pub text: &'a str,
    pub labels: Vec<LabelRecord<'a>>,
    pub confidence: f32,
    pub error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct LabelRecord<'a> {
    pub name: &'a str,
    pub score: f32,
}

impl<'a> From<&'a OcrResult> for ResultRecord<'a> {
    fn from(result: &'a OcrResult) -> Self {
        Self {
            image: &result.image_path,
            engine: result.engine.as_str(),
            success: result.success,
            text: &result.full_text,
            labels: result
                .labels
                .iter()
                .map(|l| LabelRecord {
                    name: &l.name,
                    score: l.score,
                })
                .collect(),
            confidence: result.confidence,
            error: result.error.as_deref(),
        }
    }
}

/// Writes result records into an output directory.
pub struct ResultWriter {
    output_dir: PathBuf,
    input_root: Option<PathBuf>,
    jsonl: Option<BufWriter<File>>,
}

impl ResultWriter {
    /// Create the output directory if needed and open the JSONL stream for `jsonl`.
    pub fn create(output_dir: &Path, format: OutputFormat) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        let jsonl = match format {
            OutputFormat::Jsonl => Some(BufWriter::new(File::create(
                output_dir.join(JSONL_FILENAME),
            )?)),
            OutputFormat::Json => None,
        };

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            input_root: None,
            jsonl,
        })
    }

    /// Mirror image paths relative to `root` when naming per-image files.
    pub fn with_input_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.input_root = Some(root.into());
        self
    }

    /// Write one result.
    pub fn write(&mut self, result: &OcrResult) -> std::io::Result<()> {
        let record = ResultRecord::from(result);

        match self.jsonl.as_mut() {
            Some(stream) => {
                serde_json::to_writer(&mut *stream, &record)?;
                stream.write_all(b"\n")?;
            }
            None => {
                let path = self.json_path(&result.image_path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut file = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(&mut file, &record)?;
                file.flush()?;
            }
        }

        Ok(())
    }

    /// Write every result in order, then flush.
    pub fn write_all<'a>(
        &mut self,
        results: impl IntoIterator<Item = &'a OcrResult>,
    ) -> std::io::Result<()> {
        for result in results {
            self.write(result)?;
        }
        self.finish()
    }

    pub fn finish(&mut self) -> std::io::Result<()> {
        if let Some(stream) = self.jsonl.as_mut() {
            stream.flush()?;
        }
        Ok(())
    }

    /// Keeps the extension so `img.png` and `img.jpg` never share a file.
    fn json_path(&self, image_path: &str) -> PathBuf {
        let path = Path::new(image_path);
        let relative = self
            .input_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("result"));

        let mut name = relative.into_os_string();
        name.push(".json");
        self.output_dir.join(name)
    }
}
