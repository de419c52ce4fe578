//! Parallel processing of a directory of images.
//!
//! Every JPEG and PNG under the input directory is run through
//! [`pipeline::run`](crate::pipeline::run) on the rayon pool. Each image is
//! independent: its own bytes, its own raster, nothing shared but the
//! read-only config and backend.
//!
//! ## Output Structure
//!
//! Outputs land flat in the output directory, content addressed by the
//! SHA-256 of the encoded bytes:
//!
//! ```text
//! out/
//! ├── dawn-3f2a9c01b7de.jpg
//! ├── logo-e04c55a19b20.png
//! └── ...
//! ```
//!
//! Identical output bytes get identical names, so re-running a batch over
//! unchanged sources rewrites the same files.
//!
//! Per-image results stream back as [`BatchEvent`]s over an optional
//! `mpsc` channel while the batch is still running. A failing image is
//! reported and skipped; it does not stop the rest.

use crate::config::PipelineConfig;
use crate::imaging::{ImageBackend, OutputFormat, Quality};
use crate::pipeline::{self, CropRequest};
use crate::progress::{CancelToken, Reporter};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

/// Hex digits of the content hash kept in output names.
const HASH_PREFIX_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Progress of a running batch, one event per image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageProcessed {
        index: usize,
        source: PathBuf,
        output: PathBuf,
        original_bytes: u64,
        byte_size: u64,
        quality: Quality,
        met_budget: bool,
    },
    ImageFailed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    /// Processed images that only got a best-effort encode.
    pub over_budget: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

/// Every JPEG/PNG file under `dir`, recursively, sorted by path.
///
/// Matching is by extension; content is checked later by the pipeline.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// SHA-256 of `bytes`, returned as a hex string.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// `<stem>-<hash prefix>.<ext>` for an encoded output.
pub fn output_name(source: &Path, encoded: &[u8], format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let hash = content_hash(encoded);
    format!(
        "{}-{}.{}",
        stem,
        &hash[..HASH_PREFIX_LEN],
        format.extension()
    )
}

fn process_one(
    index: usize,
    source: &Path,
    output_dir: &Path,
    request: &CropRequest,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    cancel: &CancelToken,
) -> BatchEvent {
    let failed = |error: String| BatchEvent::ImageFailed {
        index,
        source: source.to_path_buf(),
        error,
    };

    let bytes = match std::fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) => return failed(e.to_string()),
    };
    let output = match pipeline::run(&bytes, request, config, backend, &Reporter::silent(), cancel)
    {
        Ok(output) => output,
        Err(e) => {
            log::warn!("{}: {e}", source.display());
            return failed(e.to_string());
        }
    };

    let result = output.result;
    let path = output_dir.join(output_name(source, result.buffer(), result.format()));
    if let Err(e) = std::fs::write(&path, result.buffer()) {
        return failed(e.to_string());
    }
    log::debug!("{} → {}", source.display(), path.display());

    BatchEvent::ImageProcessed {
        index,
        source: source.to_path_buf(),
        output: path,
        original_bytes: output.stats.original_bytes,
        byte_size: result.byte_size(),
        quality: result.quality_used(),
        met_budget: result.met_budget(),
    }
}

/// Process `inputs` in parallel, writing results into `output_dir`.
///
/// Events are sent as images finish, so their order follows completion, not
/// input order. The returned summary counts every image exactly once.
pub fn run_batch(
    inputs: &[PathBuf],
    output_dir: &Path,
    request: &CropRequest,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    events: Option<Sender<BatchEvent>>,
    cancel: &CancelToken,
) -> Result<BatchSummary, BatchError> {
    std::fs::create_dir_all(output_dir)?;
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: inputs.len(),
        })
        .ok();
    }
    log::info!(
        "processing {} images into {}",
        inputs.len(),
        output_dir.display()
    );

    let outcomes: Vec<BatchEvent> = inputs
        .par_iter()
        .enumerate()
        .map(|(i, source)| {
            let event = process_one(i + 1, source, output_dir, request, config, backend, cancel);
            if let Some(tx) = &events {
                tx.send(event.clone()).ok();
            }
            event
        })
        .collect();

    Ok(outcomes
        .iter()
        .fold(BatchSummary::default(), |mut summary, event| {
            match event {
                BatchEvent::ImageProcessed {
                    original_bytes,
                    byte_size,
                    met_budget,
                    ..
                } => {
                    summary.processed += 1;
                    summary.bytes_in += original_bytes;
                    summary.bytes_out += byte_size;
                    if !met_budget {
                        summary.over_budget += 1;
                    }
                }
                BatchEvent::ImageFailed { .. } => summary.failed += 1,
                BatchEvent::Started { .. } => {}
            }
            summary
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{synthetic_jpeg, synthetic_png};
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn setup_inputs() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("nested/deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join("a.jpg"), synthetic_jpeg(200, 150)).unwrap();
        fs::write(tmp.path().join("b.PNG"), synthetic_png(120, 120)).unwrap();
        fs::write(nested.join("c.jpeg"), synthetic_jpeg(300, 300)).unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignore me").unwrap();
        tmp
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    #[test]
    fn collect_inputs_walks_recursively_and_filters() {
        let tmp = setup_inputs();
        let inputs = collect_inputs(tmp.path()).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.jpeg"]);
    }

    #[test]
    fn collect_inputs_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            collect_inputs(&tmp.path().join("missing")),
            Err(BatchError::Walk(_))
        ));
    }

    // =========================================================================
    // Naming
    // =========================================================================

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn output_name_uses_stem_hash_and_format() {
        let name = output_name(Path::new("/in/dawn.jpeg"), b"", OutputFormat::Jpeg);
        assert_eq!(name, "dawn-e3b0c44298fc.jpg");
        let name = output_name(Path::new("logo.png"), b"", OutputFormat::Png);
        assert_eq!(name, "logo-e3b0c44298fc.png");
    }

    #[test]
    fn output_name_changes_with_content() {
        let a = output_name(Path::new("x.jpg"), b"one", OutputFormat::Jpeg);
        let b = output_name(Path::new("x.jpg"), b"two", OutputFormat::Jpeg);
        assert_ne!(a, b);
    }

    // =========================================================================
    // run_batch
    // =========================================================================

    #[test]
    fn batch_processes_every_input() {
        let input = setup_inputs();
        let out = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let inputs = collect_inputs(input.path()).unwrap();

        let summary = run_batch(
            &inputs,
            out.path(),
            &CropRequest::default(),
            &PipelineConfig::default(),
            &backend,
            None,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 0);
        let written: Vec<String> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written.len(), 3);
        assert!(written.iter().any(|n| n.starts_with("b-") && n.ends_with(".png")));
    }

    #[test]
    fn failing_image_is_reported_not_fatal() {
        let input = setup_inputs();
        fs::write(input.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
        let out = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let inputs = collect_inputs(input.path()).unwrap();
        let (tx, rx) = mpsc::channel();

        let summary = run_batch(
            &inputs,
            out.path(),
            &CropRequest::default(),
            &PipelineConfig::default(),
            &backend,
            Some(tx),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 1);
        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events[0], BatchEvent::Started { total: 4 });
        assert_eq!(events.len(), 5);
        assert!(events.iter().any(|e| matches!(
            e,
            BatchEvent::ImageFailed { source, .. } if source.ends_with("broken.jpg")
        )));
    }

    #[test]
    fn cancelled_batch_fails_every_image() {
        let input = setup_inputs();
        let out = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let inputs = collect_inputs(input.path()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let summary = run_batch(
            &inputs,
            out.path(),
            &CropRequest::default(),
            &PipelineConfig::default(),
            &backend,
            None,
            &cancel,
        )
        .unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed, 3);
    }
}
