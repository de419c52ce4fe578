//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so the
//! layout is unit tested without capturing stdout. The `print_*` wrappers
//! write those lines to stdout. Progress is the exception: it goes to
//! stderr so stdout stays clean for the report (or the JSON).
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! photo.jpg → photo-small.jpg
//!     Source: 4000×3000, 2.31 MB
//!     Cropped: 2000×1500
//!     Output: JPEG 2000×1500, 466.8 KB (budget 488.28 KB, met)
//!     Quality: 0.92 (High)
//!     Saved: 1.85 MB (80.3%)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Batch (3 images)
//!     001 a.jpg → a-3f2a9c01b7de.jpg (412.5 KB, q0.88)
//!     002 b.png → b-e04c55a19b20.png (96.1 KB, q1.00)
//!     003 c.jpg: image too small: 80×60px, minimum is 100px per side
//! 2 processed, 1 failed, 0 over budget
//! ```

use crate::batch::{BatchEvent, BatchSummary};
use crate::imaging::{Dimensions, OutputFormat, SourceEncoding};
use crate::pipeline::{CropOutput, PipelineOutput, SourceInfo};
use crate::progress::ProgressEvent;
use crate::report::{CompressionStats, format_file_size};
use std::path::Path;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Zero-padded three-digit index.
fn format_index(index: usize) -> String {
    format!("{:03}", index)
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => "JPEG",
        OutputFormat::Png => "PNG",
    }
}

fn saved_line(stats: &CompressionStats) -> String {
    if stats.bytes_saved >= 0 {
        format!(
            "    Saved: {} ({}%)",
            format_file_size(stats.bytes_saved.unsigned_abs()),
            stats.reduction_percent
        )
    } else {
        format!(
            "    Grew: {} ({}%)",
            format_file_size(stats.bytes_saved.unsigned_abs()),
            -stats.reduction_percent
        )
    }
}

fn source_line(dimensions: Dimensions, bytes: u64) -> String {
    format!("    Source: {}, {}", dimensions, format_file_size(bytes))
}

// ============================================================================
// Single image
// ============================================================================

/// Format the report for a full `process` run.
pub fn format_report(output: &PipelineOutput, input: &Path, written: &Path, budget: u64) -> Vec<String> {
    let result = &output.result;
    vec![
        format!("{} \u{2192} {}", file_name(input), file_name(written)),
        source_line(output.source_dimensions, output.stats.original_bytes),
        format!("    Cropped: {}", output.cropped_dimensions),
        format!(
            "    Output: {} {}, {} (budget {}, {})",
            format_name(result.format()),
            result.dimensions(),
            format_file_size(result.byte_size()),
            format_file_size(budget),
            if result.met_budget() { "met" } else { "best effort" }
        ),
        format!("    Quality: {} ({})", result.quality_used(), output.tier),
        saved_line(&output.stats),
    ]
}

/// Print the `process` report to stdout.
pub fn print_report(output: &PipelineOutput, input: &Path, written: &Path, budget: u64) {
    for line in format_report(output, input, written, budget) {
        println!("{}", line);
    }
}

/// Format the report for a crop-only run.
pub fn format_crop_report(output: &CropOutput, input: &Path, written: &Path) -> Vec<String> {
    vec![
        format!("{} \u{2192} {}", file_name(input), file_name(written)),
        source_line(output.source_dimensions, output.stats.original_bytes),
        format!(
            "    Cropped: {} {}, {}",
            format_name(output.format),
            output.cropped_dimensions,
            format_file_size(output.bytes.len() as u64)
        ),
    ]
}

pub fn print_crop_report(output: &CropOutput, input: &Path, written: &Path) {
    for line in format_crop_report(output, input, written) {
        println!("{}", line);
    }
}

/// Format the `check` result for a source that passed validation.
pub fn format_check(info: &SourceInfo, input: &Path) -> Vec<String> {
    let kind = match info.encoding {
        SourceEncoding::Lossless => "PNG (lossless)",
        SourceEncoding::Lossy => "JPEG (lossy)",
    };
    vec![
        file_name(input),
        format!("    Format: {}", kind),
        source_line(info.dimensions, info.byte_size),
        "    Valid".to_string(),
    ]
}

pub fn print_check(info: &SourceInfo, input: &Path) {
    for line in format_check(info, input) {
        println!("{}", line);
    }
}

// ============================================================================
// Progress
// ============================================================================

/// One progress line, e.g. `[ 42%] optimizing`.
pub fn format_progress(event: &ProgressEvent) -> String {
    format!("[{:>3.0}%] {}", event.percent, event.phase.label())
}

/// Write a progress line to stderr.
pub fn print_progress(event: &ProgressEvent) {
    eprintln!("{}", format_progress(event));
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Batch ({} images)", total)],
        BatchEvent::ImageProcessed {
            index,
            source,
            output,
            byte_size,
            quality,
            met_budget,
            ..
        } => {
            let mut line = format!(
                "    {} {} \u{2192} {} ({}, q{})",
                format_index(*index),
                file_name(source),
                file_name(output),
                format_file_size(*byte_size),
                quality
            );
            if !met_budget {
                line.push_str(" over budget");
            }
            vec![line]
        }
        BatchEvent::ImageFailed {
            index,
            source,
            error,
        } => vec![format!(
            "    {} {}: {}",
            format_index(*index),
            file_name(source),
            error
        )],
    }
}

/// Format the closing summary of a batch.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} processed, {} failed, {} over budget",
        summary.processed, summary.failed, summary.over_budget
    )];
    if summary.processed > 0 {
        let stats = CompressionStats::new(summary.bytes_in, summary.bytes_out);
        lines.push(format!(
            "    {} \u{2192} {}",
            format_file_size(summary.bytes_in),
            format_file_size(summary.bytes_out)
        ));
        lines.push(saved_line(&stats));
    }
    lines
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}
