//! End-to-end processing of one encoded image.
//!
//! ```text
//! bytes ─▶ validate_source ─▶ identify ─▶ validate ─▶ decode
//!       ─▶ extract (crop + rotate) ─▶ validate ─▶ optimize ─▶ PipelineOutput
//! ```
//!
//! Stages run strictly in sequence and hand the raster along by value. The
//! validator and extractor fail fast; the optimizer absorbs per-encode
//! failures on its own. Cancellation is checked between stages and, inside
//! the optimizer, between grid cells.

use crate::config::PipelineConfig;
use crate::imaging::{
    BackendError, CropRect, Dimensions, ExtractError, ImageBackend, OptimizationResult,
    OptimizeError, Optimizer, OutputFormat, RasterImage, SizeBudget, SourceEncoding, crop_space,
    encode_extracted, extract,
};
use crate::progress::{CancelToken, Phase, Progress, Reporter};
use crate::report::{CompressionStats, QualityTier};
use crate::validate::{ValidationError, validate, validate_source};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Optimize(OptimizeError),
    #[error("target size must be greater than zero")]
    InvalidBudget,
    #[error("processing cancelled")]
    Cancelled,
}

impl From<OptimizeError> for PipelineError {
    fn from(err: OptimizeError) -> Self {
        match err {
            OptimizeError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Optimize(other),
        }
    }
}

/// What to cut out and how small to make it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropRequest {
    /// Crop in rotated-canvas pixels. `None` keeps the whole canvas.
    pub crop: Option<CropRect>,
    pub rotation_degrees: f64,
    /// Overrides `optimizer.target_bytes`.
    pub target_bytes: Option<u64>,
    /// Overrides `optimizer.initial_max_dimension`.
    pub initial_max_dimension: Option<u32>,
}

impl CropRequest {
    fn crop_for(&self, source: Dimensions) -> CropRect {
        self.crop
            .unwrap_or_else(|| CropRect::full(crop_space(source, self.rotation_degrees)))
    }
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub result: OptimizationResult,
    pub source_dimensions: Dimensions,
    pub cropped_dimensions: Dimensions,
    pub stats: CompressionStats,
    pub tier: QualityTier,
}

/// Result of a crop-only run: the extracted raster at crop-stage fidelity.
#[derive(Debug, Clone, Serialize)]
pub struct CropOutput {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub source_dimensions: Dimensions,
    pub cropped_dimensions: Dimensions,
    pub stats: CompressionStats,
}

/// Header-level facts about a source that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceInfo {
    pub byte_size: u64,
    pub encoding: SourceEncoding,
    pub dimensions: Dimensions,
}

fn check_cancel(cancel: &CancelToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Validate a source without decoding its pixels.
pub fn inspect(
    source: &[u8],
    config: &PipelineConfig,
    backend: &impl ImageBackend,
) -> Result<SourceInfo, PipelineError> {
    validate_source(source, config.validation.max_source_bytes)?;
    let identified = backend.identify(source)?;
    validate(identified.dimensions, &config.validation.policy())?;
    Ok(SourceInfo {
        byte_size: source.len() as u64,
        encoding: identified.encoding,
        dimensions: identified.dimensions,
    })
}

/// Validate, decode, extract and validate the crop.
fn extract_stage(
    source: &[u8],
    request: &CropRequest,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    progress: &Reporter,
    cancel: &CancelToken,
) -> Result<(SourceInfo, RasterImage), PipelineError> {
    progress.report(Progress::start(Phase::Validate));
    let info = inspect(source, config, backend)?;
    log::info!(
        "validated {} source, {} ({} bytes)",
        match info.encoding {
            SourceEncoding::Lossless => "PNG",
            SourceEncoding::Lossy => "JPEG",
        },
        info.dimensions,
        info.byte_size
    );
    progress.report(Progress::new(Phase::Validate, 1.0));

    check_cancel(cancel)?;
    let raster = backend.decode(source)?;
    progress.report(Progress::new(Phase::Extract, 0.25));

    let crop = request.crop_for(raster.dimensions());
    let extracted = extract(raster, &crop, request.rotation_degrees)?;
    validate(extracted.dimensions(), &config.validation.policy())?;
    log::info!(
        "extracted {} at {}°",
        extracted.dimensions(),
        request.rotation_degrees
    );
    progress.report(Progress::new(Phase::Extract, 1.0));
    Ok((info, extracted))
}

/// Run the whole pipeline on one encoded image.
pub fn run(
    source: &[u8],
    request: &CropRequest,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    progress: &Reporter,
    cancel: &CancelToken,
) -> Result<PipelineOutput, PipelineError> {
    let budget = SizeBudget::new(request.target_bytes.unwrap_or(config.optimizer.target_bytes))
        .ok_or(PipelineError::InvalidBudget)?;
    let initial_max_dimension = request
        .initial_max_dimension
        .unwrap_or(config.optimizer.initial_max_dimension);

    let (info, extracted) = extract_stage(source, request, config, backend, progress, cancel)?;
    check_cancel(cancel)?;

    let settings = config.optimizer.settings();
    let result = Optimizer::new(backend, &settings, progress)
        .with_cancel(cancel.clone())
        .optimize(&extracted, budget, initial_max_dimension)?;
    log::info!(
        "encoded {} {:?} at q{} in {} bytes (budget {}, met: {})",
        result.dimensions(),
        result.format(),
        result.quality_used().percent(),
        result.byte_size(),
        budget.target_bytes(),
        result.met_budget()
    );

    let stats = CompressionStats::new(info.byte_size, result.byte_size());
    let tier = QualityTier::from_quality(result.quality_used());
    Ok(PipelineOutput {
        source_dimensions: info.dimensions,
        cropped_dimensions: extracted.dimensions(),
        stats,
        tier,
        result,
    })
}

/// Crop and rotate only, encoding at crop-stage fidelity.
///
/// PNG sources stay PNG; JPEG sources are written at `extraction.quality`.
pub fn crop_only(
    source: &[u8],
    request: &CropRequest,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    progress: &Reporter,
    cancel: &CancelToken,
) -> Result<CropOutput, PipelineError> {
    let (info, extracted) = extract_stage(source, request, config, backend, progress, cancel)?;
    check_cancel(cancel)?;
    let (bytes, format) = encode_extracted(backend, &extracted, config.extraction.quality())?;
    progress.complete();
    Ok(CropOutput {
        stats: CompressionStats::new(info.byte_size, bytes.len() as u64),
        bytes,
        format,
        source_dimensions: info.dimensions,
        cropped_dimensions: extracted.dimensions(),
    })
}
