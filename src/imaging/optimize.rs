//! Size-constrained optimizer.
//!
//! Finds the best-looking encode of a raster that fits a byte budget:
//!
//! 1. **Fast path**: encode at full fidelity in the source's own family
//!    (PNG for lossless, JPEG at 100 for lossy). If that fits, it wins and
//!    nothing is resampled.
//! 2. **Grid search**: walk a descending long-edge cap (outer) × descending
//!    JPEG quality (inner). The first cell that fits is returned. Each
//!    dimension is resampled once from the optimizer input, never from a
//!    previous cell's output.
//! 3. **Fallback**: nothing fit, so encode once more at the fallback cap
//!    and quality and return that result flagged as best effort.
//!
//! A cell whose encode fails is logged and skipped. The optimizer only
//! errors when every encode it tried failed, or when it was cancelled.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{dimension_sequence, fit_long_edge, quality_sequence};
use super::params::{Dimensions, OutputFormat, Quality};
use super::raster::RasterImage;
use crate::progress::{CancelToken, Phase, Progress, Reporter};
use crate::report::within_budget;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("every encode attempt failed: {0}")]
    EncodeFailed(String),
    #[error("optimization cancelled")]
    Cancelled,
}

/// Maximum number of encoded bytes an output may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SizeBudget(u64);

impl SizeBudget {
    /// `None` for a zero budget.
    pub fn new(target_bytes: u64) -> Option<Self> {
        (target_bytes > 0).then_some(Self(target_bytes))
    }

    pub fn target_bytes(self) -> u64 {
        self.0
    }

    pub fn admits(self, byte_size: u64) -> bool {
        within_budget(byte_size, self.0)
    }
}

/// Ladders and fallback used by the grid search.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    /// Long-edge caps in pixels, walked largest first.
    pub dimension_ladder: Vec<u32>,
    /// JPEG qualities, walked highest first.
    pub quality_ladder: Vec<f32>,
    pub fallback_dimension: u32,
    pub fallback_quality: f32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            dimension_ladder: vec![3600, 3200, 2800, 2400, 2000, 1800, 1600, 1400, 1200, 1000],
            quality_ladder: vec![0.92, 0.88, 0.85, 0.82, 0.80, 0.78, 0.75, 0.72, 0.70],
            fallback_dimension: 1000,
            fallback_quality: 0.70,
        }
    }
}

/// How the returned encode was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    FastPath,
    Search,
    Fallback,
}

/// Encoded output plus the parameters that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    #[serde(skip)]
    buffer: Vec<u8>,
    byte_size: u64,
    quality_used: Quality,
    max_dimension_used: u32,
    met_budget: bool,
    format: OutputFormat,
    #[serde(flatten)]
    dimensions: Dimensions,
    outcome: Outcome,
    attempts: usize,
}

impl OptimizationResult {
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn quality_used(&self) -> Quality {
        self.quality_used
    }

    pub fn max_dimension_used(&self) -> u32 {
        self.max_dimension_used
    }

    /// True exactly when the encode fits the budget it was searched for.
    pub fn met_budget(&self) -> bool {
        self.met_budget
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Grid cells encoded before this result was chosen.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

/// One `(long edge, quality)` pair of the search grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub index: usize,
    pub max_dimension: u32,
    pub quality: Quality,
}

/// Ordered search space: dimension outer, quality inner.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGrid {
    dimensions: Vec<u32>,
    qualities: Vec<Quality>,
}

impl SearchGrid {
    pub fn new(
        settings: &OptimizerSettings,
        initial_max_dimension: u32,
        image_long_edge: u32,
    ) -> Self {
        Self {
            dimensions: dimension_sequence(
                initial_max_dimension,
                &settings.dimension_ladder,
                image_long_edge,
            ),
            qualities: quality_sequence(&settings.quality_ladder),
        }
    }

    pub fn len(&self) -> usize {
        self.dimensions.len() * self.qualities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> &[u32] {
        &self.dimensions
    }

    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.dimensions
            .iter()
            .flat_map(move |&max_dimension| {
                self.qualities
                    .iter()
                    .map(move |&quality| (max_dimension, quality))
            })
            .enumerate()
            .map(|(index, (max_dimension, quality))| GridCell {
                index,
                max_dimension,
                quality,
            })
    }
}

/// Resamples the optimizer input to a long-edge cap, caching the last size
/// so consecutive cells at one dimension share a single resample.
struct Resampler<'a> {
    source: &'a DynamicImage,
    cached: Option<(u32, DynamicImage)>,
}

impl<'a> Resampler<'a> {
    fn new(source: &'a DynamicImage) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    fn at(&mut self, max_dimension: u32) -> &DynamicImage {
        let dims = Dimensions::new(self.source.width(), self.source.height());
        if max_dimension >= dims.long_edge() {
            return self.source;
        }
        if self.cached.as_ref().is_none_or(|(cap, _)| *cap != max_dimension) {
            let target = fit_long_edge(dims, max_dimension);
            log::debug!("resampling {} → {}", dims, target);
            let resized =
                self.source
                    .resize_exact(target.width, target.height, FilterType::Lanczos3);
            self.cached = Some((max_dimension, resized));
        }
        match &self.cached {
            Some((_, image)) => image,
            None => self.source,
        }
    }
}

/// Smallest successful encode seen, kept in case the fallback fails.
struct Encoded {
    bytes: Vec<u8>,
    format: OutputFormat,
    max_dimension: u32,
    quality: Quality,
    dimensions: Dimensions,
}

/// Runs the fast path, grid search and fallback against one backend.
pub struct Optimizer<'a, B: ImageBackend> {
    backend: &'a B,
    settings: &'a OptimizerSettings,
    progress: &'a Reporter<'a>,
    cancel: CancelToken,
}

impl<'a, B: ImageBackend> Optimizer<'a, B> {
    pub fn new(backend: &'a B, settings: &'a OptimizerSettings, progress: &'a Reporter<'a>) -> Self {
        Self {
            backend,
            settings,
            progress,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Encode `image` so that it fits `budget`, starting the dimension
    /// search at `initial_max_dimension`.
    pub fn optimize(
        &self,
        image: &RasterImage,
        budget: SizeBudget,
        initial_max_dimension: u32,
    ) -> Result<OptimizationResult, OptimizeError> {
        let source_dims = image.dimensions();
        let mut last_error: Option<BackendError> = None;

        if self.cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }
        self.progress.report(Progress::start(Phase::Search));

        let native = image.encoding().native_format();
        let mut smallest: Option<Encoded> = None;
        match self.backend.encode(image.pixels(), native, Quality::FULL) {
            Ok(bytes) if budget.admits(bytes.len() as u64) => {
                log::debug!(
                    "fast path: {} bytes as {:?} fits {}",
                    bytes.len(),
                    native,
                    budget.target_bytes()
                );
                self.progress.complete();
                return Ok(OptimizationResult {
                    byte_size: bytes.len() as u64,
                    buffer: bytes,
                    quality_used: Quality::FULL,
                    max_dimension_used: source_dims.long_edge(),
                    met_budget: true,
                    format: native,
                    dimensions: source_dims,
                    outcome: Outcome::FastPath,
                    attempts: 0,
                });
            }
            Ok(bytes) => {
                log::debug!(
                    "fast path: {} bytes exceeds {}",
                    bytes.len(),
                    budget.target_bytes()
                );
                smallest = Some(Encoded {
                    bytes,
                    format: native,
                    max_dimension: source_dims.long_edge(),
                    quality: Quality::FULL,
                    dimensions: source_dims,
                });
            }
            Err(err) => {
                log::warn!("fast path encode failed: {err}");
                last_error = Some(err);
            }
        }

        let grid = SearchGrid::new(self.settings, initial_max_dimension, source_dims.long_edge());
        let total = grid.len().max(1) as f64;
        let mut resampler = Resampler::new(image.pixels());

        let found = grid.cells().find_map(|cell| {
            if self.cancel.is_cancelled() {
                return Some(Err(OptimizeError::Cancelled));
            }
            let pixels = resampler.at(cell.max_dimension);
            let dims = Dimensions::new(pixels.width(), pixels.height());
            let attempt = self.backend.encode(pixels, OutputFormat::Jpeg, cell.quality);
            self.progress.report(Progress::new(
                Phase::Search,
                (cell.index + 1) as f64 / total,
            ));

            let bytes = match attempt {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!(
                        "encode at {}px q{} failed: {err}",
                        cell.max_dimension,
                        cell.quality.percent()
                    );
                    last_error = Some(err);
                    return None;
                }
            };
            let size = bytes.len() as u64;
            log::debug!(
                "cell {}: {} q{} → {} bytes",
                cell.index,
                dims,
                cell.quality.percent(),
                size
            );

            if budget.admits(size) {
                return Some(Ok(OptimizationResult {
                    byte_size: size,
                    buffer: bytes,
                    quality_used: cell.quality,
                    max_dimension_used: cell.max_dimension,
                    met_budget: true,
                    format: OutputFormat::Jpeg,
                    dimensions: dims,
                    outcome: Outcome::Search,
                    attempts: cell.index + 1,
                }));
            }
            if smallest.as_ref().is_none_or(|s| bytes.len() < s.bytes.len()) {
                smallest = Some(Encoded {
                    bytes,
                    format: OutputFormat::Jpeg,
                    max_dimension: cell.max_dimension,
                    quality: cell.quality,
                    dimensions: dims,
                });
            }
            None
        });

        if let Some(result) = found {
            if result.is_ok() {
                self.progress.complete();
            }
            return result;
        }

        self.fallback(image, &grid, smallest, last_error)
    }

    fn fallback(
        &self,
        image: &RasterImage,
        grid: &SearchGrid,
        smallest: Option<Encoded>,
        last_error: Option<BackendError>,
    ) -> Result<OptimizationResult, OptimizeError> {
        if self.cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }
        self.progress.report(Progress::start(Phase::Fallback));

        let quality = Quality::new(self.settings.fallback_quality);
        let max_dimension = self
            .settings
            .fallback_dimension
            .max(1)
            .min(image.dimensions().long_edge());
        let mut resampler = Resampler::new(image.pixels());
        let pixels = resampler.at(max_dimension);
        let dims = Dimensions::new(pixels.width(), pixels.height());
        log::info!(
            "no grid cell fit, falling back to {}px q{}",
            max_dimension,
            quality.percent()
        );

        let encoded = match self.backend.encode(pixels, OutputFormat::Jpeg, quality) {
            Ok(bytes) => Encoded {
                bytes,
                format: OutputFormat::Jpeg,
                max_dimension,
                quality,
                dimensions: dims,
            },
            Err(err) => {
                log::warn!("fallback encode failed: {err}");
                match smallest {
                    Some(encoded) => encoded,
                    None => {
                        let reason = last_error.unwrap_or(err);
                        return Err(OptimizeError::EncodeFailed(reason.to_string()));
                    }
                }
            }
        };

        self.progress.complete();
        Ok(OptimizationResult {
            byte_size: encoded.bytes.len() as u64,
            buffer: encoded.bytes,
            quality_used: encoded.quality,
            max_dimension_used: encoded.max_dimension,
            met_budget: false,
            format: encoded.format,
            dimensions: encoded.dimensions,
            outcome: Outcome::Fallback,
            attempts: grid.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::progress::{ProgressEvent, ProgressPlan};
    use crate::test_helpers::{gradient_image, lossless_raster, lossy_raster};
    use std::sync::Mutex;

    /// Roughly photo-like: a sixth of a byte per pixel at full quality.
    fn photo_size(w: u32, h: u32, format: OutputFormat, quality: Quality) -> usize {
        let pixels = w as usize * h as usize;
        match format {
            OutputFormat::Png => pixels * 3,
            OutputFormat::Jpeg => pixels * usize::from(quality.percent()) / 600,
        }
    }

    fn budget(bytes: u64) -> SizeBudget {
        SizeBudget::new(bytes).unwrap()
    }

    fn run(
        backend: &MockBackend,
        image: &RasterImage,
        target: u64,
        initial: u32,
    ) -> Result<OptimizationResult, OptimizeError> {
        let settings = OptimizerSettings::default();
        let progress = Reporter::silent();
        Optimizer::new(backend, &settings, &progress).optimize(image, budget(target), initial)
    }

    // =========================================================================
    // SizeBudget / SearchGrid tests
    // =========================================================================

    #[test]
    fn zero_budget_is_rejected() {
        assert_eq!(SizeBudget::new(0), None);
        assert!(budget(10).admits(10));
        assert!(!budget(10).admits(11));
    }

    #[test]
    fn grid_walks_dimension_outer_quality_inner() {
        let settings = OptimizerSettings {
            dimension_ladder: vec![800, 600],
            quality_ladder: vec![0.9, 0.8],
            ..OptimizerSettings::default()
        };
        let grid = SearchGrid::new(&settings, 800, 4000);
        let cells: Vec<(u32, u8)> = grid
            .cells()
            .map(|c| (c.max_dimension, c.quality.percent()))
            .collect();
        assert_eq!(cells, vec![(800, 90), (800, 80), (600, 90), (600, 80)]);
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn grid_never_upscales() {
        let grid = SearchGrid::new(&OptimizerSettings::default(), 4096, 2000);
        assert_eq!(grid.dimensions(), &[2000, 1800, 1600, 1400, 1200, 1000]);
    }

    // =========================================================================
    // Fast path tests
    // =========================================================================

    #[test]
    fn fast_path_skips_resampling() {
        let backend = MockBackend::new();
        let image = lossless_raster(gradient_image(100, 100));
        let result = run(&backend, &image, 1_000_000, 4096).unwrap();

        assert_eq!(result.outcome(), Outcome::FastPath);
        assert_eq!(result.format(), OutputFormat::Png);
        assert_eq!(result.quality_used(), Quality::FULL);
        assert_eq!(result.dimensions(), Dimensions::new(100, 100));
        assert!(result.met_budget());
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                width: 100,
                height: 100,
                format: OutputFormat::Png,
                quality: 100,
            }]
        );
    }

    #[test]
    fn fast_path_for_lossy_is_full_quality_jpeg() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(50, 40));
        let result = run(&backend, &image, 2_000, 4096).unwrap();
        assert_eq!(result.outcome(), Outcome::FastPath);
        assert_eq!(result.format(), OutputFormat::Jpeg);
        assert_eq!(backend.encodes(), vec![(50, 40, 100)]);
    }

    // =========================================================================
    // Grid search tests
    // =========================================================================

    #[test]
    fn photo_fits_at_first_cell() {
        let backend = MockBackend::with_size_model(photo_size);
        let image = lossy_raster(gradient_image(2000, 1500));
        // Full quality is 500_000 bytes, q92 is 460_000.
        let result = run(&backend, &image, 480_000, 4096).unwrap();

        assert_eq!(result.outcome(), Outcome::Search);
        assert_eq!(result.max_dimension_used(), 2000);
        assert_eq!(result.quality_used().percent(), 92);
        assert_eq!(result.dimensions(), Dimensions::new(2000, 1500));
        assert_eq!(result.attempts(), 1);
        assert!(result.byte_size() <= 480_000);
    }

    #[test]
    fn search_descends_quality_before_dimension() {
        // 100×100 JPEG: size == quality percent × 100 bytes.
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(100, 100));
        let settings = OptimizerSettings {
            dimension_ladder: vec![100, 50],
            quality_ladder: vec![0.9, 0.8, 0.7],
            fallback_dimension: 50,
            fallback_quality: 0.7,
        };
        let progress = Reporter::silent();
        let result = Optimizer::new(&backend, &settings, &progress)
            .optimize(&image, budget(8_000), 100)
            .unwrap();

        assert_eq!(result.max_dimension_used(), 100);
        assert_eq!(result.quality_used().percent(), 80);
        assert_eq!(
            backend.encodes(),
            vec![(100, 100, 100), (100, 100, 90), (100, 100, 80)]
        );
    }

    #[test]
    fn each_dimension_resamples_from_the_input() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(400, 300));
        let settings = OptimizerSettings {
            dimension_ladder: vec![400, 200, 100],
            quality_ladder: vec![0.9],
            fallback_dimension: 100,
            fallback_quality: 0.9,
        };
        let progress = Reporter::silent();
        // 100×75 at q90 = 6750 bytes.
        let result = Optimizer::new(&backend, &settings, &progress)
            .optimize(&image, budget(7_000), 400)
            .unwrap();

        assert_eq!(result.dimensions(), Dimensions::new(100, 75));
        assert_eq!(
            backend.encodes(),
            vec![(400, 300, 100), (400, 300, 90), (200, 150, 90), (100, 75, 90)]
        );
    }

    #[test]
    fn budget_is_never_exceeded_when_met() {
        let backend = MockBackend::with_size_model(photo_size);
        let image = lossy_raster(gradient_image(1600, 1200));
        for target in [50_000, 120_000, 200_000, 400_000] {
            let result = run(&backend, &image, target, 4096).unwrap();
            if result.met_budget() {
                assert!(result.byte_size() <= target);
            }
        }
    }

    #[test]
    fn larger_budget_never_picks_a_worse_cell() {
        let backend = MockBackend::with_size_model(photo_size);
        let image = lossy_raster(gradient_image(1600, 1200));
        let small = run(&backend, &image, 100_000, 4096).unwrap();
        let large = run(&backend, &image, 200_000, 4096).unwrap();
        assert!(large.max_dimension_used() >= small.max_dimension_used());
        if large.max_dimension_used() == small.max_dimension_used() {
            assert!(large.quality_used() >= small.quality_used());
        }
    }

    // =========================================================================
    // Fallback / failure tests
    // =========================================================================

    #[test]
    fn unreachable_budget_falls_back() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(2000, 1500));
        let result = run(&backend, &image, 1_000, 4096).unwrap();

        assert_eq!(result.outcome(), Outcome::Fallback);
        assert!(!result.met_budget());
        assert_eq!(result.max_dimension_used(), 1000);
        assert_eq!(result.quality_used().percent(), 70);
        assert_eq!(result.dimensions(), Dimensions::new(1000, 750));
        assert!(result.byte_size() > 1_000);
    }

    #[test]
    fn failing_cells_are_skipped() {
        let backend = MockBackend::new().failing_when(|_, _, _, q| q.percent() == 90);
        let image = lossy_raster(gradient_image(100, 100));
        let settings = OptimizerSettings {
            dimension_ladder: vec![100],
            quality_ladder: vec![0.9, 0.8],
            fallback_dimension: 100,
            fallback_quality: 0.5,
        };
        let progress = Reporter::silent();
        let result = Optimizer::new(&backend, &settings, &progress)
            .optimize(&image, budget(9_000), 100)
            .unwrap();
        assert_eq!(result.quality_used().percent(), 80);
        assert!(result.met_budget());
    }

    #[test]
    fn failed_fallback_returns_smallest_attempt() {
        let backend = MockBackend::new().failing_when(|_, _, _, q| q.percent() == 50);
        let image = lossy_raster(gradient_image(100, 100));
        let settings = OptimizerSettings {
            dimension_ladder: vec![100],
            quality_ladder: vec![0.9, 0.8],
            fallback_dimension: 100,
            fallback_quality: 0.5,
        };
        let progress = Reporter::silent();
        let result = Optimizer::new(&backend, &settings, &progress)
            .optimize(&image, budget(10), 100)
            .unwrap();
        assert_eq!(result.outcome(), Outcome::Fallback);
        assert_eq!(result.quality_used().percent(), 80);
        assert_eq!(result.byte_size(), 8_000);
    }

    #[test]
    fn over_budget_fast_path_survives_failed_search() {
        let backend = MockBackend::new().failing_when(|_, _, _, q| q.percent() < 100);
        let image = lossy_raster(gradient_image(100, 100));
        let result = run(&backend, &image, 10, 4096).unwrap();

        assert_eq!(result.outcome(), Outcome::Fallback);
        assert!(!result.met_budget());
        assert_eq!(result.format(), OutputFormat::Jpeg);
        assert_eq!(result.quality_used(), Quality::FULL);
        assert_eq!(result.byte_size(), 10_000);
    }

    #[test]
    fn over_budget_png_fast_path_keeps_its_format() {
        let backend = MockBackend::new().failing_when(|_, _, format, _| format == OutputFormat::Jpeg);
        let image = lossless_raster(gradient_image(50, 40));
        let result = run(&backend, &image, 10, 4096).unwrap();

        assert_eq!(result.format(), OutputFormat::Png);
        assert_eq!(result.dimensions(), Dimensions::new(50, 40));
        assert_eq!(result.byte_size(), 6_000);
    }

    #[test]
    fn all_encodes_failing_is_an_error() {
        let backend = MockBackend::new().failing_when(|_, _, _, _| true);
        let image = lossy_raster(gradient_image(64, 64));
        let result = run(&backend, &image, 1_000, 4096);
        assert!(matches!(result, Err(OptimizeError::EncodeFailed(_))));
    }

    #[test]
    fn cancelled_before_start() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(64, 64));
        let settings = OptimizerSettings::default();
        let progress = Reporter::silent();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = Optimizer::new(&backend, &settings, &progress)
            .with_cancel(cancel)
            .optimize(&image, budget(1), 4096);
        assert_eq!(result.unwrap_err(), OptimizeError::Cancelled);
        assert!(backend.encodes().is_empty());
    }

    #[test]
    fn cancel_from_progress_stops_between_cells() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(200, 200));
        let settings = OptimizerSettings::default();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let sink = move |event: ProgressEvent| {
            if event.phase == Phase::Search && event.percent > 0.0 {
                trigger.cancel();
            }
        };
        let progress = Reporter::new(ProgressPlan::optimizer(), &sink);
        let result = Optimizer::new(&backend, &settings, &progress)
            .with_cancel(cancel)
            .optimize(&image, budget(1), 4096);

        assert_eq!(result.unwrap_err(), OptimizeError::Cancelled);
        // Fast path plus exactly one grid cell.
        assert_eq!(backend.encodes().len(), 2);
    }

    #[test]
    fn progress_is_monotonic_and_finishes_at_100() {
        let backend = MockBackend::new();
        let image = lossy_raster(gradient_image(300, 300));
        let settings = OptimizerSettings::default();
        let seen = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| seen.lock().unwrap().push(event.percent);
        let progress = Reporter::new(ProgressPlan::optimizer(), &sink);
        Optimizer::new(&backend, &settings, &progress)
            .optimize(&image, budget(1), 4096)
            .unwrap();

        let percents = seen.into_inner().unwrap();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(percents.last().copied(), Some(100.0));
        assert!(percents.iter().any(|&p| p == 95.0));
    }
}
