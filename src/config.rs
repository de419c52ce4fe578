//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `fitcrop.toml`. Configuration is
//! layered: stock defaults, then the selected [`Preset`], then the user's
//! config file. Per-run overrides from the command line travel on the
//! request (see [`crate::pipeline::CropRequest`]) rather than through here.
//!
//! ## Config File Location
//!
//! `fitcrop` looks for `fitcrop.toml` in the working directory, or reads the
//! file named by `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [validation]
//! min_dimension = 100           # Smallest allowed side, source and crop
//! max_dimension = 10000         # Largest allowed side, source and crop
//! max_source_bytes = 52428800   # Uploads above this are rejected unread
//!
//! [extraction]
//! quality = 0.95                # JPEG quality of crop-only output
//!
//! [optimizer]
//! target_bytes = 5000000        # Byte budget for the final encode
//! initial_max_dimension = 4096  # First long-edge cap tried
//! dimension_ladder = [3600, 3200, 2800, 2400, 2000, 1800, 1600, 1400, 1200, 1000]
//! quality_ladder = [0.92, 0.88, 0.85, 0.82, 0.80, 0.78, 0.75, 0.72, 0.70]
//! fallback_dimension = 1000     # Used when nothing fits
//! fallback_quality = 0.70
//!
//! [processing]
//! max_processes = 4             # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [optimizer]
//! target_bytes = 2000000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OptimizerSettings, Quality, SizeBudget};
use crate::validate::DimensionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "fitcrop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `fitcrop.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source and crop bounds.
    pub validation: ValidationConfig,
    /// Crop-stage encoding.
    pub extraction: ExtractionConfig,
    /// Byte budget and search ladders.
    pub optimizer: OptimizerConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validation;
        if v.min_dimension == 0 {
            return Err(invalid("validation.min_dimension must be at least 1"));
        }
        if v.min_dimension > v.max_dimension {
            return Err(invalid(
                "validation.min_dimension must not exceed validation.max_dimension",
            ));
        }
        if v.max_source_bytes == 0 {
            return Err(invalid("validation.max_source_bytes must be non-zero"));
        }
        if !unit_interval(self.extraction.quality) {
            return Err(invalid("extraction.quality must be in (0, 1]"));
        }

        let o = &self.optimizer;
        if o.target_bytes == 0 {
            return Err(invalid("optimizer.target_bytes must be non-zero"));
        }
        if o.initial_max_dimension == 0 {
            return Err(invalid("optimizer.initial_max_dimension must be non-zero"));
        }
        if o.dimension_ladder.is_empty() || o.dimension_ladder.contains(&0) {
            return Err(invalid(
                "optimizer.dimension_ladder must be non-empty with non-zero entries",
            ));
        }
        if o.quality_ladder.is_empty() || !o.quality_ladder.iter().all(|&q| unit_interval(q)) {
            return Err(invalid(
                "optimizer.quality_ladder must be non-empty with values in (0, 1]",
            ));
        }
        if o.fallback_dimension == 0 {
            return Err(invalid("optimizer.fallback_dimension must be non-zero"));
        }
        if !unit_interval(o.fallback_quality) {
            return Err(invalid("optimizer.fallback_quality must be in (0, 1]"));
        }
        if self.processing.max_processes == Some(0) {
            return Err(invalid("processing.max_processes must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Validation(msg.to_string())
}

fn unit_interval(q: f32) -> bool {
    q > 0.0 && q <= 1.0
}

/// Dimension and upload-size limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub min_dimension: u32,
    pub max_dimension: u32,
    pub max_source_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let policy = DimensionPolicy::default();
        Self {
            min_dimension: policy.min_dimension,
            max_dimension: policy.max_dimension,
            max_source_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ValidationConfig {
    pub fn policy(&self) -> DimensionPolicy {
        DimensionPolicy {
            min_dimension: self.min_dimension,
            max_dimension: self.max_dimension,
        }
    }
}

/// Crop-stage encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// JPEG quality used when a lossy source is written after cropping.
    pub quality: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            quality: Quality::EXTRACTION.value(),
        }
    }
}

impl ExtractionConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Byte budget and search ladders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub target_bytes: u64,
    pub initial_max_dimension: u32,
    pub dimension_ladder: Vec<u32>,
    pub quality_ladder: Vec<f32>,
    pub fallback_dimension: u32,
    pub fallback_quality: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let settings = OptimizerSettings::default();
        Self {
            target_bytes: 5_000_000,
            initial_max_dimension: 4096,
            dimension_ladder: settings.dimension_ladder,
            quality_ladder: settings.quality_ladder,
            fallback_dimension: settings.fallback_dimension,
            fallback_quality: settings.fallback_quality,
        }
    }
}

impl OptimizerConfig {
    pub fn settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            dimension_ladder: self.dimension_ladder.clone(),
            quality_ladder: self.quality_ladder.clone(),
            fallback_dimension: self.fallback_dimension,
            fallback_quality: self.fallback_quality,
        }
    }

    pub fn budget(&self) -> Option<SizeBudget> {
        SizeBudget::new(self.target_bytes)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Presets
// =============================================================================

/// Named starting points for common output uses.
///
/// A preset sets the budget, the first long-edge cap and a short ladder
/// whose floor is also the fallback cap. It sits between the stock defaults
/// and the user's file, so the file can still override any of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Preset {
    /// Full-size photo asset, 5 MB.
    #[default]
    Asset,
    /// General web image, 1 MiB at up to 1024px.
    General,
    /// Wide header image, 2 MiB at up to 1200px.
    Banner,
    /// Logo, 1 MiB at up to 500px.
    Logo,
    /// Avatar, 512 KiB at up to 300px.
    Profile,
    /// Thumbnail, 100 KiB at up to 150px.
    Thumbnail,
}

impl Preset {
    fn overlay_toml(self) -> &'static str {
        match self {
            Preset::Asset => "",
            Preset::General => {
                r#"[optimizer]
target_bytes = 1048576
initial_max_dimension = 1024
dimension_ladder = [1024, 900, 800]
fallback_dimension = 800
"#
            }
            Preset::Banner => {
                r#"[optimizer]
target_bytes = 2097152
initial_max_dimension = 1200
dimension_ladder = [1200, 1000, 800]
fallback_dimension = 800
"#
            }
            Preset::Logo => {
                r#"[optimizer]
target_bytes = 1048576
initial_max_dimension = 500
dimension_ladder = [500, 400, 300]
fallback_dimension = 300
"#
            }
            Preset::Profile => {
                r#"[optimizer]
target_bytes = 524288
initial_max_dimension = 300
dimension_ladder = [300, 240, 200]
fallback_dimension = 200
"#
            }
            Preset::Thumbnail => {
                r#"[optimizer]
target_bytes = 102400
initial_max_dimension = 150
dimension_ladder = [150, 120, 100]
fallback_dimension = 100
"#
            }
        }
    }

    /// The preset's settings as a sparse TOML table.
    pub fn overlay(self) -> Result<toml::Value, ConfigError> {
        Ok(toml::from_str(self.overlay_toml())?)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. A missing file is an error.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `fitcrop.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `fitcrop.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_config_file(&config_path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults with a preset applied.
pub fn preset_base(preset: Preset) -> Result<toml::Value, ConfigError> {
    Ok(merge_toml(stock_defaults_value()?, preset.overlay()?))
}

/// Build the effective config for a run.
///
/// Layers, lowest first: stock defaults, `preset`, then either the file at
/// `explicit` or `fitcrop.toml` in `search_dir` if one exists.
pub fn load_config(
    preset: Preset,
    explicit: Option<&Path>,
    search_dir: &Path,
) -> Result<PipelineConfig, ConfigError> {
    let base = preset_base(preset)?;
    let overlay = match explicit {
        Some(path) => Some(read_config_file(path)?),
        None => load_raw_config(search_dir)?,
    };
    let config = resolve_config(base, overlay)?;
    log::debug!("resolved config: {config:?}");
    Ok(config)
}

/// Returns a fully-commented stock `fitcrop.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# fitcrop configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults (the "asset" preset).
#
# Layers, lowest first:
#   stock defaults -> --preset -> this file -> command-line flags
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Validation
# ---------------------------------------------------------------------------
[validation]
# Smallest and largest allowed side in pixels. Checked on the source and
# again on the cropped result.
min_dimension = 100
max_dimension = 10000

# Uploads larger than this many bytes are rejected before decoding (50 MiB).
max_source_bytes = 52428800

# ---------------------------------------------------------------------------
# Extraction (crop + rotate)
# ---------------------------------------------------------------------------
[extraction]
# JPEG quality of crop-only output for JPEG sources, in (0, 1].
# PNG sources are always written as PNG.
quality = 0.95

# ---------------------------------------------------------------------------
# Size-constrained optimizer
# ---------------------------------------------------------------------------
[optimizer]
# Byte budget for the final encode.
target_bytes = 5000000

# First long-edge cap tried. Never below the smallest ladder entry.
initial_max_dimension = 4096

# Long-edge caps tried after the first, largest first.
dimension_ladder = [3600, 3200, 2800, 2400, 2000, 1800, 1600, 1400, 1200, 1000]

# JPEG qualities tried at each cap, highest first, in (0, 1].
quality_ladder = [0.92, 0.88, 0.85, 0.82, 0.80, 0.78, 0.75, 0.72, 0.70]

# Used once when no cap/quality pair fits the budget.
fallback_dimension = 1000
fallback_quality = 0.70

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `fitcrop batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
