//! Source and dimension validation.
//!
//! Two gates:
//!
//! - [`validate_source`] runs on the encoded buffer before anything is
//!   decoded: it must be non-empty, within the byte limit, and JPEG or PNG.
//! - [`validate`] runs on dimensions, once for the source and once more for
//!   the cropped result, against the same [`DimensionPolicy`].
//!
//! Both are pure and fail fast.

use crate::imaging::{Dimensions, SourceEncoding, sniff_encoding};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("image too small: {width}×{height}px, minimum is {min}px per side")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("image too large: {width}×{height}px, maximum is {max}px per side")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("source is empty")]
    EmptySource,
    #[error("source is {size} bytes, limit is {max} bytes")]
    SourceTooLarge { size: u64, max: u64 },
}

/// Inclusive per-side pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionPolicy {
    pub min_dimension: u32,
    pub max_dimension: u32,
}

impl Default for DimensionPolicy {
    fn default() -> Self {
        Self {
            min_dimension: 100,
            max_dimension: 10_000,
        }
    }
}

/// Check both sides of `dims` against `policy`. Too small wins over too large.
pub fn validate(dims: Dimensions, policy: &DimensionPolicy) -> Result<(), ValidationError> {
    if dims.width < policy.min_dimension || dims.height < policy.min_dimension {
        return Err(ValidationError::TooSmall {
            width: dims.width,
            height: dims.height,
            min: policy.min_dimension,
        });
    }
    if dims.width > policy.max_dimension || dims.height > policy.max_dimension {
        return Err(ValidationError::TooLarge {
            width: dims.width,
            height: dims.height,
            max: policy.max_dimension,
        });
    }
    Ok(())
}

/// Check an encoded buffer before decoding and report its encoding family.
pub fn validate_source(bytes: &[u8], max_source_bytes: u64) -> Result<SourceEncoding, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptySource);
    }
    let size = bytes.len() as u64;
    if size > max_source_bytes {
        return Err(ValidationError::SourceTooLarge {
            size,
            max: max_source_bytes,
        });
    }
    sniff_encoding(bytes).ok_or(ValidationError::UnsupportedFormat)
}
