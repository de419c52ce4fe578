//! Compression statistics and the quality tier shown to users.

use crate::imaging::Quality;
use serde::Serialize;
use std::fmt;

/// Size comparison between the original upload and the final encode.
///
/// `bytes_saved` is negative when the output grew.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_bytes: u64,
    pub final_bytes: u64,
    pub bytes_saved: i64,
    pub reduction_percent: f64,
}

impl CompressionStats {
    pub fn new(original_bytes: u64, final_bytes: u64) -> Self {
        let bytes_saved = original_bytes as i64 - final_bytes as i64;
        let reduction_percent = if original_bytes == 0 {
            0.0
        } else {
            round2(bytes_saved as f64 / original_bytes as f64 * 100.0)
        };
        Self {
            original_bytes,
            final_bytes,
            bytes_saved,
            reduction_percent,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coarse label for the quality an output was encoded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub fn from_quality(quality: Quality) -> Self {
        let q = quality.value();
        if q >= 0.85 {
            QualityTier::High
        } else if q >= 0.70 {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityTier::High => "High",
            QualityTier::Medium => "Medium",
            QualityTier::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Human readable size on a 1024 base, e.g. `"1.5 MB"`.
///
/// Two decimals at most, trailing zeros trimmed. `"0 Bytes"` for zero.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exponent = 0;
    while exponent + 1 < UNITS.len() && bytes >= 1u64 << (10 * (exponent + 1)) {
        exponent += 1;
    }
    let scaled = round2(bytes as f64 / (1u64 << (10 * exponent)) as f64);
    let number = format!("{scaled:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{number} {}", UNITS[exponent])
}

/// Whether `bytes` fits a budget of `target_bytes`.
pub fn within_budget(bytes: u64, target_bytes: u64) -> bool {
    bytes <= target_bytes
}
