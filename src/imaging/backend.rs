//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, decode, and encode. Geometry and resampling are pure
//! pixel work and live outside the backend, so a mock backend only has to
//! stand in for the codecs.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on the
//! `image` crate's JPEG and PNG codecs.

use super::params::{Dimensions, OutputFormat, Quality, SourceEncoding};
use super::raster::RasterImage;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    EncodeFailed(String),
}

/// Result of an identify operation: header-level facts, no pixel decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identified {
    pub dimensions: Dimensions,
    pub encoding: SourceEncoding,
}

/// Trait for codec backends.
///
/// Every backend must implement all three operations so the pipeline is
/// backend-agnostic. `Sync` lets batch mode share one backend across rayon
/// workers.
pub trait ImageBackend: Sync {
    /// Read format and dimensions from the header only.
    fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError>;

    /// Decode an encoded buffer into a raster.
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError>;

    /// Encode pixels. `quality` is ignored by lossless formats.
    fn encode(
        &self,
        pixels: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Predicts an encoded size from output width, height, format and quality.
    pub type SizeModel = fn(u32, u32, OutputFormat, Quality) -> usize;

    /// Decides whether an encode with these parameters should fail.
    pub type FailRule = fn(u32, u32, OutputFormat, Quality) -> bool;

    /// Mock backend that records operations and fabricates encoded buffers
    /// whose length follows a [`SizeModel`].
    ///
    /// Identify and decode delegate to the `image` crate so tests can feed
    /// real synthetic buffers. Uses Mutex (not RefCell) so it is Sync.
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
        pub size_model: SizeModel,
        pub fail_rule: Option<FailRule>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Decode,
        Encode {
            width: u32,
            height: u32,
            format: OutputFormat,
            quality: u8,
        },
    }

    /// Bytes grow with pixel count and quality; PNG is a flat 3 bytes/pixel.
    pub fn proportional_size(w: u32, h: u32, format: OutputFormat, quality: Quality) -> usize {
        let pixels = w as usize * h as usize;
        match format {
            OutputFormat::Png => pixels * 3,
            OutputFormat::Jpeg => pixels * usize::from(quality.percent()) / 100,
        }
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_size_model(proportional_size)
        }

        pub fn with_size_model(size_model: SizeModel) -> Self {
            Self {
                operations: Mutex::new(Vec::new()),
                size_model,
                fail_rule: None,
            }
        }

        pub fn failing_when(mut self, rule: FailRule) -> Self {
            self.fail_rule = Some(rule);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Encode calls only, as `(width, height, quality percent)`.
        pub fn encodes(&self) -> Vec<(u32, u32, u8)> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode {
                        width,
                        height,
                        quality,
                        ..
                    } => Some((width, height, quality)),
                    _ => None,
                })
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify);
            crate::imaging::RustBackend::new().identify(bytes)
        }

        fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode);
            crate::imaging::RustBackend::new().decode(bytes)
        }

        fn encode(
            &self,
            pixels: &DynamicImage,
            format: OutputFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            let (width, height) = (pixels.width(), pixels.height());
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                width,
                height,
                format,
                quality: quality.percent(),
            });

            if self
                .fail_rule
                .is_some_and(|rule| rule(width, height, format, quality))
            {
                return Err(BackendError::EncodeFailed("mock failure".into()));
            }
            let len = (self.size_model)(width, height, format, quality).max(1);
            Ok(vec![0u8; len])
        }
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let pixels = DynamicImage::new_rgb8(40, 30);

        let bytes = backend
            .encode(&pixels, OutputFormat::Jpeg, Quality::new(0.5))
            .unwrap();
        assert_eq!(bytes.len(), 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                width: 40,
                height: 30,
                format: OutputFormat::Jpeg,
                quality: 50,
            }
        ));
    }

    #[test]
    fn mock_fail_rule_returns_encode_error() {
        let backend = MockBackend::new().failing_when(|_, _, format, _| format == OutputFormat::Png);
        let pixels = DynamicImage::new_rgb8(4, 4);

        assert!(backend
            .encode(&pixels, OutputFormat::Jpeg, Quality::FULL)
            .is_ok());
        assert!(matches!(
            backend.encode(&pixels, OutputFormat::Png, Quality::FULL),
            Err(BackendError::EncodeFailed(_))
        ));
        assert_eq!(backend.encodes().len(), 2);
    }
}
