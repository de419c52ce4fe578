//! Helpers shared by the integration tests.

#![allow(dead_code)]

use fitcrop::imaging::{
    BackendError, Identified, ImageBackend, OutputFormat, Quality, RasterImage, RustBackend,
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Mutex;

/// Smooth RGB gradient.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn jpeg_bytes(image: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .unwrap();
    buf
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// One recorded encode: output size, format and quality percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeCall {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
}

/// Real identify/decode, fabricated encodes whose length is
/// `width × height × quality% / divisor` (PNG: 3 bytes per pixel).
///
/// Keeps large scenarios fast and makes encoded sizes predictable.
pub struct SizedBackend {
    inner: RustBackend,
    divisor: usize,
    calls: Mutex<Vec<EncodeCall>>,
}

impl SizedBackend {
    pub fn new(divisor: usize) -> Self {
        Self {
            inner: RustBackend::new(),
            divisor,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn predicted(&self, width: u32, height: u32, format: OutputFormat, quality: u8) -> usize {
        let pixels = width as usize * height as usize;
        match format {
            OutputFormat::Png => pixels * 3,
            OutputFormat::Jpeg => (pixels * usize::from(quality) / self.divisor).max(1),
        }
    }
}

impl ImageBackend for SizedBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError> {
        self.inner.identify(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError> {
        self.inner.decode(bytes)
    }

    fn encode(
        &self,
        pixels: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let call = EncodeCall {
            width: pixels.width(),
            height: pixels.height(),
            format,
            quality: quality.percent(),
        };
        self.calls.lock().unwrap().push(call);
        let len = self.predicted(call.width, call.height, format, call.quality);
        Ok(vec![0u8; len])
    }
}
