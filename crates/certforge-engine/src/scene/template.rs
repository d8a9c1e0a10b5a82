use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

/// Error returned when template bytes cannot be decoded.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to decode template image")]
    Decode(#[from] image::ImageError),
    #[error("template image has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Decoded template image.
///
/// Cloning is cheap: the pixels are shared and never mutated, so a batch can
/// snapshot a scene without copying the image.
#[derive(Clone)]
pub struct Template {
    pixels: Arc<RgbaImage>,
}

impl Template {
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, TemplateError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(TemplateError::Empty { width, height });
        }
        Ok(Self { pixels: Arc::new(pixels) })
    }

    pub fn from_image(image: DynamicImage) -> Result<Self, TemplateError> {
        Self::from_rgba(image.into_rgba8())
    }

    /// Decodes any raster format the `image` crate recognises.
    pub fn decode(bytes: &[u8]) -> Result<Self, TemplateError> {
        Self::from_image(image::load_from_memory(bytes)?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        Self::from_image(image::open(path)?)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// True when both handles share the same pixel buffer.
    pub fn ptr_eq(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
