//! Scene rasterization.
//!
//! [`SceneRenderer`] is the seam the batch runner drives; [`RasterRenderer`]
//! is the CPU implementation (template resample + fontdue glyph coverage +
//! PNG encode).

mod raster;

use async_trait::async_trait;
use thiserror::Error;

use crate::scene::Scene;

pub use raster::{RasterRenderer, OVERSAMPLE};

/// Failure to produce an image for a scene.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene has no template image")]
    MissingTemplate,
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("capture failed: could not encode png")]
    Encode(#[source] image::ImageError),
}

/// One rendered certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// PNG-encoded RGBA image.
    pub bytes: Vec<u8>,
    /// Name derived from the scene text by [`crate::naming::certificate_file_name`].
    /// The batch runner saves the image under this name.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

/// Turns a scene into an image.
///
/// Implementations must not mutate shared state that the next call depends
/// on; the runner may call `render` once per name, strictly one at a time.
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    async fn render(&self, scene: &Scene) -> Result<RenderResult, RenderError>;
}
