use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::naming::certificate_file_name;
use crate::scene::Scene;
use crate::text::FontSystem;

use super::{RenderError, RenderResult, SceneRenderer};

/// Output pixels per template pixel.
pub const OVERSAMPLE: u32 = 2;

/// CPU renderer for [`Scene`]s.
///
/// The output canvas is `template size * scale`, starts fully transparent and
/// receives the resampled template, then the text label. Fonts are shared
/// behind an `Arc` so the renderer can be moved onto a blocking worker.
#[derive(Clone)]
pub struct RasterRenderer {
    fonts: Arc<FontSystem>,
    scale: u32,
}

impl RasterRenderer {
    pub fn new(fonts: FontSystem) -> Self {
        Self { fonts: Arc::new(fonts), scale: OVERSAMPLE }
    }

    /// Overrides the oversampling factor. Values below 1 are treated as 1.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    #[inline]
    pub fn fonts(&self) -> &FontSystem {
        &self.fonts
    }

    /// Renders synchronously on the calling thread.
    pub fn rasterize(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
        let template = scene.template().ok_or(RenderError::MissingTemplate)?;

        let (width, height) = match (
            template.width().checked_mul(self.scale),
            template.height().checked_mul(self.scale),
        ) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                return Err(RenderError::Capture(format!(
                    "canvas of {}x{} at scale {} overflows",
                    template.width(),
                    template.height(),
                    self.scale
                )));
            }
        };

        let mut canvas = RgbaImage::new(width, height);
        if self.scale == 1 {
            imageops::overlay(&mut canvas, template.pixels(), 0, 0);
        } else {
            let background =
                imageops::resize(template.pixels(), width, height, FilterType::CatmullRom);
            imageops::overlay(&mut canvas, &background, 0, 0);
        }

        self.draw_text(&mut canvas, scene)?;

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(RenderError::Encode)?;

        Ok(RenderResult {
            bytes,
            file_name: certificate_file_name(scene.text()),
            width,
            height,
        })
    }

    fn draw_text(&self, canvas: &mut RgbaImage, scene: &Scene) -> Result<(), RenderError> {
        let family = scene.font_family();
        let font = self
            .fonts
            .resolve(family)
            .and_then(|id| self.fonts.get(id))
            .ok_or_else(|| {
                RenderError::Capture(format!("no font available for family {family:?}"))
            })?;

        let scale = self.scale as f32;
        let origin = scene.position().scaled(scale);
        let size = scene.font_size_px() as f32 * scale;
        let (r, g, b, a) = scene.color().to_straight();
        if a <= 0.0 {
            return Ok(());
        }

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: origin.x,
            y: origin.y,
            ..LayoutSettings::default()
        });
        layout.append(&[font], &TextStyle::new(scene.display_text(), size, 0));

        let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
        for glyph in layout.glyphs() {
            if !glyph.char_data.rasterize() || glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, coverage) = font.rasterize_config(glyph.key);
            let gx = glyph.x.round() as i64;
            let gy = glyph.y.round() as i64;

            for row in 0..metrics.height {
                let py = gy + row as i64;
                if py < 0 || py >= ch {
                    continue;
                }
                for col in 0..metrics.width {
                    let px = gx + col as i64;
                    let cov = coverage[row * metrics.width + col];
                    if cov == 0 || px < 0 || px >= cw {
                        continue;
                    }
                    let src_a = a * cov as f32 / 255.0;
                    blend_over(canvas.get_pixel_mut(px as u32, py as u32), [r, g, b], src_a);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SceneRenderer for RasterRenderer {
    async fn render(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
        if !scene.has_template() {
            return Err(RenderError::MissingTemplate);
        }
        let renderer = self.clone();
        let scene = scene.clone();
        tokio::task::spawn_blocking(move || renderer.rasterize(&scene))
            .await
            .map_err(|e| RenderError::Capture(format!("render worker failed: {e}")))?
    }
}

/// Straight-alpha source-over.
fn blend_over(dst: &mut Rgba<u8>, rgb: [f32; 3], src_a: f32) {
    let [dr, dg, db, da] = dst.0.map(|c| c as f32 / 255.0);
    let out_a = src_a + da * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let mix = |s: f32, d: f32| (s * src_a + d * da * (1.0 - src_a)) / out_a;
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    *dst = Rgba([q(mix(rgb[0], dr)), q(mix(rgb[1], dg)), q(mix(rgb[2], db)), q(out_a)]);
}
