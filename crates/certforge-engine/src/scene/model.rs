use crate::coords::Position;
use crate::paint::{Color, ColorParseError};

use super::Template;

pub const MIN_FONT_SIZE_PX: u32 = 12;
pub const MAX_FONT_SIZE_PX: u32 = 100;
pub const DEFAULT_FONT_SIZE_PX: u32 = 48;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_POSITION: Position = Position::new(50, 50);

/// Text shown in a preview while no name has been entered.
pub const PLACEHOLDER_TEXT: &str = "Enter a name";

/// Template + text + style + position, as submitted for rasterization.
///
/// All mutation goes through the setters so the style domains hold. A
/// renderer only ever sees `&Scene`.
#[derive(Debug, Clone)]
pub struct Scene {
    template: Option<Template>,
    text: String,
    position: Position,
    font_family: String,
    font_size_px: u32,
    color: Color,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            template: None,
            text: String::new(),
            position: DEFAULT_POSITION,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            color: Color::black(),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: Template) -> Self {
        let mut scene = Self::default();
        scene.set_template(template);
        scene
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    #[inline]
    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text a renderer should draw: the name, or the placeholder when empty.
    pub fn display_text(&self) -> &str {
        if self.text.is_empty() { PLACEHOLDER_TEXT } else { &self.text }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    #[inline]
    pub fn font_size_px(&self) -> u32 {
        self.font_size_px
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn color_hex(&self) -> String {
        self.color.to_hex()
    }

    // ── setters ───────────────────────────────────────────────────────────

    pub fn set_template(&mut self, template: Template) {
        self.template = Some(template);
    }

    pub fn clear_template(&mut self) {
        self.template = None;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.position = Position::new(x, y);
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) {
        self.font_family = family.into();
    }

    /// Sets the font size, clamped to `MIN_FONT_SIZE_PX..=MAX_FONT_SIZE_PX`.
    pub fn set_font_size(&mut self, px: u32) {
        self.font_size_px = px.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX);
    }

    /// Parses and applies a hex colour. The scene is unchanged on error.
    pub fn set_color_hex(&mut self, hex: &str) -> Result<(), ColorParseError> {
        self.color = Color::from_hex(hex)?;
        Ok(())
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}
