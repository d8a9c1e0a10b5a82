//! Scene model.
//!
//! Responsibilities:
//! - hold the composed visual state submitted for rasterization
//! - enforce the style domains (font size range, colour syntax) at the setters
//! - keep the template pixels behind a shared, read-only handle

mod model;
mod template;

pub use model::{
    Scene, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE_PX, DEFAULT_POSITION, MAX_FONT_SIZE_PX,
    MIN_FONT_SIZE_PX, PLACEHOLDER_TEXT,
};
pub use template::{Template, TemplateError};
