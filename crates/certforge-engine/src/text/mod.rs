//! Font registry and text measurement.

pub(crate) mod font_system;

pub use font_system::{FontId, FontLoadError, FontSystem};
