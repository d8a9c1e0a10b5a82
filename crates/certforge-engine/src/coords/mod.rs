//! Coordinate types shared by the scene model and the renderer.
//!
//! Canonical space:
//! - Template pixels (before oversampling)
//! - Origin top-left
//! - +X right, +Y down

mod position;
mod vec2;

pub use position::Position;
pub use vec2::Vec2;
