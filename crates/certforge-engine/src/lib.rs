//! certforge engine crate.
//!
//! Owns the scene model (template + positioned, styled text) and the raster
//! renderer that turns a scene into PNG bytes. Batch sequencing lives in
//! `certforge-batch`.

pub mod coords;
pub mod logging;
pub mod naming;
pub mod paint;
pub mod render;
pub mod scene;
pub mod text;
