//! Paint model for the text label.
//!
//! Scope is deliberately narrow: a single solid colour, parsed from the hex
//! strings the style controls produce.

pub mod color;

pub use color::{Color, ColorParseError};
