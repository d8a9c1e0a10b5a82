use super::Vec2;

/// Top-left offset of the text label, in template pixels.
///
/// Integer because the offset comes from pointer deltas; it may be negative
/// when the label is dragged past the template's left or top edge.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the offset in output pixels for a given oversampling factor.
    #[inline]
    pub fn scaled(self, scale: f32) -> Vec2 {
        Vec2::new(self.x as f32 * scale, self.y as f32 * scale)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}
