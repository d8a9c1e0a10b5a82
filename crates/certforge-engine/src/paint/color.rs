use thiserror::Error;

/// Error returned when a hex colour string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("colour must start with '#', got {0:?}")]
    MissingHash(String),
    #[error("colour must be #rgb, #rrggbb or #rrggbbaa, got {digits} digits")]
    BadLength { digits: usize },
    #[error("invalid hex digit {0:?} in colour")]
    BadDigit(char),
}

/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are multiplied by `a` (premultiplied alpha).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn black() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }
    }

    /// Creates a premultiplied color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: (r.clamp(0.0, 1.0)) * a,
            g: (g.clamp(0.0, 1.0)) * a,
            b: (b.clamp(0.0, 1.0)) * a,
            a,
        }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (straight alpha).
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let digits = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(s.to_string()))?;

        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadDigit(bad));
        }

        // All characters are ASCII hex digits from here on.
        let nibble = |c: u8| -> u8 { (c as char).to_digit(16).unwrap_or(0) as u8 };
        let byte = |i: usize| -> u8 {
            let bytes = digits.as_bytes();
            nibble(bytes[i]) << 4 | nibble(bytes[i + 1])
        };

        let [r, g, b, a] = match digits.len() {
            3 => {
                let bytes = digits.as_bytes();
                let short = |i: usize| nibble(bytes[i]) * 0x11;
                [short(0), short(1), short(2), 0xff]
            }
            6 => [byte(0), byte(2), byte(4), 0xff],
            8 => [byte(0), byte(2), byte(4), byte(6)],
            n => return Err(ColorParseError::BadLength { digits: n }),
        };

        Ok(Self::from_srgb_u8(r, g, b, a))
    }

    /// Returns a straight-alpha representation.
    ///
    /// For `a == 0`, RGB is returned as 0.
    #[inline]
    pub fn to_straight(self) -> (f32, f32, f32, f32) {
        if self.a <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let inv = 1.0 / self.a;
            (self.r * inv, self.g * inv, self.b * inv, self.a)
        }
    }

    /// Straight-alpha RGBA bytes.
    pub fn to_rgba8(self) -> [u8; 4] {
        let (r, g, b, a) = self.to_straight();
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(r), q(g), q(b), q(a)]
    }

    /// Lowercase hex form; alpha is omitted when opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 0xff {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}
