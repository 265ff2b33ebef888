use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Hex color forms accepted from user input: #RGB, #RRGGBB, #RRGGBBAA.
static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("Invalid hex color regex")
});

/// Errors from parsing a color string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("not a valid hex color: {0:?}")]
    InvalidHex(String),
}

/// An RGBA color.
///
/// Parsed from hex strings with an optional alpha channel; the keyword
/// `transparent` is accepted as fully transparent. [`to_hex`](Self::to_hex)
/// returns the shortest exact hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255, a: 255 };
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    /// Parse a hex color string with optional alpha, or `transparent`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Self::TRANSPARENT);
        }
        if !HEX_COLOR.is_match(trimmed) {
            return Err(ColorParseError::InvalidHex(input.to_string()));
        }

        let hex = &trimmed[1..];
        let (r, g, b, a) = match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).unwrap_or(0);
                let expand = |d: u8| d << 4 | d;
                (expand(digit(0)), expand(digit(1)), expand(digit(2)), 255)
            }
            6 | 8 => {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
                let alpha = if hex.len() == 8 { byte(6) } else { 255 };
                (byte(0), byte(2), byte(4), alpha)
            }
            _ => unreachable!("regex admits 3, 6 or 8 hex digits"),
        };

        Ok(Self { r, g, b, a })
    }

    /// Fully transparent colors are skipped when pre-filling raster
    /// backgrounds for PNG, and replaced with opaque white for JPEG.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Hex form: `#rrggbb`, or `#rrggbbaa` when the alpha channel matters.
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// The fill attribute value for SVG markup (always opaque hex; alpha is
    /// expressed separately via `fill-opacity` for renderer compatibility).
    pub fn svg_fill(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// The `fill-opacity` value when the color is not fully opaque.
    pub fn svg_opacity(&self) -> Option<f32> {
        if self.is_opaque() {
            None
        } else {
            Some(f32::from(self.a) / 255.0)
        }
    }
}
