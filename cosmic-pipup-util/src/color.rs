use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// RGBA color (values 0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build a color from 8-bit channels.
    pub fn from_argb8(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: f32::from(a) / 255.0,
        }
    }

    /// Parse a color string.
    ///
    /// Accepts `#RRGGBB`, `#AARRGGBB` (alpha first) and a fixed set of
    /// named colors, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ColorError> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| ColorError::InvalidHex(value.to_string()));
        }

        named(&value.to_ascii_lowercase()).ok_or_else(|| ColorError::UnknownName(value.to_string()))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let packed = u32::from_str_radix(hex, 16).ok()?;
        let argb = match hex.len() {
            6 => 0xff00_0000 | packed,
            8 => packed,
            _ => return None,
        };
        let [a, r, g, b] = argb.to_be_bytes();
        Some(Self::from_argb8(a, r, g, b))
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Named colors understood by [`Color::parse`]
pub mod named_colors {
    use super::Color;

    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
}

fn named(name: &str) -> Option<Color> {
    let (r, g, b) = match name {
        "black" => (0x00, 0x00, 0x00),
        "darkgray" | "darkgrey" => (0x44, 0x44, 0x44),
        "gray" | "grey" => (0x88, 0x88, 0x88),
        "lightgray" | "lightgrey" => (0xcc, 0xcc, 0xcc),
        "white" => (0xff, 0xff, 0xff),
        "red" => (0xff, 0x00, 0x00),
        "green" => (0x00, 0xff, 0x00),
        "blue" => (0x00, 0x00, 0xff),
        "yellow" => (0xff, 0xff, 0x00),
        "cyan" | "aqua" => (0x00, 0xff, 0xff),
        "magenta" | "fuchsia" => (0xff, 0x00, 0xff),
        "lime" => (0x00, 0xff, 0x00),
        "maroon" => (0x80, 0x00, 0x00),
        "navy" => (0x00, 0x00, 0x80),
        "olive" => (0x80, 0x80, 0x00),
        "purple" => (0x80, 0x00, 0x80),
        "silver" => (0xc0, 0xc0, 0xc0),
        "teal" => (0x00, 0x80, 0x80),
        "transparent" => return Some(named_colors::TRANSPARENT),
        _ => return None,
    };
    Some(Color::from_argb8(0xff, r, g, b))
}

/// Color parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// `#` prefix with a malformed hex body
    InvalidHex(String),
    /// Not a known color name
    UnknownName(String),
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::InvalidHex(value) => write!(f, "Invalid hex color: {}", value),
            ColorError::UnknownName(value) => write!(f, "Unknown color: {}", value),
        }
    }
}

impl std::error::Error for ColorError {}
