//! Colour parsing: CSS-style names, hex codes, `rgb(...)` and raw triples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// An opaque RGB colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("orange", [255, 165, 0]),
];

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a colour from integer channels, rejecting values outside 0–255.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self> {
        let channel = |v: i64| {
            u8::try_from(v).map_err(|_| RenderError::InvalidColor {
                input: format!("({r}, {g}, {b})"),
                reason: "channel values must be between 0 and 255".to_string(),
            })
        };
        Ok(Self::new(channel(r)?, channel(g)?, channel(b)?))
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// The colour with an alpha channel of `255 · opacity` (truncated).
    pub fn to_rgba(self, opacity: f64) -> Result<[u8; 4]> {
        let alpha = (255.0 * opacity).trunc();
        if !(0.0..=255.0).contains(&alpha) {
            return Err(RenderError::invalid(
                "opacity",
                format!("must be between 0.0 and 1.0, got {opacity}"),
            ));
        }
        Ok([self.r, self.g, self.b, alpha as u8])
    }
}

impl FromStr for Color {
    type Err = RenderError;

    fn from_str(input: &str) -> Result<Self> {
        let text = input.trim().to_ascii_lowercase();
        let unknown = |reason: &str| RenderError::InvalidColor {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some(hex) = text.strip_prefix('#') {
            let digits: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| d as u8))
                .collect::<Option<_>>()
                .ok_or_else(|| unknown("invalid hex digit"))?;
            return match digits.as_slice() {
                [r, g, b] => Ok(Self::new(r * 17, g * 17, b * 17)),
                [r1, r2, g1, g2, b1, b2] => Ok(Self::new(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
                _ => Err(unknown("hex colours need 3 or 6 digits")),
            };
        }

        if let Some(body) = text.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            let channels: Vec<i64> = body
                .split(',')
                .map(|part| part.trim().parse::<i64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| unknown("rgb() channels must be integers"))?;
            return match channels.as_slice() {
                [r, g, b] => Self::from_channels(*r, *g, *b),
                _ => Err(unknown("rgb() takes exactly three channels")),
            };
        }

        NAMED
            .iter()
            .find(|(name, _)| *name == text)
            .map(|&(_, [r, g, b])| Self::new(r, g, b))
            .ok_or_else(|| unknown("not a known colour name"))
    }
}

impl TryFrom<String> for Color {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
