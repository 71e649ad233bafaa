//! Colors for categorical groups.
//!
//! `colors_for(n)` samples `n` evenly spaced hues around the HCL (polar CIE-LUV) color wheel at
//! fixed chroma and luminance, the usual default palette for discrete fills.

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// First hue on the wheel, in degrees
const HUE_START: f64 = 15.0;
/// Chroma of generated colors
const CHROMA: f64 = 100.0;
/// Luminance of generated colors
const LUMINANCE: f64 = 65.0;

// D65 reference white
const WHITE_Y: f64 = 100.0;
const WHITE_U: f64 = 0.1978398;
const WHITE_V: f64 = 0.4683363;

/// 8-bit sRGB color, serialized as `#RRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    /// red
    pub r: u8,
    /// green
    pub g: u8,
    /// blue
    pub b: u8,
}

impl Color {
    /// Black, used for point outlines and axis lines
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    /// Color from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    /// Color from a packed `0xRRGGBB` value
    pub fn from_hex_num(num: u32) -> Color {
        Color {
            r: (num >> 16) as u8,
            g: ((num >> 8) & 0xFF) as u8,
            b: (num & 0xFF) as u8,
        }
    }

    /// `#RRGGBB` form
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse `#RRGGBB` or `#RGB`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(digits) = s.trim().strip_prefix('#') else {
            bail!("color must start with '#': {}", s)
        };
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("invalid hex color: {}", s);
        }
        let num = u32::from_str_radix(digits, 16)?;
        match digits.len() {
            6 => Ok(Color::from_hex_num(num)),
            3 => {
                // each digit doubles: #abc == #aabbcc
                let expand = |d: u32| (d * 17) as u8;
                Ok(Color::new(expand(num >> 8), expand((num >> 4) & 0xF), expand(num & 0xF)))
            }
            _ => bail!("invalid hex color: {}", s),
        }
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// sRGB gamma companding of a linear channel
fn gamma(u: f64) -> f64 {
    if u > 0.00304 {
        1.055 * u.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * u
    }
}

/// Convert a polar-LUV color (hue in degrees, chroma, luminance) to 8-bit sRGB, clamping
/// out-of-gamut channels.
pub fn hcl(hue: f64, chroma: f64, luminance: f64) -> Color {
    let h = hue.to_radians();
    let (u, v) = (chroma * h.cos(), chroma * h.sin());
    let (x, y, z) = if luminance <= 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        let y = WHITE_Y
            * if luminance > 7.999592 {
                ((luminance + 16.0) / 116.0).powi(3)
            } else {
                luminance / 903.3
            };
        let up = u / (13.0 * luminance) + WHITE_U;
        let vp = v / (13.0 * luminance) + WHITE_V;
        let x = 9.0 * y * up / (4.0 * vp);
        let z = -x / 3.0 - 5.0 * y + 3.0 * y / vp;
        (x, y, z)
    };

    let r = gamma((3.240479 * x - 1.537150 * y - 0.498535 * z) / WHITE_Y);
    let g = gamma((-0.969256 * x + 1.875992 * y + 0.041556 * z) / WHITE_Y);
    let b = gamma((0.055648 * x - 0.204043 * y + 1.057311 * z) / WHITE_Y);
    let to_u8 = |c: f64| (255.0 * c.clamp(0.0, 1.0) + 0.5) as u8;
    Color::new(to_u8(r), to_u8(g), to_u8(b))
}

/// `n` colors evenly spaced around the hue wheel, starting at 15°.
pub fn colors_for(n: usize) -> Vec<Color> {
    (0..n)
        .map(|i| hcl(HUE_START + 360.0 * i as f64 / n as f64, CHROMA, LUMINANCE))
        .collect()
}
