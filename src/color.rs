//! Colour values and ornament palettes.
//!
//! Colours are stored as non-linear sRGB components in `0.0..=1.0`, which is
//! what the configuration UI produces (`#RRGGBB` strings) and what the capture
//! pipeline writes into 8-bit frames.
//!
//! # Example
//!
//! ```ignore
//! use christmas_glow::color::{Color, PalettePreset};
//!
//! let gold = Color::from_hex("#FFD700")?;
//! let flash = gold.offset_hsl(0.0, 0.0, 0.2);
//! let cyber = PalettePreset::Cyberpunk.colors();
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    rgb: Vec3,
}

impl Color {
    pub const BLACK: Color = Color { rgb: Vec3::ZERO };
    pub const WHITE: Color = Color { rgb: Vec3::ONE };

    /// Create a colour from float components. Values are clamped to `0..=1`.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            rgb: Vec3::new(r, g, b).clamp(Vec3::ZERO, Vec3::ONE),
        }
    }

    /// Create a colour from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: Vec3::new(r as f32, g as f32, b as f32) / 255.0,
        }
    }

    /// Create a colour from a packed `0xRRGGBB` value.
    pub fn from_hex_u32(hex: u32) -> Self {
        Self::from_rgb8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Parse `#RRGGBB` or `#RGB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Result<Self, ConfigError> {
        let digits = s.trim().trim_start_matches('#');
        let invalid = || ConfigError::InvalidColor(s.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match digits.len() {
            6 => u32::from_str_radix(digits, 16)
                .map(Self::from_hex_u32)
                .map_err(|_| invalid()),
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16)
                    .map(Self::from_hex_u32)
                    .map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }

    #[inline]
    pub fn r(&self) -> f32 {
        self.rgb.x
    }

    #[inline]
    pub fn g(&self) -> f32 {
        self.rgb.y
    }

    #[inline]
    pub fn b(&self) -> f32 {
        self.rgb.z
    }

    /// Components as a vector.
    #[inline]
    pub fn to_vec3(&self) -> Vec3 {
        self.rgb
    }

    /// 8-bit RGBA with full alpha.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let c = (self.rgb * 255.0).round();
        [c.x as u8, c.y as u8, c.z as u8, 255]
    }

    /// Uppercase `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Convert to `(hue, saturation, lightness)`, each in `0..=1`.
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let (r, g, b) = (self.rgb.x, self.rgb.y, self.rgb.z);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (min + max) / 2.0;

        if min == max {
            return (0.0, 0.0, lightness);
        }

        let delta = max - min;
        let saturation = if lightness <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        let hue = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        (hue / 6.0, saturation, lightness)
    }

    /// Build a colour from HSL. Hue wraps, saturation and lightness clamp.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(1.0);
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self::new(l, l, l);
        }

        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;

        Self::new(
            hue_to_channel(q, p, h + 1.0 / 3.0),
            hue_to_channel(q, p, h),
            hue_to_channel(q, p, h - 1.0 / 3.0),
        )
    }

    /// Shift the colour in HSL space.
    ///
    /// Used for the twinkle flash: `offset_hsl(0.0, 0.0, 0.2)` pushes a colour
    /// towards white without changing its hue.
    pub fn offset_hsl(&self, dh: f32, ds: f32, dl: f32) -> Self {
        let (h, s, l) = self.to_hsl();
        Self::from_hsl(h + dh, s + ds, l + dl)
    }
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * 6.0 * (2.0 / 3.0 - t);
    }
    p
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl From<Color> for tiny_skia::Color {
    fn from(color: Color) -> Self {
        let [r, g, b, a] = color.to_rgba8();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

/// Named ornament palettes offered next to the colour picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PalettePreset {
    /// Gold, silver and white.
    RoyalGold,
    /// Orange, white and green.
    ClassicXmas,
    /// Magenta, cyan and yellow.
    Cyberpunk,
    /// Hot pink, light pink and lavender blush.
    SoftPink,
}

impl PalettePreset {
    pub const ALL: [PalettePreset; 4] = [
        PalettePreset::RoyalGold,
        PalettePreset::ClassicXmas,
        PalettePreset::Cyberpunk,
        PalettePreset::SoftPink,
    ];

    /// The colours of this preset, in display order.
    pub fn colors(&self) -> Vec<Color> {
        let hexes: [u32; 3] = match self {
            PalettePreset::RoyalGold => [0xFFD700, 0xC0C0C0, 0xFFFFFF],
            PalettePreset::ClassicXmas => [0xFF7300, 0xFFFFFF, 0x00FF00],
            PalettePreset::Cyberpunk => [0xFF00FF, 0x00FFFF, 0xFFFF00],
            PalettePreset::SoftPink => [0xFF69B4, 0xFFB6C1, 0xFFF0F5],
        };
        hexes.into_iter().map(Color::from_hex_u32).collect()
    }
}

/// The swatch grid of individually toggleable ornament colours.
pub const SWATCHES: [u32; 20] = [
    0xFFD700, 0xC0C0C0, 0xFF6600, 0x69FFD4, //
    0xFF69B4, 0xAD8AF4, 0xFF0090, 0xFFA500, //
    0xFFFFFF, 0x0000FF, 0x972786, 0x008080, //
    0x7200C4, 0xFF5D73, 0xF0E68C, 0x8093F1, //
    0xFF0000, 0x30BCED, 0xFCFF4B, 0xC8FF00,
];

/// All swatch colours.
pub fn swatches() -> Vec<Color> {
    SWATCHES.iter().copied().map(Color::from_hex_u32).collect()
}
