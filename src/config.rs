//! Tree configuration snapshot.
//!
//! A [`TreeConfig`] is an immutable value describing what the tree looks
//! like. The UI (or a TOML file at startup) produces one; the scene replaces
//! its copy wholesale whenever it changes.
//!
//! # File format
//!
//! ```toml
//! tree_color = "#046307"
//! ornament_colors = ["#FFD700", "#C0C0C0", "#FF0000"]
//! ornament_shapes = ["sphere", "cube", "star"]
//! particle_count = 1500
//! bloom_intensity = 2.0
//! ornament_scale = 1.2
//! ornament_scale_variance = 1.0
//! ```
//!
//! Missing keys fall back to [`TreeConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::{Color, PalettePreset};
use crate::error::ConfigError;
use crate::shape::OrnamentShape;

/// Upper bound accepted for `ornament_scale_variance`.
pub const MAX_SCALE_VARIANCE: f32 = 2.0;

/// Everything the user can change about the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Dominant foliage colour.
    pub tree_color: Color,
    /// Ornament palette. Never empty.
    pub ornament_colors: Vec<Color>,
    /// Selected ornament shapes. Never empty, no duplicates.
    pub ornament_shapes: Vec<OrnamentShape>,
    /// Total ornament particles, split evenly across the selected shapes.
    pub particle_count: u32,
    /// Strength of the glow around bright particles.
    pub bloom_intensity: f32,
    /// Base ornament scale.
    pub ornament_scale: f32,
    /// Random spread of ornament scale (0 = uniform, 1 = ±50%).
    pub ornament_scale_variance: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            tree_color: Color::from_hex_u32(0x046307),
            ornament_colors: vec![
                Color::from_hex_u32(0xFFD700),
                Color::from_hex_u32(0xC0C0C0),
                Color::from_hex_u32(0xFF0000),
            ],
            ornament_shapes: vec![OrnamentShape::Sphere, OrnamentShape::Cube, OrnamentShape::Star],
            particle_count: 1500,
            bloom_intensity: 2.0,
            ornament_scale: 1.2,
            ornament_scale_variance: 1.0,
        }
    }
}

impl TreeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Check the invariants the scene relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ornament_colors.is_empty() {
            return Err(ConfigError::NoColors);
        }
        if self.ornament_shapes.is_empty() {
            return Err(ConfigError::NoShapes);
        }
        for (i, shape) in self.ornament_shapes.iter().enumerate() {
            if self.ornament_shapes[..i].contains(shape) {
                return Err(ConfigError::DuplicateShape(*shape));
            }
        }
        if !(self.ornament_scale.is_finite() && self.ornament_scale > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "ornament_scale",
                reason: format!("{} is not a positive number", self.ornament_scale),
            });
        }
        if !(0.0..=MAX_SCALE_VARIANCE).contains(&self.ornament_scale_variance) {
            return Err(ConfigError::InvalidValue {
                field: "ornament_scale_variance",
                reason: format!(
                    "{} is outside 0..={}",
                    self.ornament_scale_variance, MAX_SCALE_VARIANCE
                ),
            });
        }
        if !(self.bloom_intensity.is_finite() && self.bloom_intensity >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "bloom_intensity",
                reason: format!("{} is not a non-negative number", self.bloom_intensity),
            });
        }
        Ok(())
    }

    /// Ornament particles per selected shape: `floor(total / max(1, shapes))`.
    pub fn particles_per_shape(&self) -> usize {
        self.particle_count as usize / self.ornament_shapes.len().max(1)
    }

    // ========== Builders ==========

    pub fn with_tree_color(mut self, color: Color) -> Self {
        self.tree_color = color;
        self
    }

    pub fn with_ornament_colors(mut self, colors: Vec<Color>) -> Self {
        if !colors.is_empty() {
            self.ornament_colors = colors;
        }
        self
    }

    pub fn with_ornament_shapes(mut self, shapes: Vec<OrnamentShape>) -> Self {
        let mut unique = Vec::with_capacity(shapes.len());
        for shape in shapes {
            if !unique.contains(&shape) {
                unique.push(shape);
            }
        }
        if !unique.is_empty() {
            self.ornament_shapes = unique;
        }
        self
    }

    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_bloom_intensity(mut self, intensity: f32) -> Self {
        self.bloom_intensity = intensity;
        self
    }

    pub fn with_ornament_scale(mut self, scale: f32, variance: f32) -> Self {
        self.ornament_scale = scale;
        self.ornament_scale_variance = variance;
        self
    }

    // ========== UI edits ==========

    /// Add `shape` if missing, remove it otherwise. Removing the last
    /// selected shape does nothing.
    pub fn toggle_shape(&mut self, shape: OrnamentShape) {
        if let Some(pos) = self.ornament_shapes.iter().position(|s| *s == shape) {
            if self.ornament_shapes.len() > 1 {
                self.ornament_shapes.remove(pos);
            }
        } else {
            self.ornament_shapes.push(shape);
        }
    }

    /// Add `color` if missing, remove it otherwise. Removing the last
    /// selected colour does nothing.
    pub fn toggle_color(&mut self, color: Color) {
        if let Some(pos) = self.ornament_colors.iter().position(|c| *c == color) {
            if self.ornament_colors.len() > 1 {
                self.ornament_colors.remove(pos);
            }
        } else {
            self.ornament_colors.push(color);
        }
    }

    /// Replace the ornament palette with a preset.
    pub fn apply_palette_preset(&mut self, preset: PalettePreset) {
        self.ornament_colors = preset.colors();
    }
}
