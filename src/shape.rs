//! Ornament shapes and the fixed primitives they resolve to.
//!
//! The shape set is closed. Each shape maps to exactly one [`Primitive`] with
//! fixed dimensions; a field resolves its primitive once at construction.
//!
//! | Shape | Primitive |
//! |-------|-----------|
//! | [`OrnamentShape::Sphere`] | sphere, radius 0.12, 16×16 segments |
//! | [`OrnamentShape::Cube`] | box 0.2 × 0.2 × 0.2 |
//! | [`OrnamentShape::Diamond`] | octahedron, radius 0.15 |
//! | [`OrnamentShape::Star`] | extruded five-point star |
//! | [`OrnamentShape::Rectangle`] | box 0.15 × 0.25 × 0.05 (gift tag) |
//! | [`OrnamentShape::Triangle`] | three-sided cone, radius 0.15, height 0.3 |

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Selectable ornament shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrnamentShape {
    Sphere,
    Cube,
    Diamond,
    Star,
    Rectangle,
    Triangle,
}

impl OrnamentShape {
    /// Every shape, in picker order.
    pub const ALL: [OrnamentShape; 6] = [
        OrnamentShape::Sphere,
        OrnamentShape::Cube,
        OrnamentShape::Diamond,
        OrnamentShape::Star,
        OrnamentShape::Rectangle,
        OrnamentShape::Triangle,
    ];

    /// Lowercase identifier used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            OrnamentShape::Sphere => "sphere",
            OrnamentShape::Cube => "cube",
            OrnamentShape::Diamond => "diamond",
            OrnamentShape::Star => "star",
            OrnamentShape::Rectangle => "rectangle",
            OrnamentShape::Triangle => "triangle",
        }
    }

    /// The geometry drawn for every instance of this shape.
    pub fn primitive(&self) -> Primitive {
        match self {
            OrnamentShape::Sphere => Primitive::Sphere {
                radius: 0.12,
                segments: 16,
            },
            OrnamentShape::Cube => Primitive::Box {
                size: Vec3::splat(0.2),
            },
            OrnamentShape::Diamond => Primitive::Octahedron { radius: 0.15 },
            OrnamentShape::Star => Primitive::ExtrudedStar {
                outer_radius: 0.15,
                inner_radius: 0.07,
                points: 5,
                depth: 0.1,
                bevel: 0.02,
            },
            OrnamentShape::Rectangle => Primitive::Box {
                size: Vec3::new(0.15, 0.25, 0.05),
            },
            OrnamentShape::Triangle => Primitive::Cone {
                radius: 0.15,
                height: 0.3,
                sides: 3,
            },
        }
    }
}

impl fmt::Display for OrnamentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OrnamentShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrnamentShape::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown ornament shape '{}'", s))
    }
}

/// Unit geometry for one instanced layer, before per-instance scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// UV sphere.
    Sphere { radius: f32, segments: u32 },
    /// Axis-aligned box with full edge lengths.
    Box { size: Vec3 },
    /// Regular octahedron with vertices at `radius` on each axis.
    Octahedron { radius: f32 },
    /// Cone along Y with `sides` radial segments (3 gives a pyramid).
    Cone { radius: f32, height: f32, sides: u32 },
    /// Star polygon in XY extruded along +Z, with a bevel around the rim.
    ExtrudedStar {
        outer_radius: f32,
        inner_radius: f32,
        points: u32,
        depth: f32,
        bevel: f32,
    },
}

impl Primitive {
    /// Radius of the sphere centred on the origin that encloses the primitive.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Primitive::Sphere { radius, .. } => radius,
            Primitive::Box { size } => (size * 0.5).length(),
            Primitive::Octahedron { radius } => radius,
            Primitive::Cone { radius, height, .. } => Vec2::new(radius, height * 0.5).length(),
            Primitive::ExtrudedStar {
                outer_radius,
                depth,
                bevel,
                ..
            } => Vec2::new(outer_radius + bevel, depth * 0.5 + bevel).length(),
        }
    }

    /// Area of the primitive's silhouette seen along Z, relative to the
    /// enclosing disc. Renderers use it to size flat splats.
    pub fn coverage(&self) -> f32 {
        match *self {
            Primitive::Sphere { .. } => 1.0,
            Primitive::Box { size } => {
                let r = self.bounding_radius();
                (size.x * size.y) / (std::f32::consts::PI * r * r)
            }
            Primitive::Octahedron { .. } => 0.64,
            Primitive::Cone { .. } => 0.5,
            Primitive::ExtrudedStar {
                outer_radius,
                inner_radius,
                ..
            } => (inner_radius / outer_radius).sqrt(),
        }
    }
}

/// Outline of a star polygon in the XY plane, alternating outer and inner
/// vertices and starting on the +X axis.
pub fn star_outline(outer_radius: f32, inner_radius: f32, points: u32) -> Vec<Vec2> {
    let count = points * 2;
    (0..count)
        .map(|i| {
            let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
            let angle = i as f32 / count as f32 * TAU;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}
