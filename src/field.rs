//! Particle fields: one instanced layer of the tree.
//!
//! A [`ParticleField`] owns a contiguous array of [`Particle`]s for a single
//! shape. Each particle carries a fixed position on the tree cone (`target`),
//! a fixed position in the scattered cloud (`chaos`), and a `current`
//! position that is pulled towards one or the other every tick.
//!
//! # Per-tick update
//!
//! For a frame at time `t` every particle:
//!
//! 1. lerps `current` towards `target` (formed, factor 0.04) or `chaos`
//!    (dissolved, factor 0.02)
//! 2. bobs vertically by `sin(t + phase) * 0.005`
//! 3. is pushed away from the repulsion centre when closer than 5 units,
//!    by at most 0.2 per tick with linear falloff
//! 4. spins at `(t * 0.5 + phase, t * 0.8 + phase, 0)`
//! 5. resolves its palette colour and flashes brighter while
//!    `sin(3t + phase) > 0.8`
//!
//! The results are written to the field's instance buffer, which renderers
//! read through [`ParticleField::instances`] or upload as
//! [`InstanceRaw`] via `bytemuck`.
//!
//! # Reconstruction vs palette swap
//!
//! The spatial data depends on a [`FieldKey`] (shape, count, scale and
//! variance). Changing the key means building a new field. The palette is
//! not part of the key: [`ParticleField::set_palette`] swaps colours in place
//! and leaves every particle where it is.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

use crate::color::Color;
use crate::shape::{OrnamentShape, Primitive};
use crate::spawn::SpawnContext;

/// Height of the tree cone.
pub const TREE_HEIGHT: f32 = 14.0;
/// Radius of the cone at its base.
pub const TREE_BASE_RADIUS: f32 = 5.0;
/// Half-extents of the box the chaos positions are drawn from.
pub const CHAOS_HALF_EXTENTS: Vec3 = Vec3::new(15.0, 15.0, 10.0);
/// Smallest scale a particle can have.
pub const MIN_SCALE: f32 = 0.1;

const FORM_LERP: f32 = 0.04;
const DISSOLVE_LERP: f32 = 0.02;
const FLOAT_AMPLITUDE: f32 = 0.005;

/// Distance inside which particles are pushed away from the pointer.
pub const REPULSION_RADIUS: f32 = 5.0;
const REPULSION_CORE: f32 = 2.0;
const REPULSION_STEP: f32 = 0.1;

const SPIN_X: f32 = 0.5;
const SPIN_Y: f32 = 0.8;

const TWINKLE_FREQUENCY: f32 = 3.0;
const TWINKLE_THRESHOLD: f32 = 0.8;
const TWINKLE_LIGHTNESS: f32 = 0.2;

/// Per-instance state. Everything except `current` is fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position on the tree cone.
    pub target: Vec3,
    /// Position in the scattered cloud.
    pub chaos: Vec3,
    /// Animated position.
    pub current: Vec3,
    /// Uniform scale, at least [`MIN_SCALE`].
    pub scale: f32,
    /// Time offset in `[0, 2π)` that desynchronises periodic motion.
    pub phase: f32,
    /// Index into the palette, taken modulo the palette length when read.
    pub color_index: usize,
}

impl Particle {
    /// Draw a new particle. `palette_len` only bounds the colour index.
    pub fn spawn(ctx: &mut SpawnContext, base_scale: f32, scale_variance: f32, palette_len: usize) -> Self {
        let target = ctx.random_in_tree_cone(TREE_HEIGHT, TREE_BASE_RADIUS);
        let chaos = ctx.random_in_box(CHAOS_HALF_EXTENTS);
        let scale = (base_scale * ctx.random_jitter(scale_variance)).max(MIN_SCALE);
        let phase = ctx.random_angle();
        let color_index = ctx.random_index(palette_len);

        Self {
            target,
            chaos,
            current: chaos,
            scale,
            phase,
            color_index,
        }
    }

    /// Advance this particle by one frame.
    pub fn step(&mut self, frame: &FrameInput) {
        let (destination, rate) = if frame.formed {
            (self.target, FORM_LERP)
        } else {
            (self.chaos, DISSOLVE_LERP)
        };
        self.current = self.current.lerp(destination, rate);

        self.current.y += (frame.time + self.phase).sin() * FLOAT_AMPLITUDE;

        if let Some(center) = frame.repulsion_center {
            self.current += repulsion(self.current, center);
        }
    }

    /// Euler rotation (XYZ order) at time `t`.
    #[inline]
    pub fn rotation(&self, time: f32) -> Vec3 {
        Vec3::new(time * SPIN_X + self.phase, time * SPIN_Y + self.phase, 0.0)
    }

    /// Whether the twinkle flash is active at time `t`.
    #[inline]
    pub fn is_twinkling(&self, time: f32) -> bool {
        (time * TWINKLE_FREQUENCY + self.phase).sin() > TWINKLE_THRESHOLD
    }
}

/// Displacement applied to a point at `position` by a repeller at `center`.
///
/// Zero outside [`REPULSION_RADIUS`]; inside it points away from the centre
/// with length `(1 - d / r) * 0.2`.
pub fn repulsion(position: Vec3, center: Vec3) -> Vec3 {
    let offset = position - center;
    let d = offset.length();
    if d >= REPULSION_RADIUS {
        return Vec3::ZERO;
    }
    let force = (1.0 - d / REPULSION_RADIUS) * REPULSION_CORE;
    offset.normalize_or_zero() * force * REPULSION_STEP
}

/// Everything a field needs to advance one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Seconds since the scene started.
    pub time: f32,
    /// Pull towards the tree (`true`) or the chaos cloud (`false`).
    pub formed: bool,
    /// Pointer repeller in field-local coordinates, if a pointer is present.
    pub repulsion_center: Option<Vec3>,
}

impl FrameInput {
    pub fn new(time: f32, formed: bool) -> Self {
        Self {
            time,
            formed,
            repulsion_center: None,
        }
    }

    pub fn with_repulsion(mut self, center: Vec3) -> Self {
        self.repulsion_center = Some(center);
        self
    }
}

/// The settings a field's particle data is derived from.
///
/// Two keys compare equal only if every component is bit-identical, so any
/// change to count, shape, scale or variance triggers a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct FieldKey {
    pub shape: OrnamentShape,
    pub count: usize,
    pub base_scale: f32,
    pub scale_variance: f32,
}

impl FieldKey {
    pub fn new(shape: OrnamentShape, count: usize, base_scale: f32, scale_variance: f32) -> Self {
        Self {
            shape,
            count,
            base_scale,
            scale_variance,
        }
    }
}

impl PartialEq for FieldKey {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.count == other.count
            && self.base_scale.to_bits() == other.base_scale.to_bits()
            && self.scale_variance.to_bits() == other.scale_variance.to_bits()
    }
}

impl Eq for FieldKey {}

impl Hash for FieldKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
        self.count.hash(state);
        self.base_scale.to_bits().hash(state);
        self.scale_variance.to_bits().hash(state);
    }
}

/// One particle's output for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
    pub scale: f32,
    pub color: Color,
}

impl Instance {
    /// Model matrix: scale, then rotate, then translate.
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rotation, self.position)
    }
}

/// GPU-ready instance record: column-major model matrix followed by RGBA.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl From<&Instance> for InstanceRaw {
    fn from(instance: &Instance) -> Self {
        let c = instance.color.to_vec3();
        Self {
            model: instance.model_matrix().to_cols_array_2d(),
            color: [c.x, c.y, c.z, 1.0],
        }
    }
}

/// An instanced layer of particles sharing one shape and one palette.
#[derive(Debug, Clone)]
pub struct ParticleField {
    key: FieldKey,
    primitive: Primitive,
    particles: Vec<Particle>,
    palette: Vec<Color>,
    instances: Vec<Instance>,
}

impl ParticleField {
    /// Build a field with `key.count` freshly spawned particles.
    ///
    /// An empty palette is replaced by plain white so colour lookups always
    /// have something to index.
    pub fn new(key: FieldKey, palette: Vec<Color>, ctx: &mut SpawnContext) -> Self {
        let palette = if palette.is_empty() {
            warn!(shape = %key.shape, "field created without colors, using white");
            vec![Color::WHITE]
        } else {
            palette
        };

        let particles: Vec<Particle> = (0..key.count)
            .map(|_| Particle::spawn(ctx, key.base_scale, key.scale_variance, palette.len()))
            .collect();

        let instances = particles
            .iter()
            .map(|p| Instance {
                position: p.current,
                rotation: p.rotation(0.0),
                scale: p.scale,
                color: palette[p.color_index % palette.len()],
            })
            .collect();

        debug!(shape = %key.shape, count = key.count, "built particle field");

        Self {
            key,
            primitive: key.shape.primitive(),
            particles,
            palette,
            instances,
        }
    }

    #[inline]
    pub fn key(&self) -> FieldKey {
        self.key
    }

    #[inline]
    pub fn shape(&self) -> OrnamentShape {
        self.key.shape
    }

    #[inline]
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Replace the palette without touching particle state.
    ///
    /// Returns `false` (and keeps the old palette) if `colors` is empty.
    pub fn set_palette(&mut self, colors: &[Color]) -> bool {
        if colors.is_empty() {
            warn!(shape = %self.key.shape, "ignoring empty palette");
            return false;
        }
        if self.palette != colors {
            self.palette = colors.to_vec();
            for (instance, particle) in self.instances.iter_mut().zip(&self.particles) {
                instance.color = self.palette[particle.color_index % self.palette.len()];
            }
            debug!(shape = %self.key.shape, colors = colors.len(), "swapped palette");
        }
        true
    }

    /// Palette colour for a particle, without twinkle.
    #[inline]
    pub fn base_color(&self, particle: &Particle) -> Color {
        self.palette[particle.color_index % self.palette.len()]
    }

    /// Advance every particle and refresh the instance buffer.
    pub fn tick(&mut self, frame: &FrameInput) {
        let palette = &self.palette;
        for (particle, instance) in self.particles.iter_mut().zip(self.instances.iter_mut()) {
            particle.step(frame);

            let base = palette[particle.color_index % palette.len()];
            let color = if particle.is_twinkling(frame.time) {
                base.offset_hsl(0.0, 0.0, TWINKLE_LIGHTNESS)
            } else {
                base
            };

            *instance = Instance {
                position: particle.current,
                rotation: particle.rotation(frame.time),
                scale: particle.scale,
                color,
            };
        }
    }

    /// Output of the last tick, one entry per particle.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Append the last tick's output as GPU records.
    pub fn write_raw(&self, out: &mut Vec<InstanceRaw>) {
        out.extend(self.instances.iter().map(InstanceRaw::from));
    }
}
