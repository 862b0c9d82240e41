//! Field composition: the foliage layer plus one layer per ornament shape.
//!
//! The composer owns every [`ParticleField`] in the tree and applies a
//! two-tier invalidation policy when the configuration changes:
//!
//! - a layer whose [`FieldKey`] (shape, count, scale, variance) is unchanged
//!   is kept and only receives the new palette
//! - a layer whose key changed is rebuilt from scratch
//!
//! The foliage layer has a fixed key, so it is never rebuilt; only its first
//! colour follows `tree_color`.

use glam::Vec3;
use tracing::debug;

use crate::color::Color;
use crate::config::TreeConfig;
use crate::field::{FieldKey, FrameInput, InstanceRaw, ParticleField};
use crate::input::Pointer;
use crate::shape::OrnamentShape;
use crate::spawn::SpawnContext;

/// Particles in the foliage layer.
pub const FOLIAGE_COUNT: usize = 4000;
/// Foliage geometry.
pub const FOLIAGE_SHAPE: OrnamentShape = OrnamentShape::Diamond;
/// Foliage base scale, smaller than the ornaments.
pub const FOLIAGE_SCALE: f32 = 0.8;
/// Foliage scale variance.
pub const FOLIAGE_SCALE_VARIANCE: f32 = 0.5;
/// Dark and light emerald mixed into the foliage after `tree_color`.
pub const FOLIAGE_SHADES: [u32; 2] = [0x024004, 0x067C0A];
/// World position of the tree's local origin.
pub const TREE_ORIGIN: Vec3 = Vec3::new(0.0, -2.0, 0.0);

/// Role of a layer in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Foliage,
    Ornament(OrnamentShape),
}

/// A field together with its identity.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    generation: u64,
    field: ParticleField,
}

impl Layer {
    #[inline]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Build number of the field; changes whenever the field is rebuilt.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn field(&self) -> &ParticleField {
        &self.field
    }
}

/// What [`FieldComposer::apply_config`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconfiguration {
    /// Ornament layers built from scratch.
    pub rebuilt: Vec<OrnamentShape>,
    /// Ornament layers kept with only a palette update.
    pub kept: Vec<OrnamentShape>,
    /// Ornament layers dropped because their shape was deselected.
    pub removed: Vec<OrnamentShape>,
}

/// Owns and drives all particle layers of the tree.
#[derive(Debug, Clone)]
pub struct FieldComposer {
    foliage: Layer,
    ornaments: Vec<Layer>,
    spawner: SpawnContext,
    next_generation: u64,
    origin: Vec3,
    formed: bool,
    pointer: Pointer,
}

/// The foliage palette for a given tree colour.
pub fn foliage_palette(tree_color: Color) -> Vec<Color> {
    let mut palette = vec![tree_color];
    palette.extend(FOLIAGE_SHADES.iter().copied().map(Color::from_hex_u32));
    palette
}

impl FieldComposer {
    /// Compose a tree with a clock-seeded random source.
    pub fn new(config: &TreeConfig) -> Self {
        Self::with_spawner(config, SpawnContext::from_clock())
    }

    /// Compose a reproducible tree.
    pub fn with_seed(config: &TreeConfig, seed: u64) -> Self {
        Self::with_spawner(config, SpawnContext::from_seed(seed))
    }

    fn with_spawner(config: &TreeConfig, mut spawner: SpawnContext) -> Self {
        let foliage_key = FieldKey::new(
            FOLIAGE_SHAPE,
            FOLIAGE_COUNT,
            FOLIAGE_SCALE,
            FOLIAGE_SCALE_VARIANCE,
        );
        let foliage = Layer {
            kind: LayerKind::Foliage,
            generation: 0,
            field: ParticleField::new(
                foliage_key,
                foliage_palette(config.tree_color),
                &mut spawner.fork(),
            ),
        };

        let mut composer = Self {
            foliage,
            ornaments: Vec::new(),
            spawner,
            next_generation: 1,
            origin: TREE_ORIGIN,
            formed: false,
            pointer: Pointer::default(),
        };
        composer.apply_config(config);
        composer
    }

    /// Bring the layers in line with `config`, rebuilding only layers whose
    /// key changed.
    pub fn apply_config(&mut self, config: &TreeConfig) -> Reconfiguration {
        self.foliage.field.set_palette(&foliage_palette(config.tree_color));

        let share = config.particles_per_shape();
        let mut previous: Vec<Option<Layer>> = self.ornaments.drain(..).map(Some).collect();
        let mut report = Reconfiguration::default();

        for &shape in &config.ornament_shapes {
            let key = FieldKey::new(
                shape,
                share,
                config.ornament_scale,
                config.ornament_scale_variance,
            );

            let reusable = previous
                .iter_mut()
                .find(|slot| matches!(slot, Some(layer) if layer.field.key() == key))
                .and_then(Option::take);

            let layer = match reusable {
                Some(mut layer) => {
                    layer.field.set_palette(&config.ornament_colors);
                    report.kept.push(shape);
                    layer
                }
                None => {
                    let generation = self.next_generation;
                    self.next_generation += 1;
                    report.rebuilt.push(shape);
                    Layer {
                        kind: LayerKind::Ornament(shape),
                        generation,
                        field: ParticleField::new(
                            key,
                            config.ornament_colors.clone(),
                            &mut self.spawner.fork(),
                        ),
                    }
                }
            };
            self.ornaments.push(layer);
        }

        for layer in previous.into_iter().flatten() {
            if let LayerKind::Ornament(shape) = layer.kind {
                if !config.ornament_shapes.contains(&shape) {
                    report.removed.push(shape);
                }
            }
        }

        if !report.rebuilt.is_empty() || !report.removed.is_empty() {
            debug!(
                rebuilt = ?report.rebuilt,
                removed = ?report.removed,
                per_shape = share,
                "recomposed ornament layers"
            );
        }
        report
    }

    /// Pull every layer towards the tree (`true`) or the chaos cloud.
    pub fn set_formed(&mut self, formed: bool) {
        self.formed = formed;
    }

    #[inline]
    pub fn is_formed(&self) -> bool {
        self.formed
    }

    /// Pointer state used by the next tick.
    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.pointer = pointer;
    }

    #[inline]
    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    /// World position of the tree's local origin.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Advance every layer to scene time `time`.
    pub fn tick(&mut self, time: f32) {
        let frame = FrameInput {
            time,
            formed: self.formed,
            repulsion_center: self.pointer.repulsion_center().map(|c| c - self.origin),
        };

        self.foliage.field.tick(&frame);
        for layer in &mut self.ornaments {
            layer.field.tick(&frame);
        }
    }

    pub fn foliage(&self) -> &Layer {
        &self.foliage
    }

    pub fn ornaments(&self) -> &[Layer] {
        &self.ornaments
    }

    pub fn ornament(&self, shape: OrnamentShape) -> Option<&Layer> {
        self.ornaments
            .iter()
            .find(|layer| layer.kind == LayerKind::Ornament(shape))
    }

    /// Foliage first, then ornaments in selection order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::once(&self.foliage).chain(self.ornaments.iter())
    }

    /// Total instances across all layers.
    pub fn instance_count(&self) -> usize {
        self.layers().map(|layer| layer.field.len()).sum()
    }

    /// Append every layer's GPU records, foliage first.
    pub fn write_raw(&self, out: &mut Vec<InstanceRaw>) {
        for layer in self.layers() {
            layer.field.write_raw(out);
        }
    }
}
