//! # Christmas Glow
//!
//! A kinetic particle Christmas tree that can be exported as a greeting card.
//!
//! Thousands of small primitives drift in a chaotic cloud and, when the tree
//! is formed, glide into a cone. Every particle's position, spin, scale and
//! colour are functions of elapsed time plus per-particle random seeds, so
//! the whole tree is cheap to animate on the CPU and trivially reproducible.
//!
//! ## Quick Start
//!
//! ```ignore
//! use christmas_glow::prelude::*;
//!
//! let config = TreeConfig::default()
//!     .with_ornament_shapes(vec![OrnamentShape::Star, OrnamentShape::Sphere])
//!     .with_particle_count(2000);
//!
//! let backend = SoftwareBackend::new(1280, 720);
//! let mut scene = TreeScene::with_seed(config, backend, 42, 1.0 / 60.0);
//!
//! let mut exporter = CardExporter::new(NeuQuantizer::default(), GifSink::new());
//! exporter.export(
//!     &mut scene,
//!     &mut NoProgress,
//!     &mut DirectorySink::new("cards"),
//!     &ExportRequest::animated(),
//! )?;
//! ```
//!
//! ## Core Concepts
//!
//! ### Particle fields
//!
//! A [`ParticleField`] is a fixed set of particles of one shape. It is
//! identified by a [`FieldKey`] (shape, count, scale, scale variance): while
//! the key is unchanged the field is only ever recoloured in place, so a
//! palette change never reshuffles the tree.
//!
//! ### Composition
//!
//! The [`FieldComposer`] owns one foliage layer plus one ornament layer per
//! selected shape and keeps them in line with a [`TreeConfig`]. It forwards
//! the formed flag and the pointer to every layer each tick.
//!
//! ### Export
//!
//! [`StillExporter`] and [`LoopExporter`] drive any [`ExportHost`] (usually a
//! [`TreeScene`]) through settle, capture and encode. See [`export`] for the
//! procedure and its guarantees.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`field`] | Particles, field keys, instance output |
//! | [`composer`] | Layer ownership and reconfiguration |
//! | [`config`] | User-editable tree configuration |
//! | [`backend`] | Render backends and the software rasterizer |
//! | [`capture`] | Card overlay and scaling |
//! | [`quantize`], [`encode`] | Palette reduction and container encoding |
//! | [`export`] | Still and loop export procedures |
//! | [`scene`] | The assembled, exportable scene |

pub mod backend;
pub mod capture;
pub mod color;
pub mod composer;
pub mod config;
pub mod encode;
pub mod error;
pub mod export;
pub mod field;
mod glyphs;
pub mod input;
pub mod quantize;
pub mod scene;
pub mod shape;
pub mod snow;
mod spawn;
pub mod time;

pub use backend::{Camera, RenderBackend, SceneView, SoftwareBackend};
pub use bytemuck;
pub use capture::{CaptureComposer, DEFAULT_MESSAGE};
pub use color::{Color, PalettePreset};
pub use composer::{FieldComposer, Layer, LayerKind, Reconfiguration};
pub use config::TreeConfig;
pub use encode::{AnimatedEncoder, GifSink};
pub use error::{ConfigError, EncodingError, ExportError};
pub use export::{
    AssetSink, CardExporter, DirectorySink, ExportHost, ExportKind, ExportPhase, ExportRequest, ExportedAsset,
    LoopExporter, LoopSettings, MemorySink, NoProgress, ProgressSink, ProgressTrace, StillExporter,
};
pub use field::{FieldKey, FrameInput, Instance, InstanceRaw, Particle, ParticleField};
pub use glam::{Vec2, Vec3, Vec4};
pub use glyphs::TitleFont;
pub use input::Pointer;
pub use quantize::{IndexedFrame, NeuQuantizer, Quantizer};
pub use scene::TreeScene;
pub use shape::{OrnamentShape, Primitive};
pub use snow::Snowfall;
pub use spawn::SpawnContext;
pub use time::Clock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use christmas_glow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{RenderBackend, SoftwareBackend};
    pub use crate::color::{Color, PalettePreset};
    pub use crate::composer::FieldComposer;
    pub use crate::config::TreeConfig;
    pub use crate::encode::{AnimatedEncoder, GifSink};
    pub use crate::error::{ConfigError, EncodingError, ExportError};
    pub use crate::export::{
        AssetSink, CardExporter, DirectorySink, ExportHost, ExportKind, ExportRequest, LoopExporter, LoopSettings,
        MemorySink, NoProgress, ProgressSink, ProgressTrace, StillExporter,
    };
    pub use crate::input::Pointer;
    pub use crate::quantize::{NeuQuantizer, Quantizer};
    pub use crate::scene::TreeScene;
    pub use crate::shape::OrnamentShape;
    pub use crate::spawn::SpawnContext;
    pub use crate::time::Clock;
    pub use crate::{Vec2, Vec3, Vec4};
}
