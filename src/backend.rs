//! Render backends.
//!
//! A backend consumes the per-instance output of the [`FieldComposer`] and
//! draws it into a raster surface that exporters can read back. The crate
//! ships a CPU [`SoftwareBackend`] that splats every instance as a flat
//! silhouette with an additive glow; GPU backends can upload
//! [`InstanceRaw`](crate::field::InstanceRaw) records via
//! [`FieldComposer::write_raw`] instead.

use glam::{Mat4, Vec2, Vec3, Vec4};
use tiny_skia::{BlendMode, FillRule, Paint, Path, PathBuilder, Pixmap, Transform};
use tracing::warn;

use crate::color::Color;
use crate::composer::FieldComposer;
use crate::shape::{star_outline, Primitive};
use crate::snow::{Snowfall, FLAKE_RADIUS};

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub composer: &'a FieldComposer,
    pub snow: Option<&'a Snowfall>,
    pub bloom_intensity: f32,
}

/// Draws scene frames and exposes the result as a raster surface.
pub trait RenderBackend {
    /// Draw one frame.
    fn draw(&mut self, view: &SceneView<'_>);

    /// The last drawn frame, or `None` before anything has been drawn.
    fn surface(&self) -> Option<&Pixmap>;

    /// Called when an export starts or stops capturing.
    fn set_recording(&mut self, _recording: bool) {}
}

/// Perspective camera looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 20.0),
            target: Vec3::ZERO,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
            * Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }
}

/// A projected instance.
#[derive(Debug, Clone, Copy)]
struct Splat {
    center: Vec2,
    radius: f32,
    depth: f32,
    spin: f32,
    color: Color,
    primitive: Primitive,
}

const BACKGROUND: u32 = 0x050508;
const GLOW_THRESHOLD: f32 = 0.55;
const GLOW_SPREAD: f32 = 3.0;
const GLOW_STRENGTH: f32 = 0.12;

/// CPU rasterizer for headless rendering.
#[derive(Debug)]
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    recording_pixel_ratio: f32,
    recording: bool,
    camera: Camera,
    surface: Option<Pixmap>,
    splats: Vec<Splat>,
}

impl SoftwareBackend {
    /// A backend with a logical view size of `width × height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            recording_pixel_ratio: 0.75,
            recording: false,
            camera: Camera::default(),
            surface: None,
            splats: Vec::new(),
        }
    }

    /// Surface resolution multipliers for live viewing and for capture.
    ///
    /// Capturing at a lower ratio keeps frame times steady while the
    /// exporter is also quantizing and encoding.
    pub fn with_pixel_ratio(mut self, live: f32, recording: f32) -> Self {
        self.pixel_ratio = live.max(0.1);
        self.recording_pixel_ratio = recording.max(0.1);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Pixel size of the surface the next frame is drawn into.
    pub fn surface_size(&self) -> (u32, u32) {
        let ratio = if self.recording {
            self.recording_pixel_ratio
        } else {
            self.pixel_ratio
        };
        (
            (self.width as f32 * ratio).round() as u32,
            (self.height as f32 * ratio).round() as u32,
        )
    }


    fn project(&mut self, view: &SceneView<'_>, w: f32, h: f32) {
        self.splats.clear();

        let view_proj = self.camera.view_proj(w / h);
        let focal = (h * 0.5) / (self.camera.fov_y * 0.5).tan();
        let origin = view.composer.origin();

        let mut push = |world: Vec3, radius: f32, spin: f32, color: Color, primitive: Primitive| {
            let clip = view_proj * Vec4::new(world.x, world.y, world.z, 1.0);
            if clip.w <= self.camera.near {
                return;
            }
            let ndc = clip.truncate() / clip.w;
            self.splats.push(Splat {
                center: Vec2::new((ndc.x * 0.5 + 0.5) * w, (0.5 - ndc.y * 0.5) * h),
                radius: radius * focal / clip.w,
                depth: clip.w,
                spin,
                color,
                primitive,
            });
        };

        if let Some(snow) = view.snow {
            let flake = Primitive::Octahedron {
                radius: FLAKE_RADIUS,
            };
            let spin = snow.rotation().y;
            for f in snow.flakes() {
                push(f.position, FLAKE_RADIUS * 2.0, spin, Color::WHITE, flake);
            }
        }

        for layer in view.composer.layers() {
            let primitive = layer.field().primitive();
            let size = primitive.bounding_radius() * primitive.coverage().sqrt();
            for inst in layer.field().instances() {
                // cheap metallic glint from the spin
                let shade = 0.7 + 0.3 * (inst.rotation.x.sin() * 0.5 + 0.5);
                let lit = inst.color.to_vec3() * shade;
                push(
                    inst.position + origin,
                    size * inst.scale,
                    inst.rotation.y,
                    Color::new(lit.x, lit.y, lit.z),
                    primitive,
                );
            }
        }

        // far to near
        self.splats
            .sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(std::cmp::Ordering::Equal));
    }
}

/// Reallocate `surface` if its size no longer matches.
fn prepare_surface(surface: &mut Option<Pixmap>, w: u32, h: u32) -> Option<&mut Pixmap> {
    let stale = surface
        .as_ref()
        .map_or(true, |s| s.width() != w || s.height() != h);
    if stale {
        *surface = Pixmap::new(w, h);
        if surface.is_none() {
            warn!(width = w, height = h, "cannot allocate render surface");
        }
    }
    surface.as_mut()
}

fn splat_path(splat: &Splat) -> Option<Path> {
    let Splat {
        center, radius, spin, ..
    } = *splat;

    let polygon = |points: &[Vec2]| {
        let (sin, cos) = spin.sin_cos();
        let mut pb = PathBuilder::new();
        for (i, p) in points.iter().enumerate() {
            let rotated = Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);
            let q = center + rotated * radius;
            if i == 0 {
                pb.move_to(q.x, q.y);
            } else {
                pb.line_to(q.x, q.y);
            }
        }
        pb.close();
        pb.finish()
    };

    match splat.primitive {
        Primitive::Sphere { .. } => PathBuilder::from_circle(center.x, center.y, radius),
        Primitive::Octahedron { .. } => polygon(&[
            Vec2::new(0.0, -1.0),
            Vec2::new(0.7, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-0.7, 0.0),
        ]),
        Primitive::Box { size } => {
            let half = Vec2::new(size.x, size.y).normalize_or_zero();
            polygon(&[
                Vec2::new(-half.x, -half.y),
                Vec2::new(half.x, -half.y),
                Vec2::new(half.x, half.y),
                Vec2::new(-half.x, half.y),
            ])
        }
        Primitive::Cone { sides, .. } => {
            let sides = sides.max(3);
            let points: Vec<Vec2> = (0..sides)
                .map(|i| {
                    let a = i as f32 / sides as f32 * std::f32::consts::TAU - std::f32::consts::FRAC_PI_2;
                    Vec2::new(a.cos(), a.sin())
                })
                .collect();
            polygon(&points)
        }
        Primitive::ExtrudedStar {
            outer_radius,
            inner_radius,
            points,
            ..
        } => polygon(&star_outline(1.0, inner_radius / outer_radius, points)),
    }
}

fn luminance(color: Color) -> f32 {
    0.2126 * color.r() + 0.7152 * color.g() + 0.0722 * color.b()
}

impl RenderBackend for SoftwareBackend {
    fn draw(&mut self, view: &SceneView<'_>) {
        let (w, h) = self.surface_size();
        if w == 0 || h == 0 {
            return;
        }
        self.project(view, w as f32, h as f32);

        let Some(surface) = prepare_surface(&mut self.surface, w, h) else {
            return;
        };
        surface.fill(Color::from_hex_u32(BACKGROUND).into());

        let mut core = Paint::default();
        core.anti_alias = true;
        let mut glow = Paint::default();
        glow.anti_alias = true;
        glow.blend_mode = BlendMode::Plus;

        for splat in &self.splats {
            if splat.radius < 0.05 {
                continue;
            }
            let [r, g, b, _] = splat.color.to_rgba8();

            let l = luminance(splat.color);
            if l > GLOW_THRESHOLD && view.bloom_intensity > 0.0 {
                let strength = ((l - GLOW_THRESHOLD) / (1.0 - GLOW_THRESHOLD))
                    * GLOW_STRENGTH
                    * view.bloom_intensity;
                let alpha = (strength.clamp(0.0, 1.0) * 255.0) as u8;
                if alpha > 0 {
                    if let Some(halo) = PathBuilder::from_circle(
                        splat.center.x,
                        splat.center.y,
                        splat.radius * GLOW_SPREAD,
                    ) {
                        glow.set_color_rgba8(r, g, b, alpha);
                        surface.fill_path(&halo, &glow, FillRule::Winding, Transform::identity(), None);
                    }
                }
            }

            if let Some(path) = splat_path(splat) {
                core.set_color_rgba8(r, g, b, 255);
                surface.fill_path(&path, &core, FillRule::Winding, Transform::identity(), None);
            }
        }
    }

    fn surface(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }

    fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }
}
