//! Card composition.
//!
//! Turns a rendered surface into a greeting card: the surface is scaled into
//! an offscreen canvas, darkened towards the bottom edge, and titled with a
//! glowing gold caption. Composition is a pure function of the source
//! surface, the canvas size and the title.

use tiny_skia::{
    Color as SkColor, FillRule, FilterQuality, GradientStop, LineCap, LineJoin, LinearGradient, Paint, Pixmap,
    PixmapPaint, Point, Rect, SpreadMode, Stroke, Transform,
};
use tracing::warn;

use crate::error::ExportError;
use crate::glyphs::TitleFont;

/// Title drawn on exported cards.
pub const DEFAULT_MESSAGE: &str = "MERRY CHRISTMAS";

/// Fraction of the height where the bottom shade starts.
const SHADE_START: f32 = 0.6;
/// Opacity of the shade at the bottom edge.
const SHADE_ALPHA: f32 = 0.8;
/// Vertical position of the title, as a fraction of the height.
const TITLE_Y: f32 = 0.82;
const TITLE_MIN_SIZE: f32 = 24.0;
const TITLE_SIZE_RATIO: f32 = 0.08;
const GLOW_BLUR_RATIO: f32 = 0.03;
const GLOW_ALPHA: f32 = 0.6;
const GLOW_PASSES: u32 = 6;
const GOLD: [u8; 3] = [0xFF, 0xD7, 0x00];

/// Canvas size for a capture `target_width` pixels wide that keeps the
/// source aspect ratio. Height is rounded down and never below one pixel.
pub fn target_size(source_width: u32, source_height: u32, target_width: u32) -> (u32, u32) {
    if source_width == 0 {
        return (target_width.max(1), 1);
    }
    let height = (source_height as u64 * target_width as u64) / source_width as u64;
    (target_width.max(1), (height as u32).max(1))
}

/// Allocate a blank canvas.
pub fn canvas(width: u32, height: u32) -> Result<Pixmap, ExportError> {
    Pixmap::new(width, height)
        .ok_or_else(|| ExportError::ContextCreationFailed(format!("{width}x{height} canvas")))
}

/// Draw `source` scaled to fill `canvas` with bilinear filtering.
pub fn draw_scaled(canvas: &mut Pixmap, source: &Pixmap) {
    canvas.fill(SkColor::TRANSPARENT);
    let sx = canvas.width() as f32 / source.width() as f32;
    let sy = canvas.height() as f32 / source.height() as f32;
    canvas.draw_pixmap(
        0,
        0,
        source.as_ref(),
        &PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        },
        Transform::from_scale(sx, sy),
        None,
    );
}

/// Draws the card overlay: bottom shade plus glowing title.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureComposer {
    title: String,
}

impl Default for CaptureComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE)
    }
}

impl CaptureComposer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Title size in pixels on a canvas `width` pixels wide.
    pub fn title_size(width: u32) -> f32 {
        TITLE_MIN_SIZE.max(width as f32 * TITLE_SIZE_RATIO)
    }

    /// Scale `source` into `canvas` and draw the overlay over it.
    pub fn compose(&self, canvas: &mut Pixmap, source: &Pixmap) {
        draw_scaled(canvas, source);
        self.draw_overlay(canvas);
    }

    pub fn draw_overlay(&self, canvas: &mut Pixmap) {
        self.draw_shade(canvas);
        self.draw_title(canvas);
    }

    fn draw_shade(&self, canvas: &mut Pixmap) {
        let w = canvas.width() as f32;
        let h = canvas.height() as f32;

        let Some(shader) = LinearGradient::new(
            Point::from_xy(0.0, h * SHADE_START),
            Point::from_xy(0.0, h),
            vec![
                GradientStop::new(0.0, SkColor::from_rgba8(0, 0, 0, 0)),
                GradientStop::new(1.0, SkColor::from_rgba8(0, 0, 0, (SHADE_ALPHA * 255.0) as u8)),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };
        let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) else {
            return;
        };

        let paint = Paint {
            shader,
            anti_alias: false,
            ..Paint::default()
        };
        canvas.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn draw_title(&self, canvas: &mut Pixmap) {
        let w = canvas.width() as f32;
        let h = canvas.height() as f32;
        let font = match TitleFont::embedded(Self::title_size(canvas.width())) {
            Ok(font) => font,
            Err(err) => {
                warn!(%err, "title face unavailable, card left untitled");
                return;
            }
        };
        let Some(path) = font.outline(&self.title, w / 2.0, h * TITLE_Y) else {
            return;
        };

        let [r, g, b] = GOLD;
        let mut paint = Paint::default();
        paint.anti_alias = true;
        let mut stroke = Stroke {
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        // Wide faint strokes around the glyphs stand in for a shadow blur.
        let blur = w * GLOW_BLUR_RATIO;
        let pass_alpha = GLOW_ALPHA / GLOW_PASSES as f32;
        for pass in (1..=GLOW_PASSES).rev() {
            stroke.width = 2.0 * blur * pass as f32 / GLOW_PASSES as f32;
            paint.set_color_rgba8(r, g, b, (pass_alpha * 255.0) as u8);
            canvas.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        paint.set_color_rgba8(r, g, b, 255);
        canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}
