//! Title typesetting.
//!
//! Card titles are set in an embedded serif italic face and turned into a
//! fillable [`Path`], so the capture overlay can glow and fill them with the
//! same raster calls it uses for everything else. Layout is a single line:
//! advances plus pair kerning, no shaping.

use std::fmt;

use ab_glyph::{Font, FontRef, GlyphId, InvalidFont, OutlineCurve, Point, PxScale, ScaleFont};
use tiny_skia::{Path, PathBuilder};

static TITLE_FACE: &[u8] = include_bytes!("../assets/fonts/DejaVuSerif-BoldItalic.ttf");

/// The embedded title face at a given pixel size.
#[derive(Clone)]
pub struct TitleFont {
    face: FontRef<'static>,
    /// Line height in pixels.
    pub size: f32,
}

impl fmt::Debug for TitleFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleFont").field("size", &self.size).finish()
    }
}

impl TitleFont {
    /// Load the embedded face. Sizes below one pixel clamp to one.
    pub fn embedded(size: f32) -> Result<Self, InvalidFont> {
        Ok(Self {
            face: FontRef::try_from_slice(TITLE_FACE)?,
            size: size.max(1.0),
        })
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.size)
    }

    /// Pixels above the baseline.
    pub fn ascent(&self) -> f32 {
        self.face.as_scaled(self.scale()).ascent()
    }

    /// Pixels below the baseline, negative.
    pub fn descent(&self) -> f32 {
        self.face.as_scaled(self.scale()).descent()
    }

    /// Advance width of `text` in pixels, kerning included.
    pub fn measure(&self, text: &str) -> f32 {
        let scaled = self.face.as_scaled(self.scale());
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Outline `text` centred on `(cx, cy)`. Returns `None` when nothing
    /// is drawable, e.g. blank text.
    pub fn outline(&self, text: &str, cx: f32, cy: f32) -> Option<Path> {
        let scaled = self.face.as_scaled(self.scale());
        let factor = scaled.scale_factor();
        let baseline = cy + (scaled.ascent() + scaled.descent()) / 2.0;

        let mut pb = PathBuilder::new();
        let mut pen = cx - self.measure(text) / 2.0;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                pen += scaled.kern(prev, id);
            }
            // .notdef boxes are skipped
            if id.0 != 0 {
                if let Some(outline) = self.face.outline(id) {
                    let origin = pen;
                    trace(&mut pb, &outline.curves, |p| {
                        (origin + p.x * factor.horizontal, baseline - p.y * factor.vertical)
                    });
                }
            }
            pen += scaled.h_advance(id);
            prev = Some(id);
        }
        pb.finish()
    }
}

/// Append glyph contours to `pb`. Font units are y-up, `map` flips them.
fn trace(pb: &mut PathBuilder, curves: &[OutlineCurve], map: impl Fn(Point) -> (f32, f32)) {
    let mut last: Option<Point> = None;
    for curve in curves {
        let (start, end) = match *curve {
            OutlineCurve::Line(a, b) => (a, b),
            OutlineCurve::Quad(a, _, c) => (a, c),
            OutlineCurve::Cubic(a, _, _, d) => (a, d),
        };
        if last != Some(start) {
            if last.is_some() {
                pb.close();
            }
            let (x, y) = map(start);
            pb.move_to(x, y);
        }
        match *curve {
            OutlineCurve::Line(_, b) => {
                let (x, y) = map(b);
                pb.line_to(x, y);
            }
            OutlineCurve::Quad(_, c, e) => {
                let (x1, y1) = map(c);
                let (x, y) = map(e);
                pb.quad_to(x1, y1, x, y);
            }
            OutlineCurve::Cubic(_, c1, c2, e) => {
                let (x1, y1) = map(c1);
                let (x2, y2) = map(c2);
                let (x, y) = map(e);
                pb.cubic_to(x1, y1, x2, y2, x, y);
            }
        }
        last = Some(end);
    }
    if last.is_some() {
        pb.close();
    }
}
