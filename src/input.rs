//! Pointer input.
//!
//! The scene samples the pointer once per tick instead of reacting to move
//! events, so a recorded pointer trace replays deterministically. Positions
//! are kept in normalized device coordinates: origin at the centre of the
//! view, x to the right, y up, both in `-1..=1`.

use glam::{Vec2, Vec3};

/// Reference plane depth, before scaling, of the pointer repeller.
const REPULSION_DEPTH: f32 = 0.4;
/// Scale from pointer NDC to world units.
const REPULSION_REACH: f32 = 5.0;

/// Normalized pointer state.
///
/// The default pointer rests at the centre of the view, so repulsion is live
/// from the first frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    ndc: Vec2,
    present: bool,
}

impl Pointer {
    /// No pointer over the view; nothing is repelled.
    pub fn absent() -> Self {
        Self {
            ndc: Vec2::ZERO,
            present: false,
        }
    }

    /// A pointer at the given NDC position (clamped to the view).
    pub fn at_ndc(ndc: Vec2) -> Self {
        Self {
            ndc: ndc.clamp(Vec2::NEG_ONE, Vec2::ONE),
            present: true,
        }
    }

    /// A pointer at a pixel position in a `width × height` view, where pixel
    /// y grows downwards.
    pub fn from_pixels(x: f32, y: f32, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::at_ndc(Vec2::ZERO);
        }
        Self::at_ndc(Vec2::new(
            (x / width as f32) * 2.0 - 1.0,
            1.0 - (y / height as f32) * 2.0, // Y flipped
        ))
    }

    #[inline]
    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// World-space centre of the pointer repeller.
    ///
    /// The pointer is placed on a fixed reference plane in front of the tree
    /// and scaled out to world units, so the repeller sweeps roughly the
    /// visible width of the tree while staying slightly towards the camera.
    pub fn repulsion_center(&self) -> Option<Vec3> {
        self.present
            .then(|| Vec3::new(self.ndc.x, self.ndc.y, REPULSION_DEPTH) * REPULSION_REACH)
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::at_ndc(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_to_ndc() {
        let centre = Pointer::from_pixels(400.0, 300.0, 800, 600);
        assert!(centre.ndc().length() < 1e-6);

        let top_left = Pointer::from_pixels(0.0, 0.0, 800, 600);
        assert_eq!(top_left.ndc(), Vec2::new(-1.0, 1.0));

        let outside = Pointer::from_pixels(1600.0, 900.0, 800, 600);
        assert_eq!(outside.ndc(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_default_pointer_is_centred() {
        let p = Pointer::default();
        assert!(p.is_present());
        assert_eq!(p.ndc(), Vec2::ZERO);
        assert_eq!(p.repulsion_center(), Some(Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn test_absent_pointer_has_no_repeller() {
        assert_eq!(Pointer::absent().repulsion_center(), None);
    }

    #[test]
    fn test_repulsion_center() {
        let p = Pointer::at_ndc(Vec2::new(0.5, -1.0));
        assert_eq!(p.repulsion_center(), Some(Vec3::new(2.5, -5.0, 2.0)));
    }
}
