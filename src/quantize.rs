//! Palette quantization for animated export.
//!
//! GIF frames carry at most 256 colours, so every captured RGBA frame is
//! reduced to a palette plus one index per pixel before it reaches the
//! [`AnimatedEncoder`](crate::encode::AnimatedEncoder). The default
//! [`NeuQuantizer`] trains a fresh NeuQuant network per frame, which keeps
//! the gold title and the glowing ornaments accurate at the cost of a
//! palette that shifts slightly between frames.

use color_quant::NeuQuant;

use crate::error::EncodingError;

/// Largest palette a GIF frame can hold.
pub const MAX_PALETTE: usize = 256;

/// A palettized frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedFrame {
    /// Palette entries as RGB triples.
    pub palette: Vec<[u8; 3]>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
}

impl IndexedFrame {
    /// Palette flattened to `r, g, b, r, g, b, ...`.
    pub fn flat_palette(&self) -> Vec<u8> {
        self.palette.iter().flatten().copied().collect()
    }

    pub fn pixel_count(&self) -> usize {
        self.indices.len()
    }
}

/// Reduces RGBA frames to an indexed palette.
pub trait Quantizer {
    /// Quantize straight-alpha RGBA pixels to at most `max_colors` colours.
    fn quantize(&mut self, rgba: &[u8], max_colors: usize) -> Result<IndexedFrame, EncodingError>;
}

/// Check a request before handing it to a quantizer.
pub fn check_input(rgba: &[u8], max_colors: usize) -> Result<(), EncodingError> {
    if !(2..=MAX_PALETTE).contains(&max_colors) {
        return Err(EncodingError::InvalidPalette(max_colors));
    }
    if rgba.is_empty() || rgba.len() % 4 != 0 {
        return Err(EncodingError::PixelBuffer {
            expected: (rgba.len() / 4).max(1) * 4,
            actual: rgba.len(),
        });
    }
    Ok(())
}

/// NeuQuant neural-network quantizer.
#[derive(Debug, Clone, Copy)]
pub struct NeuQuantizer {
    sample_factor: i32,
}

impl NeuQuantizer {
    /// `sample_factor` trades speed for quality: 1 looks at every pixel,
    /// 30 at every thirtieth.
    pub fn new(sample_factor: i32) -> Self {
        Self {
            sample_factor: sample_factor.clamp(1, 30),
        }
    }

    pub fn sample_factor(&self) -> i32 {
        self.sample_factor
    }

    /// Tiny frames do not have enough pixels to sample sparsely.
    fn effective_sample_factor(&self, pixels: usize) -> i32 {
        let cap = (pixels / 100).max(1).min(i32::MAX as usize) as i32;
        self.sample_factor.min(cap)
    }
}

impl Default for NeuQuantizer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Quantizer for NeuQuantizer {
    fn quantize(&mut self, rgba: &[u8], max_colors: usize) -> Result<IndexedFrame, EncodingError> {
        check_input(rgba, max_colors)?;

        let pixels = rgba.len() / 4;
        let nq = NeuQuant::new(self.effective_sample_factor(pixels), max_colors, rgba);

        let palette = nq
            .color_map_rgb()
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let indices = rgba
            .chunks_exact(4)
            .map(|px| u8::try_from(nq.index_of(px)).unwrap_or(u8::MAX))
            .collect();

        Ok(IndexedFrame { palette, indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(pixels: usize) -> Vec<u8> {
        (0..pixels)
            .flat_map(|i| {
                if i % 2 == 0 {
                    [255, 215, 0, 255]
                } else {
                    [5, 5, 8, 255]
                }
            })
            .collect()
    }

    #[test]
    fn test_rejects_bad_palette_size() {
        let mut q = NeuQuantizer::default();
        assert!(matches!(
            q.quantize(&two_tone(16), 1),
            Err(EncodingError::InvalidPalette(1))
        ));
        assert!(matches!(
            q.quantize(&two_tone(16), 300),
            Err(EncodingError::InvalidPalette(300))
        ));
    }

    #[test]
    fn test_rejects_ragged_buffer() {
        let mut q = NeuQuantizer::default();
        let err = q.quantize(&[1, 2, 3, 4, 5], 16).unwrap_err();
        assert!(matches!(err, EncodingError::PixelBuffer { actual: 5, .. }));
        assert!(q.quantize(&[], 16).is_err());
    }

    #[test]
    fn test_one_index_per_pixel() {
        let mut q = NeuQuantizer::default();
        let frame = q.quantize(&two_tone(4096), 64).unwrap();
        assert_eq!(frame.pixel_count(), 4096);
        assert!(frame.palette.len() <= 64);
        assert!(frame
            .indices
            .iter()
            .all(|&i| (i as usize) < frame.palette.len()));
    }

    #[test]
    fn test_preserves_dominant_colours() {
        let mut q = NeuQuantizer::default();
        let frame = q.quantize(&two_tone(4096), 256).unwrap();

        let gold = frame.palette[frame.indices[0] as usize];
        let dark = frame.palette[frame.indices[1] as usize];
        assert!(gold[0] > 200 && gold[1] > 160 && gold[2] < 60);
        assert!(dark.iter().all(|&c| c < 40));
    }

    #[test]
    fn test_sample_factor_shrinks_for_small_frames() {
        let q = NeuQuantizer::new(10);
        assert_eq!(q.effective_sample_factor(50), 1);
        assert_eq!(q.effective_sample_factor(500), 5);
        assert_eq!(q.effective_sample_factor(100_000), 10);
    }
}
