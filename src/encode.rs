//! Frame encoders.
//!
//! [`AnimatedEncoder`] is the seam between the loop exporter and a
//! container format: the exporter opens a stream with `begin`, pushes
//! indexed frames, then either `finish`es it into bytes or `abort`s and
//! drops everything buffered so far. [`GifSink`] writes an infinitely
//! looping GIF. Stills go through [`encode_jpeg`].

use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tiny_skia::Pixmap;

use crate::error::EncodingError;
use crate::quantize::IndexedFrame;

/// JPEG quality for still cards.
pub const STILL_QUALITY: u8 = 95;

/// Streams indexed frames into an animated container.
pub trait AnimatedEncoder {
    /// Start a new stream. Any previous unfinished stream is discarded.
    fn begin(&mut self, width: u32, height: u32) -> Result<(), EncodingError>;

    /// Append one frame shown for `delay_ms` milliseconds.
    fn write_frame(&mut self, frame: &IndexedFrame, delay_ms: f32) -> Result<(), EncodingError>;

    /// Close the stream and return the encoded bytes.
    fn finish(&mut self) -> Result<Vec<u8>, EncodingError>;

    /// Drop the current stream without producing output.
    fn abort(&mut self);
}

/// GIF encoder producing an infinitely looping animation.
#[derive(Default)]
pub struct GifSink {
    stream: Option<gif::Encoder<Vec<u8>>>,
    width: u16,
    height: u16,
    frames: usize,
}

impl std::fmt::Debug for GifSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifSink")
            .field("open", &self.stream.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frames)
            .finish()
    }
}

impl GifSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written to the open stream.
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

/// GIF delays are stored in hundredths of a second.
pub fn delay_centis(delay_ms: f32) -> u16 {
    (delay_ms / 10.0).round().clamp(0.0, u16::MAX as f32) as u16
}

impl AnimatedEncoder for GifSink {
    fn begin(&mut self, width: u32, height: u32) -> Result<(), EncodingError> {
        let dims = || EncodingError::Dimensions { width, height };
        let w = u16::try_from(width).map_err(|_| dims())?;
        let h = u16::try_from(height).map_err(|_| dims())?;
        if w == 0 || h == 0 {
            return Err(dims());
        }

        let mut stream = gif::Encoder::new(Vec::new(), w, h, &[])?;
        stream.set_repeat(gif::Repeat::Infinite)?;

        self.stream = Some(stream);
        self.width = w;
        self.height = h;
        self.frames = 0;
        Ok(())
    }

    fn write_frame(&mut self, frame: &IndexedFrame, delay_ms: f32) -> Result<(), EncodingError> {
        let expected = self.width as usize * self.height as usize;
        let Some(stream) = self.stream.as_mut() else {
            return Err(EncodingError::Dimensions {
                width: 0,
                height: 0,
            });
        };
        if frame.indices.len() != expected {
            return Err(EncodingError::PixelBuffer {
                expected,
                actual: frame.indices.len(),
            });
        }
        if frame.palette.is_empty() || frame.palette.len() > 256 {
            return Err(EncodingError::InvalidPalette(frame.palette.len()));
        }

        let gif_frame = gif::Frame {
            width: self.width,
            height: self.height,
            delay: delay_centis(delay_ms),
            palette: Some(frame.flat_palette()),
            buffer: Cow::Borrowed(&frame.indices),
            ..gif::Frame::default()
        };
        stream.write_frame(&gif_frame)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, EncodingError> {
        let stream = self.stream.take().ok_or(EncodingError::Dimensions {
            width: 0,
            height: 0,
        })?;
        self.frames = 0;
        Ok(stream.into_inner()?)
    }

    fn abort(&mut self) {
        self.stream = None;
        self.frames = 0;
    }
}

/// Flatten a pixmap to straight-alpha RGBA bytes.
pub fn pixmap_rgba(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

/// Encode a pixmap as a JPEG still. Alpha is dropped.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, EncodingError> {
    let rgb: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue()]
        })
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode(
        &rgb,
        pixmap.width(),
        pixmap.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize) -> IndexedFrame {
        IndexedFrame {
            palette: vec![[0, 0, 0], [255, 215, 0]],
            indices: (0..width * height).map(|i| (i % 2) as u8).collect(),
        }
    }

    #[test]
    fn test_delay_centis() {
        assert_eq!(delay_centis(1000.0 / 12.0), 8);
        assert_eq!(delay_centis(100.0), 10);
        assert_eq!(delay_centis(-5.0), 0);
    }

    #[test]
    fn test_gif_header_and_trailer() {
        let mut sink = GifSink::new();
        sink.begin(8, 4).unwrap();
        sink.write_frame(&solid(8, 4), 83.3).unwrap();
        sink.write_frame(&solid(8, 4), 83.3).unwrap();
        assert_eq!(sink.frames_written(), 2);

        let bytes = sink.finish().unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(bytes.last(), Some(&0x3B));
        assert!(!sink.is_open());
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let mut sink = GifSink::new();
        sink.begin(8, 4).unwrap();
        let err = sink.write_frame(&solid(4, 4), 83.3).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::PixelBuffer {
                expected: 32,
                actual: 16
            }
        ));
    }

    #[test]
    fn test_rejects_oversized_dimensions() {
        let mut sink = GifSink::new();
        assert!(matches!(
            sink.begin(70_000, 10),
            Err(EncodingError::Dimensions { .. })
        ));
        assert!(sink.begin(0, 10).is_err());
    }

    #[test]
    fn test_abort_discards_stream() {
        let mut sink = GifSink::new();
        sink.begin(8, 4).unwrap();
        sink.write_frame(&solid(8, 4), 83.3).unwrap();
        sink.abort();
        assert!(!sink.is_open());
        assert!(sink.finish().is_err());
    }

    #[test]
    fn test_jpeg_still() {
        let mut pixmap = Pixmap::new(16, 9).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(255, 215, 0, 255));
        let bytes = encode_jpeg(&pixmap, STILL_QUALITY).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 9));
    }
}
