//! Error types for christmas-glow.
//!
//! One enum per concern: configuration loading, frame encoding, and the
//! export procedures that drive capture and encoding. Animation ticks are
//! infallible and have no error type.

use thiserror::Error;

use crate::shape::OrnamentShape;

/// Errors raised while loading or validating a [`TreeConfig`](crate::TreeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or does not match the schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A colour string is not `#RGB` or `#RRGGBB`.
    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),
    /// The ornament palette is empty.
    #[error("At least one ornament color must be selected")]
    NoColors,
    /// The ornament shape set is empty.
    #[error("At least one ornament shape must be selected")]
    NoShapes,
    /// The same shape appears twice in the shape set.
    #[error("Ornament shape '{0}' is selected more than once")]
    DuplicateShape(OrnamentShape),
    /// A numeric setting is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Errors raised by palette quantization or image encoding.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Requested palette size is outside `2..=256`.
    #[error("Invalid palette size {0}, expected 2..=256 colors")]
    InvalidPalette(usize),
    /// Pixel buffer does not match the declared dimensions.
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    PixelBuffer { expected: usize, actual: usize },
    /// Frame dimensions do not fit the container format.
    #[error("Frame size {width}x{height} is not supported by the encoder")]
    Dimensions { width: u32, height: u32 },
    /// The GIF encoder rejected a frame.
    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),
    /// The still-image encoder failed.
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    /// Flushing encoded bytes failed.
    #[error("Failed to write encoded data: {0}")]
    Io(#[from] std::io::Error),
    /// A quantizer implementation reported a failure.
    #[error("Quantization failed: {0}")]
    Quantize(String),
}

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The render surface does not exist or has not produced a frame yet.
    #[error("Render surface is not available")]
    SurfaceUnavailable,
    /// An offscreen drawing surface could not be allocated.
    #[error("Could not create drawing context: {0}")]
    ContextCreationFailed(String),
    /// Quantization or encoding failed; no partial output is kept.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The finished asset could not be handed to its destination.
    #[error("Failed to save exported card: {0}")]
    Delivery(std::io::Error),
}
