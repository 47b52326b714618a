//! Image decode/encode, backed by the `image` crate.
//!
//! Sources are decoded to 8-bit RGB and turned a quarter clockwise before
//! anything else sees them; all later geometry works on the rotated grid.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, imageops};
use thiserror::Error;

use crate::canvas::ImageRect;

/// Errors that can occur while reading a source image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not an image format we can decode.
    #[error("Invalid or unsupported image format: {0}")]
    InvalidFormat(String),
}

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Decode an in-memory image to RGB8.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| DecodeError::InvalidFormat(e.to_string()))?;
    Ok(image.to_rgb8())
}

/// Read, decode and rotate a source file.
pub fn load(path: &Path) -> Result<RgbImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decode(&bytes)?;
    Ok(imageops::rotate90(&image))
}

/// Copy the square `rect` out of `image`. `rect` must lie inside the image.
pub fn extract(image: &RgbImage, rect: ImageRect) -> RgbImage {
    imageops::crop_imm(image, rect.x, rect.y, rect.size, rect.size).to_image()
}

/// Encode an RGB image as JPEG bytes.
///
/// `quality` is clamped to 1-100.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}
