// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding and persistence for normalized photos

use crate::errors::PhotoError;
use crate::storage;
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info};

/// Encode an RGB image as JPEG at `quality` (1-100)
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PhotoError::EncodingFailed(e.to_string()))?;

    debug!(
        width = image.width(),
        height = image.height(),
        size = buffer.len(),
        quality,
        "Encoding complete"
    );
    Ok(buffer)
}

/// Write encoded bytes to `path`, replacing any existing file atomically
pub fn save(path: &Path, data: &[u8]) -> Result<(), PhotoError> {
    storage::write_atomic(path, data)?;
    info!(path = %path.display(), size = data.len(), "Photo saved");
    Ok(())
}
