// SPDX-License-Identifier: GPL-3.0-only

//! Orientation normalization for captured stills
//!
//! Sensors deliver stills in their native orientation plus an EXIF tag. The
//! persisted file carries no tag, so the pixels themselves are rotated
//! upright here.

use crate::errors::PhotoError;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Decoded still with its pixels upright
pub struct NormalizedPhoto {
    pub image: RgbImage,
    /// Orientation tag the sample carried before normalization
    pub source_orientation: Orientation,
}

impl NormalizedPhoto {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode a JPEG sample and bake its EXIF orientation into the pixels
pub fn normalize(jpeg: &[u8]) -> Result<NormalizedPhoto, PhotoError> {
    let mut decoder = ImageReader::new(Cursor::new(jpeg))
        .with_guessed_format()
        .map_err(|e| PhotoError::DecodeFailed(e.to_string()))?
        .into_decoder()?;

    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;

    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "Re-rendering still upright");
        image.apply_orientation(orientation);
    }

    Ok(NormalizedPhoto {
        image: image.to_rgb8(),
        source_orientation: orientation,
    })
}
