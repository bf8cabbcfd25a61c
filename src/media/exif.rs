// SPDX-License-Identifier: GPL-3.0-only

//! EXIF orientation helpers for JPEG stills
//!
//! Stills leave the sensor in its native orientation with an EXIF tag telling
//! viewers how to rotate them. Reading the tag is left to the `image` decoder;
//! writing it is only needed by cameras that produce their own JPEGs, so a
//! minimal single-entry APP1 segment is enough.

use crate::backends::camera::types::DeviceOrientation;
use crate::errors::PhotoError;
use image::ImageDecoder;
use image::metadata::Orientation;
use std::io::Cursor;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const ORIENTATION_TAG: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;

/// Orientation recorded in a JPEG, or `NoTransforms` if it has none
pub fn read_orientation(jpeg: &[u8]) -> Result<Orientation, PhotoError> {
    let mut decoder = image::ImageReader::new(Cursor::new(jpeg))
        .with_guessed_format()
        .map_err(|e| PhotoError::DecodeFailed(e.to_string()))?
        .into_decoder()?;
    Ok(decoder.orientation()?)
}

/// EXIF orientation value a rear camera sensor needs for a given device pose
pub fn orientation_for_device(device: DeviceOrientation) -> u16 {
    match device {
        DeviceOrientation::Portrait => 6,
        DeviceOrientation::PortraitUpsideDown => 8,
        DeviceOrientation::LandscapeLeft => 1,
        DeviceOrientation::LandscapeRight => 3,
        DeviceOrientation::Unknown | DeviceOrientation::FaceUp | DeviceOrientation::FaceDown => 1,
    }
}

/// Return a copy of `jpeg` with an EXIF orientation segment.
///
/// The segment goes right after SOI, or after the JFIF APP0 segment when one
/// is present. Data that does not start with SOI is returned unchanged.
pub fn insert_orientation(jpeg: &[u8], exif_value: u16) -> Vec<u8> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        return jpeg.to_vec();
    }

    let mut insert_at = 2;
    if jpeg.len() >= 6 && jpeg[2] == 0xFF && jpeg[3] == APP0 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        if 4 + app0_len <= jpeg.len() {
            insert_at = 4 + app0_len;
        }
    }

    let segment = orientation_segment(exif_value);
    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&segment);
    out.extend_from_slice(&jpeg[insert_at..]);
    out
}

/// APP1 segment holding a big-endian TIFF header and a one-entry IFD0
fn orientation_segment(exif_value: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(32);
    payload.extend_from_slice(b"Exif\0\0");

    // TIFF header: "MM", 42, offset of IFD0
    payload.extend_from_slice(b"MM");
    payload.extend_from_slice(&42u16.to_be_bytes());
    payload.extend_from_slice(&8u32.to_be_bytes());

    // IFD0 with the orientation entry
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.extend_from_slice(&ORIENTATION_TAG.to_be_bytes());
    payload.extend_from_slice(&TYPE_SHORT.to_be_bytes());
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.extend_from_slice(&exif_value.to_be_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&0u32.to_be_bytes());

    let mut segment = Vec::with_capacity(payload.len() + 4);
    segment.extend_from_slice(&[0xFF, APP1]);
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(&payload);
    segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, RgbImage};

    fn encode(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([90, 120, 200]));
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, 90)
            .encode(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        data
    }

    #[test]
    fn test_segment_layout() {
        let segment = orientation_segment(6);
        assert_eq!(&segment[..2], &[0xFF, 0xE1]);
        let len = u16::from_be_bytes([segment[2], segment[3]]) as usize;
        assert_eq!(len, segment.len() - 2);
        assert_eq!(&segment[4..10], b"Exif\0\0");
        assert_eq!(&segment[10..12], b"MM");
    }

    #[test]
    fn test_plain_jpeg_has_no_transform() {
        let jpeg = encode(8, 8);
        assert_eq!(read_orientation(&jpeg).unwrap(), Orientation::NoTransforms);
    }

    #[test]
    fn test_inserted_orientation_reads_back() {
        let jpeg = insert_orientation(&encode(8, 8), 6);
        assert_eq!(read_orientation(&jpeg).unwrap(), Orientation::Rotate90);

        let jpeg = insert_orientation(&encode(8, 8), 3);
        assert_eq!(read_orientation(&jpeg).unwrap(), Orientation::Rotate180);
    }

    #[test]
    fn test_insert_keeps_image_decodable() {
        let jpeg = insert_orientation(&encode(16, 8), 8);
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn test_non_jpeg_is_untouched() {
        let data = b"not a jpeg".to_vec();
        assert_eq!(insert_orientation(&data, 6), data);
    }

    #[test]
    fn test_device_orientation_values() {
        assert_eq!(orientation_for_device(DeviceOrientation::Portrait), 6);
        assert_eq!(orientation_for_device(DeviceOrientation::LandscapeLeft), 1);
        assert_eq!(orientation_for_device(DeviceOrientation::LandscapeRight), 3);
        assert_eq!(orientation_for_device(DeviceOrientation::PortraitUpsideDown), 8);
        assert_eq!(orientation_for_device(DeviceOrientation::FaceUp), 1);
    }
}
