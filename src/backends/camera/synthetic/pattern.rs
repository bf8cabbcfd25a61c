// SPDX-License-Identifier: GPL-3.0-only

//! Test pattern rendering for the synthetic camera

use crate::backends::camera::types::{BackendError, BackendResult};
use crate::constants::jpeg;
use crate::media::exif;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};

/// Color bars as R, G, B: white, yellow, cyan, green, magenta, red, blue, black
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

fn bar_at(x: u32, width: u32) -> [u8; 3] {
    let index = (x as usize * BARS.len()) / width.max(1) as usize;
    BARS[index.min(BARS.len() - 1)]
}

/// Fill a tightly packed BGRA buffer with color bars and a sweep line
/// that advances one column per frame.
///
/// `buf` is resized to `width * height * 4`.
pub fn fill_bgra(buf: &mut Vec<u8>, width: u32, height: u32, frame: u64) {
    let row_len = width as usize * 4;
    buf.resize(row_len * height as usize, 0);
    if width == 0 {
        return;
    }

    let sweep = (frame % width as u64) as usize;

    for row in buf.chunks_exact_mut(row_len) {
        for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
            let [r, g, b] = if x == sweep {
                [255, 255, 255]
            } else {
                bar_at(x as u32, width)
            };
            pixel.copy_from_slice(&[b, g, r, 255]);
        }
    }
}

/// Still image in sensor orientation
pub fn still_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| Rgb(bar_at(x, width)))
}

/// Encode a still as the photo output would deliver it: a JPEG carrying
/// the EXIF orientation of the device at capture time.
pub fn encode_still(width: u32, height: u32, exif_orientation: u16) -> BackendResult<Vec<u8>> {
    let image = still_rgb(width, height);

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, jpeg::SAMPLE_QUALITY)
        .encode(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::CaptureFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(exif::insert_orientation(&data, exif_orientation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_bgra_size_and_alpha() {
        let mut buf = Vec::new();
        fill_bgra(&mut buf, 16, 4, 0);
        assert_eq!(buf.len(), 16 * 4 * 4);
        assert!(buf.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_sweep_line_moves() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        fill_bgra(&mut a, 16, 1, 3);
        fill_bgra(&mut b, 16, 1, 4);
        assert_ne!(a, b);
        assert_eq!(&a[3 * 4..3 * 4 + 4], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_encode_still_is_jpeg() {
        let data = encode_still(32, 16, 1).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        let img = image::load_from_memory(&data).unwrap();
        assert_eq!((img.width(), img.height()), (32, 16));
    }
}
