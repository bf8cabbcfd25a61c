// SPDX-License-Identifier: GPL-3.0-only

//! Photo completion pipeline
//!
//! ```text
//! JPEG sample → decode → orientation normalization → JPEG (q100) → atomic write
//! ```
//!
//! Runs on the backend's photo callback thread. Nothing here reports back to
//! the caller that requested the capture: every failure is logged and the
//! request is dropped.

pub mod encoding;
pub mod processing;

use crate::backends::camera::types::{BackendResult, JpegSample, PhotoRequest};
use crate::constants::jpeg;
use crate::errors::PhotoError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Turns photo completions into files
pub struct PhotoPipeline {
    /// Held for the whole of one completion
    serial: Mutex<()>,
    saved: AtomicU64,
    failed: AtomicU64,
}

impl PhotoPipeline {
    pub fn new() -> Self {
        Self {
            serial: Mutex::new(()),
            saved: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Handle one completion. Completions are processed one at a time.
    pub fn on_photo_capture_complete(&self, request: PhotoRequest, result: BackendResult<JpegSample>) {
        let _serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());

        let outcome = result
            .map_err(PhotoError::from)
            .and_then(|sample| self.persist(&request, &sample));

        match outcome {
            Ok(()) => {
                self.saved.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    id = request.id,
                    path = %request.path.display(),
                    error = %e,
                    "Photo capture dropped"
                );
            }
        }
    }

    /// Normalize, re-encode at maximum quality and write one sample to the
    /// request's path
    pub fn persist(&self, request: &PhotoRequest, sample: &JpegSample) -> Result<(), PhotoError> {
        debug!(id = request.id, size = sample.data.len(), "Processing photo sample");

        let photo = processing::normalize(&sample.data)?;
        let data = encoding::encode_jpeg(&photo.image, jpeg::MAX_QUALITY)?;
        encoding::save(&request.path, &data)
    }

    /// Photos written so far
    pub fn saved_count(&self) -> u64 {
        self.saved.load(Ordering::Relaxed)
    }

    /// Completions dropped because of an error
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{BackendError, FlashMode};
    use crate::media::exif;
    use image::metadata::Orientation;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::{Arc, Barrier};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("camera-support-{}.jpg", uuid::Uuid::new_v4()))
    }

    fn request(path: PathBuf) -> PhotoRequest {
        PhotoRequest {
            id: 1,
            path,
            flash_mode: FlashMode::Auto,
        }
    }

    fn sample(exif_orientation: u16) -> JpegSample {
        let img = RgbImage::from_pixel(32, 16, Rgb([120, 60, 200]));
        let data = encoding::encode_jpeg(&img, 90).unwrap();
        JpegSample {
            data: exif::insert_orientation(&data, exif_orientation),
        }
    }

    #[test]
    fn test_completion_writes_upright_jpeg() {
        let path = temp_path();
        let pipeline = PhotoPipeline::default();

        pipeline.on_photo_capture_complete(request(path.clone()), Ok(sample(6)));

        let data = std::fs::read(&path).unwrap();
        assert_eq!(exif::read_orientation(&data).unwrap(), Orientation::NoTransforms);
        let img = image::load_from_memory(&data).unwrap();
        assert_eq!((img.width(), img.height()), (16, 32));
        assert_eq!(pipeline.saved_count(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_hardware_error_writes_nothing() {
        let path = temp_path();
        let pipeline = PhotoPipeline::default();

        pipeline.on_photo_capture_complete(
            request(path.clone()),
            Err(BackendError::CaptureFailed("sensor".into())),
        );

        assert!(!path.exists());
        assert_eq!(pipeline.failed_count(), 1);
    }

    #[test]
    fn test_undecodable_sample_is_dropped() {
        let path = temp_path();
        let pipeline = PhotoPipeline::default();

        pipeline.on_photo_capture_complete(
            request(path.clone()),
            Ok(JpegSample {
                data: vec![0xFF, 0xD8, 0x00],
            }),
        );

        assert!(!path.exists());
        assert_eq!(pipeline.failed_count(), 1);
    }

    /// Red left half, blue right half, tagged with `exif_orientation`
    fn split_sample(width: u32, height: u32, exif_orientation: u16) -> JpegSample {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let data = encoding::encode_jpeg(&img, 95).unwrap();
        JpegSample {
            data: exif::insert_orientation(&data, exif_orientation),
        }
    }

    fn is_red(pixel: &Rgb<u8>) -> bool {
        pixel[0] > 150 && pixel[2] < 100
    }

    #[test]
    fn test_overlapping_completions_each_land_upright() {
        let pipeline = Arc::new(PhotoPipeline::new());
        let barrier = Arc::new(Barrier::new(2));

        // Right turn moves the red half to the top, left turn to the bottom
        let jobs = [(temp_path(), 48, 16, 6u16), (temp_path(), 64, 24, 8u16)];

        let handles: Vec<_> = jobs
            .iter()
            .enumerate()
            .map(|(i, (path, width, height, tag))| {
                let pipeline = Arc::clone(&pipeline);
                let barrier = Arc::clone(&barrier);
                let request = PhotoRequest {
                    id: i as u64 + 1,
                    path: path.clone(),
                    flash_mode: FlashMode::Off,
                };
                let sample = split_sample(*width, *height, *tag);
                std::thread::spawn(move || {
                    barrier.wait();
                    pipeline.on_photo_capture_complete(request, Ok(sample));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pipeline.saved_count(), 2);
        assert_eq!(pipeline.failed_count(), 0);

        for (path, width, height, tag) in &jobs {
            let data = std::fs::read(path).unwrap();
            assert_eq!(exif::read_orientation(&data).unwrap(), Orientation::NoTransforms);

            let img = image::load_from_memory(&data).unwrap().to_rgb8();
            assert_eq!((img.width(), img.height()), (*height, *width));

            let top = img.get_pixel(img.width() / 2, img.height() / 4);
            let bottom = img.get_pixel(img.width() / 2, img.height() * 3 / 4);
            if *tag == 6 {
                assert!(is_red(top) && !is_red(bottom), "{}", path.display());
            } else {
                assert!(is_red(bottom) && !is_red(top), "{}", path.display());
            }

            std::fs::remove_file(path).unwrap();
        }
    }

    #[test]
    fn test_existing_file_is_replaced() {
        let path = temp_path();
        std::fs::write(&path, b"stale").unwrap();

        PhotoPipeline::default().on_photo_capture_complete(request(path.clone()), Ok(sample(1)));

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        std::fs::remove_file(&path).unwrap();
    }
}
