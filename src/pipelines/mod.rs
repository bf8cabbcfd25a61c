// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! The capture session hands every callback to a single [`CapturePipeline`],
//! which splits them between the two halves:
//!
//! ```text
//! ┌────────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Preview sample │ ──▶ │ Preview pipeline  │ ──▶ │ Latest buffer +  │
//! │ (capture thr.) │     │ - orientation     │     │ texture notified │
//! │                │     │ - BGRA conversion │     │                  │
//! └────────────────┘     └───────────────────┘     └──────────────────┘
//!
//! ┌────────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Photo complete │ ──▶ │  Photo pipeline   │ ──▶ │   JPEG at the    │
//! │ (callback thr.)│     │ - normalize       │     │  requested path  │
//! │                │     │ - encode q100     │     │                  │
//! └────────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! Both entry points check the session's liveness flag first, so callbacks
//! that race with teardown do nothing.

pub mod photo;
pub mod preview;

pub use photo::PhotoPipeline;
pub use preview::PreviewPipeline;

use crate::backends::camera::{
    BackendResult, CaptureSink, DeviceOrientation, JpegSample, Liveness, PhotoRequest,
    SampleBuffer, SessionPreset, VideoConnection,
};
use crate::media::PixelBuffer;
use crate::texture::PixelBufferSource;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// Called after every published preview frame
pub type FrameListener = Box<dyn Fn() + Send + Sync>;

/// Capture sink combining the preview and photo pipelines
pub struct CapturePipeline {
    liveness: Liveness,
    preview: PreviewPipeline,
    photo: PhotoPipeline,
    frame_listener: Mutex<Option<FrameListener>>,
}

impl CapturePipeline {
    pub fn new(preset: SessionPreset, liveness: Liveness) -> Self {
        Self {
            liveness,
            preview: PreviewPipeline::new(preset),
            photo: PhotoPipeline::new(),
            frame_listener: Mutex::new(None),
        }
    }

    /// Install the frame-available notification
    pub fn set_frame_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.frame_listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(listener));
    }

    /// Remove the notification. Waits for a notification in progress.
    pub fn clear_frame_listener(&self) {
        self.frame_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    pub fn preview(&self) -> &PreviewPipeline {
        &self.preview
    }

    pub fn photo(&self) -> &PhotoPipeline {
        &self.photo
    }

    pub fn copy_latest_pixel_buffer(&self) -> Option<Arc<PixelBuffer>> {
        self.preview.copy_latest_pixel_buffer()
    }

    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }
}

impl CaptureSink for CapturePipeline {
    fn on_preview_frame(
        &self,
        sample: &SampleBuffer<'_>,
        device_orientation: DeviceOrientation,
        connection: &mut VideoConnection,
    ) {
        if !self.liveness.is_live() {
            trace!("Preview sample after close ignored");
            return;
        }

        if let Err(e) = self
            .preview
            .on_preview_frame(sample, device_orientation, connection)
        {
            warn!(error = %e, "Dropping preview sample");
            return;
        }

        if let Some(listener) = self
            .frame_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            listener();
        }
    }

    fn on_photo_capture_complete(&self, request: PhotoRequest, result: BackendResult<JpegSample>) {
        if !self.liveness.is_live() {
            debug!(id = request.id, "Photo completion after close ignored");
            return;
        }
        self.photo.on_photo_capture_complete(request, result);
    }
}

impl PixelBufferSource for CapturePipeline {
    fn copy_pixel_buffer(&self) -> Option<Arc<PixelBuffer>> {
        self.copy_latest_pixel_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendError, FlashMode, PixelFormat};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn frame(pipeline: &CapturePipeline, data: &[u8]) {
        let sample = SampleBuffer {
            data,
            width: 640,
            height: 480,
            stride: 640 * 4,
            format: PixelFormat::Bgra,
            timestamp: Duration::ZERO,
        };
        let mut connection = VideoConnection::default();
        pipeline.on_preview_frame(&sample, DeviceOrientation::Portrait, &mut connection);
    }

    #[test]
    fn test_listener_fires_per_frame() {
        let pipeline = CapturePipeline::new(SessionPreset::Vga640x480, Liveness::new());
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        pipeline.set_frame_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let data = vec![0u8; 640 * 480 * 4];
        frame(&pipeline, &data);
        frame(&pipeline, &data);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        pipeline.clear_frame_listener();
        frame(&pipeline, &data);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_revoked_pipeline_ignores_callbacks() {
        let liveness = Liveness::new();
        let pipeline = CapturePipeline::new(SessionPreset::Vga640x480, liveness.clone());
        liveness.revoke();

        let data = vec![0u8; 640 * 480 * 4];
        frame(&pipeline, &data);
        assert!(pipeline.copy_pixel_buffer().is_none());

        pipeline.on_photo_capture_complete(
            PhotoRequest {
                id: 1,
                path: std::env::temp_dir().join("never-written.jpg"),
                flash_mode: FlashMode::Off,
            },
            Err(BackendError::CaptureFailed("late".into())),
        );
        assert_eq!(pipeline.photo().failed_count(), 0);
    }
}
