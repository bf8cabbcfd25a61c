// SPDX-License-Identifier: GPL-3.0-only

//! Preview frame pipeline
//!
//! Each sample is converted into an owned BGRA buffer before the callback
//! returns and published to a single latest-buffer slot. The renderer pulls
//! from the slot at its own pace; frames it never pulls are simply replaced.

use crate::backends::camera::types::{
    DeviceOrientation, SampleBuffer, SessionPreset, VideoConnection, VideoOrientation,
};
use crate::errors::CameraResult;
use crate::media::{PixelBuffer, PixelConverter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct PreviewPipeline {
    converter: PixelConverter,
    latest: Mutex<Option<Arc<PixelBuffer>>>,
    /// Buffer reclaimed from the slot once the renderer released it
    spare: Mutex<Option<PixelBuffer>>,
    frames: AtomicU64,
}

impl PreviewPipeline {
    pub fn new(preset: SessionPreset) -> Self {
        Self {
            converter: PixelConverter::for_preset(preset),
            latest: Mutex::new(None),
            spare: Mutex::new(None),
            frames: AtomicU64::new(0),
        }
    }

    /// Orient the connection, convert the sample and publish it
    pub fn on_preview_frame(
        &self,
        sample: &SampleBuffer<'_>,
        device_orientation: DeviceOrientation,
        connection: &mut VideoConnection,
    ) -> CameraResult<()> {
        connection.orientation = VideoOrientation::compensating(device_orientation);

        let mut buffer = self
            .spare
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_else(|| PixelBuffer::new(self.converter.width(), self.converter.height()));

        if let Err(e) = self.converter.convert_into(sample, &mut buffer) {
            *self.spare.lock().unwrap_or_else(|e| e.into_inner()) = Some(buffer);
            return Err(e);
        }

        let previous = self
            .latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Arc::new(buffer));

        // Reuse the old allocation unless the renderer still holds it
        if let Some(Ok(old)) = previous.map(Arc::try_unwrap) {
            *self.spare.lock().unwrap_or_else(|e| e.into_inner()) = Some(old);
        }

        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Most recent converted frame, `None` before the first one
    pub fn copy_latest_pixel_buffer(&self) -> Option<Arc<PixelBuffer>> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn frames_converted(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Output dimensions
    pub fn size(&self) -> (u32, u32) {
        (self.converter.width(), self.converter.height())
    }
}
