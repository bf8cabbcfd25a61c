// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-size conversion of preview samples into renderer buffers
//!
//! The converter is sized once from the session preset. Samples of any
//! supported layout are converted to tightly packed BGRA at that size;
//! samples whose dimensions differ from the preset are resampled with
//! nearest-neighbor sampling.

use super::PixelBuffer;
use crate::backends::camera::types::{PixelFormat, SampleBuffer, SessionPreset};
use crate::errors::{CameraError, CameraResult};

/// Converts preview samples to BGRA at a fixed output size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelConverter {
    width: u32,
    height: u32,
}

impl PixelConverter {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Converter sized to a session preset
    pub fn for_preset(preset: SessionPreset) -> Self {
        Self::new(preset.width(), preset.height())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Convert into a newly allocated buffer
    pub fn convert(&self, sample: &SampleBuffer<'_>) -> CameraResult<PixelBuffer> {
        let mut out = PixelBuffer::new(self.width, self.height);
        self.convert_into(sample, &mut out)?;
        Ok(out)
    }

    /// Convert into `out`, reallocating it only if its size is wrong
    pub fn convert_into(&self, sample: &SampleBuffer<'_>, out: &mut PixelBuffer) -> CameraResult<()> {
        validate(sample)?;

        if out.width != self.width || out.height != self.height {
            *out = PixelBuffer::new(self.width, self.height);
        }

        let dst_w = self.width as usize;
        let dst_h = self.height as usize;
        let src_w = sample.width as usize;
        let src_h = sample.height as usize;

        // Same layout and size: row copies that drop any stride padding
        if sample.format == PixelFormat::Bgra && src_w == dst_w && src_h == dst_h {
            for (y, row) in out.data.chunks_exact_mut(out.bytes_per_row).enumerate() {
                let start = y * sample.stride;
                row.copy_from_slice(&sample.data[start..start + dst_w * 4]);
            }
            return Ok(());
        }

        for (dy, row) in out.data.chunks_exact_mut(dst_w * 4).enumerate() {
            let sy = dy * src_h / dst_h;
            for (dx, pixel) in row.chunks_exact_mut(4).enumerate() {
                let sx = dx * src_w / dst_w;
                pixel.copy_from_slice(&read_bgra(sample, sx, sy));
            }
        }

        Ok(())
    }
}

fn validate(sample: &SampleBuffer<'_>) -> CameraResult<()> {
    if sample.width == 0 || sample.height == 0 {
        return Err(CameraError::InvalidFrame(format!(
            "empty frame {}x{}",
            sample.width, sample.height
        )));
    }

    let min_stride = sample.format.min_stride(sample.width);
    if sample.stride < min_stride {
        return Err(CameraError::InvalidFrame(format!(
            "stride {} below minimum {} for {:?}",
            sample.stride, min_stride, sample.format
        )));
    }

    let min_len = sample.format.min_len(sample.stride, sample.height);
    if sample.data.len() < min_len {
        return Err(CameraError::InvalidFrame(format!(
            "buffer holds {} bytes, {:?} {}x{} needs {}",
            sample.data.len(),
            sample.format,
            sample.width,
            sample.height,
            min_len
        )));
    }

    Ok(())
}

/// Read one pixel as B, G, R, A. Coordinates must be inside a validated sample.
fn read_bgra(sample: &SampleBuffer<'_>, x: usize, y: usize) -> [u8; 4] {
    let data = sample.data;
    let stride = sample.stride;

    match sample.format {
        PixelFormat::Bgra => {
            let o = y * stride + x * 4;
            [data[o], data[o + 1], data[o + 2], data[o + 3]]
        }
        PixelFormat::Rgba => {
            let o = y * stride + x * 4;
            [data[o + 2], data[o + 1], data[o], data[o + 3]]
        }
        PixelFormat::Yuyv => {
            // Y0 U Y1 V - one 4-byte group per 2 pixels
            let o = y * stride + (x / 2) * 4;
            let luma = data[o + (x % 2) * 2];
            yuv_to_bgra(luma, data[o + 1], data[o + 3])
        }
        PixelFormat::Nv12 => {
            let luma = data[y * stride + x];
            let uv = stride * sample.height as usize + (y / 2) * stride + (x / 2) * 2;
            yuv_to_bgra(luma, data[uv], data[uv + 1])
        }
    }
}

/// BT.601 full-range YUV to BGRA
fn yuv_to_bgra(y: u8, u: u8, v: u8) -> [u8; 4] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    [b, g, r, 255]
}
