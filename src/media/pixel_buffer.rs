// SPDX-License-Identifier: GPL-3.0-only

//! Converted preview buffers

use crate::backends::camera::types::PixelFormat;

/// An owned, tightly packed BGRA image ready for the renderer
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// Always `width * 4`
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = width as usize * 4;
        Self {
            width,
            height,
            bytes_per_row,
            data: vec![0; bytes_per_row * height as usize],
        }
    }

    /// Pixel layout of the buffer
    pub fn format(&self) -> PixelFormat {
        PixelFormat::Bgra
    }

    /// B, G, R, A at a pixel position, or `None` outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.bytes_per_row + x as usize * 4;
        self.data
            .get(offset..offset + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PixelBuffer({}x{} BGRA, {} bytes)",
            self.width,
            self.height,
            self.data.len()
        )
    }
}
