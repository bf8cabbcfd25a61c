// SPDX-License-Identifier: GPL-3.0-only

//! Media processing utilities for pixel conversion and still metadata
//!
//! # Color Conversion
//!
//! Preview samples arrive in whatever layout the capture hardware produces
//! (BGRA, RGBA, YUYV or NV12). The renderer consumes BGRA at the session's
//! preset size, so every preview sample goes through a [`PixelConverter`]
//! sized once when the session is configured.
//!
//! # Still Orientation
//!
//! Still captures carry their rotation as an EXIF orientation tag. The
//! [`exif`] module reads and writes that tag on raw JPEG bytes.
//!
//! # Modules
//!
//! - [`exif`]: EXIF orientation tag helpers for JPEG data
//! - [`pixel_buffer`]: Owned BGRA buffers handed to the texture registry
//! - [`pixel_converter`]: Fixed-size conversion of preview samples to BGRA

pub mod exif;
pub mod pixel_buffer;
pub mod pixel_converter;

pub use pixel_buffer::PixelBuffer;
pub use pixel_converter::PixelConverter;
