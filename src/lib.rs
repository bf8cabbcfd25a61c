// SPDX-License-Identifier: GPL-3.0-only

//! Camera support plugin
//!
//! Exposes a device camera to an application host over a method channel.
//! Preview frames are converted and published through a texture registry;
//! stills are normalized and written to caller-chosen paths.
//!
//! # Architecture
//!
//! - [`plugin`]: method call dispatch and the single session slot
//! - [`channel`]: method call and reply types and their byte codec
//! - [`backends`]: capture framework abstraction and the session manager
//! - [`pipelines`]: preview conversion and photo persistence
//! - [`media`]: pixel buffers, format conversion and EXIF helpers
//! - [`texture`]: host texture registry seam
//! - [`config`]: user configuration handling
//! - [`storage`]: atomic file writes and photo paths
//!
//! # Example
//!
//! ```no_run
//! use camera_support::backends::camera::{CameraBackendType, get_backend_for_type};
//! use camera_support::channel::{MethodCall, MethodResult};
//! use camera_support::texture::LocalTextureRegistry;
//! use camera_support::{CameraSupportPlugin, Config};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let backend = get_backend_for_type(CameraBackendType::Synthetic, config.synthetic_frame_rate);
//! let plugin = CameraSupportPlugin::new(config, backend, Arc::new(LocalTextureRegistry::new()));
//!
//! let reply = plugin.handle(&MethodCall::bare("initialize"));
//! assert!(matches!(reply, MethodResult::Success(_)));
//! ```

pub mod backends;
pub mod channel;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod plugin;
pub mod storage;
pub mod texture;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, ChannelError, PhotoError};
pub use plugin::CameraSupportPlugin;
