// SPDX-License-Identifier: GPL-3.0-only

//! Plugin-wide constants

use std::time::Duration;

/// Name of the method channel the plugin listens on
pub const CHANNEL_NAME: &str = "camera_support";

/// Aspect ratio reported by `getAspectRatio`
pub const DEFAULT_ASPECT_RATIO: (u32, u32) = (4, 3);

/// Method names accepted on the channel
pub mod methods {
    pub const GET_PLATFORM_VERSION: &str = "getPlatformVersion";
    pub const INITIALIZE: &str = "initialize";
    pub const TAKE_PICTURE: &str = "takePicture";
    pub const SET_FLASH_MODE: &str = "setFlashMode";
    pub const GET_FLASH_MODE: &str = "getFlashMode";
    pub const SET_ASPECT_RATIO: &str = "setAspectRatio";
    pub const GET_ASPECT_RATIO: &str = "getAspectRatio";
    pub const GET_SUPPORTED_ASPECT_RATIOS: &str = "getSupportedAspectRatios";
    pub const DISPOSE: &str = "dispose";
}

/// Argument keys used by the method calls
pub mod arguments {
    pub const FILE_PATH: &str = "filePath";
    pub const MODE: &str = "mode";
    pub const X: &str = "x";
    pub const Y: &str = "y";
}

/// Error codes carried in error envelopes
pub mod error_codes {
    pub const DEVICE_NOT_FOUND: &str = "DEVICE_NOT_FOUND";
    pub const RESOLUTION_UNSUPPORTED: &str = "RESOLUTION_UNSUPPORTED";
    pub const CONFIGURATION_FAILED: &str = "CONFIGURATION_FAILED";
    pub const CAPTURE_SUBMISSION_FAILED: &str = "CAPTURE_SUBMISSION_FAILED";
    pub const NO_ACTIVE_SESSION: &str = "NO_ACTIVE_SESSION";
    pub const INVALID_FRAME: &str = "INVALID_FRAME";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const CODEC_ERROR: &str = "CODEC_ERROR";
}

/// Flash mode codes on the wire
///
/// Codes 1 and 2 both select the same "on" state.
pub mod flash_codes {
    pub const OFF: i64 = 0;
    pub const ON: i64 = 1;
    pub const ON_ALT: i64 = 2;
    pub const AUTO: i64 = 3;
}

/// JPEG settings for persisted photos
pub mod jpeg {
    /// Quality used when re-encoding normalized photos
    pub const MAX_QUALITY: u8 = 100;
    /// Quality of the samples produced by the synthetic camera
    pub const SAMPLE_QUALITY: u8 = 90;
    /// File extension for persisted photos
    pub const EXTENSION: &str = "jpg";
}

/// Synthetic camera timing
pub mod synthetic {
    use super::Duration;

    /// Default preview frame rate
    pub const DEFAULT_FRAME_RATE: u32 = 30;

    /// Delay between a capture request and its completion callback
    pub const PHOTO_PROCESSING_DELAY: Duration = Duration::from_millis(20);
}

/// CLI wait limits
pub mod cli {
    use super::Duration;

    /// How long `photo` waits for the output file
    pub const PHOTO_TIMEOUT: Duration = Duration::from_secs(5);
    /// How long `preview` waits for the requested frames
    pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(10);
    /// Poll interval while waiting
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// Frame interval for a frame rate, clamped to at least one frame per second
pub fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_secs(1) / frame_rate.max(1)
}
