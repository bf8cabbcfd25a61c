// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::flash_codes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Software camera producing test patterns
    #[default]
    Synthetic,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Which side of the device the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePosition {
    Front,
    Back,
    Unspecified,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Lens capability used for discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    BuiltInWideAngle,
    BuiltInTelephoto,
    BuiltInUltraWide,
    External,
}

impl DeviceType {
    pub const ALL: [DeviceType; 4] = [
        DeviceType::BuiltInWideAngle,
        DeviceType::BuiltInTelephoto,
        DeviceType::BuiltInUltraWide,
        DeviceType::External,
    ];
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::BuiltInWideAngle => write!(f, "wide-angle"),
            DeviceType::BuiltInTelephoto => write!(f, "telephoto"),
            DeviceType::BuiltInUltraWide => write!(f, "ultra-wide"),
            DeviceType::External => write!(f, "external"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Stable identifier assigned by the backend
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub device_type: DeviceType,
    /// True if the device has a strobe usable for still capture
    pub has_flash: bool,
    /// True if the device can run continuous auto-focus
    pub supports_continuous_autofocus: bool,
}

/// Focus behavior applied while the device is locked for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    #[default]
    Locked,
    AutoFocus,
    ContinuousAutoFocus,
}

/// Flash operating mode for still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    /// Flash never fires
    Off,
    /// Flash always fires
    On,
    /// Flash fires when the scene needs it
    #[default]
    Auto,
}

impl FlashMode {
    /// Decode a wire code. Codes 1 and 2 both map to `On`; unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            flash_codes::OFF => Some(FlashMode::Off),
            flash_codes::ON | flash_codes::ON_ALT => Some(FlashMode::On),
            flash_codes::AUTO => Some(FlashMode::Auto),
            _ => None,
        }
    }

    /// Canonical wire code
    pub fn code(&self) -> i64 {
        match self {
            FlashMode::Off => flash_codes::OFF,
            FlashMode::On => flash_codes::ON,
            FlashMode::Auto => flash_codes::AUTO,
        }
    }
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashMode::Off => write!(f, "off"),
            FlashMode::On => write!(f, "on"),
            FlashMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for FlashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(FlashMode::Off),
            "on" => Ok(FlashMode::On),
            "auto" => Ok(FlashMode::Auto),
            other => Err(format!("unknown flash mode '{}'", other)),
        }
    }
}

/// Capture resolution preset advertised by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPreset {
    #[serde(rename = "1920x1080")]
    Hd1920x1080,
    #[serde(rename = "1280x720")]
    Hd1280x720,
    #[serde(rename = "640x480")]
    Vga640x480,
}

impl SessionPreset {
    /// All presets, highest resolution first
    pub const ALL: [SessionPreset; 3] = [
        SessionPreset::Hd1920x1080,
        SessionPreset::Hd1280x720,
        SessionPreset::Vga640x480,
    ];

    pub fn width(&self) -> u32 {
        match self {
            SessionPreset::Hd1920x1080 => 1920,
            SessionPreset::Hd1280x720 => 1280,
            SessionPreset::Vga640x480 => 640,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            SessionPreset::Hd1920x1080 => 1080,
            SessionPreset::Hd1280x720 => 720,
            SessionPreset::Vga640x480 => 480,
        }
    }
}

impl std::fmt::Display for SessionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// Physical orientation of the device as reported by its motion sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    /// Device rotated so the home edge is on the right
    LandscapeLeft,
    /// Device rotated so the home edge is on the left
    LandscapeRight,
    FaceUp,
    FaceDown,
}

/// Orientation tag applied to buffers delivered on a video connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl VideoOrientation {
    /// Connection orientation that cancels out the physical device rotation.
    ///
    /// The two landscape orientations swap; portrait and upside-down map to
    /// themselves; flat and unknown orientations fall back to portrait.
    pub fn compensating(device: DeviceOrientation) -> Self {
        match device {
            DeviceOrientation::LandscapeRight => VideoOrientation::LandscapeLeft,
            DeviceOrientation::LandscapeLeft => VideoOrientation::LandscapeRight,
            DeviceOrientation::Portrait => VideoOrientation::Portrait,
            DeviceOrientation::PortraitUpsideDown => VideoOrientation::PortraitUpsideDown,
            DeviceOrientation::Unknown
            | DeviceOrientation::FaceUp
            | DeviceOrientation::FaceDown => VideoOrientation::Portrait,
        }
    }
}

/// Video connection state the preview callback may adjust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoConnection {
    pub orientation: VideoOrientation,
}

/// Pixel format of captured preview buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// BGRA - 32-bit, B G R A byte order
    /// The renderer's native texture format
    Bgra,
    /// RGBA - 32-bit, R G B A byte order
    Rgba,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    Yuyv,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    Nv12,
}

impl PixelFormat {
    /// Minimum bytes per row for a given width
    pub fn min_stride(&self, width: u32) -> usize {
        let width = width as usize;
        match self {
            PixelFormat::Bgra | PixelFormat::Rgba => width * 4,
            PixelFormat::Yuyv => width.div_ceil(2) * 4,
            PixelFormat::Nv12 => width.div_ceil(2) * 2,
        }
    }

    /// Minimum buffer length for a frame with the given stride and height
    pub fn min_len(&self, stride: usize, height: u32) -> usize {
        let height = height as usize;
        match self {
            PixelFormat::Nv12 => stride * height + stride * height.div_ceil(2),
            _ => stride * height,
        }
    }
}

/// A preview sample delivered by the backend.
///
/// Borrows the backend's buffer, so it cannot outlive the callback it was
/// handed to. Anything that must survive the callback has to be converted
/// into an owned buffer first.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row (of the Y plane for NV12)
    pub stride: usize,
    pub format: PixelFormat,
    /// Presentation time since the session started
    pub timestamp: Duration,
}

/// Handle for a device input attached to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub device_id: String,
}

/// Codec prepared on the photo output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoCodec {
    #[default]
    Jpeg,
}

/// Photo output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoOutputSettings {
    pub high_resolution_capture: bool,
    pub codec: PhotoCodec,
}

/// Video data output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOutputSettings {
    pub pixel_format: PixelFormat,
    /// Drop frames that arrive while the sink is still busy
    pub always_discards_late_frames: bool,
}

/// Output attached to the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutput {
    Photo(PhotoOutputSettings),
    Video(VideoOutputSettings),
}

impl CaptureOutput {
    pub fn is_photo(&self) -> bool {
        matches!(self, CaptureOutput::Photo(_))
    }

    pub fn is_video(&self) -> bool {
        matches!(self, CaptureOutput::Video(_))
    }
}

/// Per-capture settings handed to the photo output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    pub flash_mode: FlashMode,
    pub codec: PhotoCodec,
    pub high_resolution: bool,
}

/// A pending still capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRequest {
    /// Monotonic id within a session
    pub id: u64,
    /// Where the finished JPEG is written
    pub path: PathBuf,
    pub flash_mode: FlashMode,
}

/// Encoded still delivered by the photo output
#[derive(Debug, Clone)]
pub struct JpegSample {
    pub data: Vec<u8>,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Preset or format not supported
    FormatNotSupported(String),
    /// Device is locked for configuration by someone else
    DeviceLocked(String),
    /// Session is not in a state that allows the operation
    InvalidState(String),
    /// The hardware failed to produce a capture
    CaptureFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::DeviceLocked(msg) => write!(f, "Device locked: {}", msg),
            BackendError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_compensation_table() {
        use DeviceOrientation as D;
        use VideoOrientation as V;

        assert_eq!(V::compensating(D::LandscapeRight), V::LandscapeLeft);
        assert_eq!(V::compensating(D::LandscapeLeft), V::LandscapeRight);
        assert_eq!(V::compensating(D::Portrait), V::Portrait);
        assert_eq!(V::compensating(D::PortraitUpsideDown), V::PortraitUpsideDown);
    }

    #[test]
    fn test_unknown_orientations_fall_back_to_portrait() {
        for device in [
            DeviceOrientation::Unknown,
            DeviceOrientation::FaceUp,
            DeviceOrientation::FaceDown,
        ] {
            assert_eq!(
                VideoOrientation::compensating(device),
                VideoOrientation::Portrait
            );
        }
    }

    // Characterization: codes 1 and 2 both select "on" and read back as 1.
    #[test]
    fn test_flash_codes_collapse_on() {
        assert_eq!(FlashMode::from_code(1), Some(FlashMode::On));
        assert_eq!(FlashMode::from_code(2), Some(FlashMode::On));
        assert_eq!(FlashMode::from_code(2).map(|m| m.code()), Some(1));
    }

    #[test]
    fn test_flash_code_round_trip() {
        assert_eq!(FlashMode::from_code(0).map(|m| m.code()), Some(0));
        assert_eq!(FlashMode::from_code(3).map(|m| m.code()), Some(3));
        assert_eq!(FlashMode::from_code(4), None);
        assert_eq!(FlashMode::from_code(-1), None);
    }

    #[test]
    fn test_presets_ordered_highest_first() {
        let pixels: Vec<u32> = SessionPreset::ALL
            .iter()
            .map(|p| p.width() * p.height())
            .collect();
        assert!(pixels.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(SessionPreset::Hd1280x720.to_string(), "1280x720");
    }

    #[test]
    fn test_nv12_min_len() {
        assert_eq!(PixelFormat::Nv12.min_len(4, 4), 16 + 8);
        assert_eq!(PixelFormat::Nv12.min_len(4, 3), 12 + 8);
        assert_eq!(PixelFormat::Yuyv.min_stride(3), 8);
        assert_eq!(PixelFormat::Nv12.min_stride(3), 4);
    }
}
