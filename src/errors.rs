// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera plugin
//!
//! Errors raised while a method call is still on the stack (session
//! configuration, argument decoding) travel back to the caller as error
//! envelopes. Errors raised on the photo completion path never reach the
//! caller; they are logged and dropped.

use crate::backends::camera::types::BackendError;
use crate::constants::error_codes;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for capture session operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Main error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture session errors
    Camera(CameraError),
    /// Photo completion errors
    Photo(PhotoError),
    /// Method channel errors
    Channel(ChannelError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
}

/// Capture session errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No back-facing wide-angle camera was discovered
    DeviceNotFound,
    /// None of the session presets is supported by the device
    ResolutionUnsupported,
    /// A step of the configuration sequence failed
    ConfigurationFailed(String),
    /// The photo output rejected a capture request
    CaptureSubmission(String),
    /// The call needs a session and none is active
    NoActiveSession,
    /// A preview buffer could not be read
    InvalidFrame(String),
}

/// Photo completion errors
#[derive(Debug, Clone)]
pub enum PhotoError {
    /// The hardware reported an error instead of a sample
    CaptureFailed(String),
    /// The JPEG sample could not be decoded
    DecodeFailed(String),
    /// The normalized image could not be encoded
    EncodingFailed(String),
    /// Writing the output file failed
    SaveFailed(String),
}

/// Method channel errors
#[derive(Debug, Clone)]
pub enum ChannelError {
    /// The message bytes are not a valid envelope
    Decode(String),
    /// The reply could not be serialized
    Encode(String),
    /// A required argument is missing
    MissingArgument(String),
    /// An argument has the wrong type
    InvalidArgument { name: String, reason: String },
}

impl CameraError {
    /// Error code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            CameraError::DeviceNotFound => error_codes::DEVICE_NOT_FOUND,
            CameraError::ResolutionUnsupported => error_codes::RESOLUTION_UNSUPPORTED,
            CameraError::ConfigurationFailed(_) => error_codes::CONFIGURATION_FAILED,
            CameraError::CaptureSubmission(_) => error_codes::CAPTURE_SUBMISSION_FAILED,
            CameraError::NoActiveSession => error_codes::NO_ACTIVE_SESSION,
            CameraError::InvalidFrame(_) => error_codes::INVALID_FRAME,
        }
    }
}

impl ChannelError {
    /// Error code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::Decode(_) | ChannelError::Encode(_) => error_codes::CODEC_ERROR,
            ChannelError::MissingArgument(_) | ChannelError::InvalidArgument { .. } => {
                error_codes::INVALID_ARGUMENT
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Channel(e) => write!(f, "Channel error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceNotFound => write!(f, "No back-facing wide-angle camera found"),
            CameraError::ResolutionUnsupported => {
                write!(f, "Device supports none of the session presets")
            }
            CameraError::ConfigurationFailed(msg) => write!(f, "Configuration failed: {}", msg),
            CameraError::CaptureSubmission(msg) => {
                write!(f, "Capture request rejected: {}", msg)
            }
            CameraError::NoActiveSession => write!(f, "No active capture session"),
            CameraError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            PhotoError::DecodeFailed(msg) => write!(f, "Decoding failed: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Decode(msg) => write!(f, "Malformed message: {}", msg),
            ChannelError::Encode(msg) => write!(f, "Failed to encode reply: {}", msg),
            ChannelError::MissingArgument(name) => write!(f, "Missing argument '{}'", name),
            ChannelError::InvalidArgument { name, reason } => {
                write!(f, "Invalid argument '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for ChannelError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        AppError::Channel(err)
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => CameraError::DeviceNotFound,
            BackendError::FormatNotSupported(_) => CameraError::ResolutionUnsupported,
            other => CameraError::ConfigurationFailed(other.to_string()),
        }
    }
}

impl From<BackendError> for PhotoError {
    fn from(err: BackendError) -> Self {
        PhotoError::CaptureFailed(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

impl From<image::ImageError> for PhotoError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => PhotoError::EncodingFailed(e.to_string()),
            other => PhotoError::DecodeFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Decode(err.to_string())
    }
}
