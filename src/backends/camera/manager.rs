// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! The session owns the device, its input and the two outputs, and walks the
//! backend through the configuration sequence:
//!
//! ```text
//! discover → lock → focus/flash check → unlock → input → outputs → preset → sink → start
//! ```
//!
//! Any failure along the way detaches what was attached and leaves the
//! backend stopped.

use super::types::*;
use super::{CameraBackend, CaptureSink};
use crate::errors::{CameraError, CameraResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// Shared flag telling capture callbacks whether their session is still alive
///
/// Revoked by [`CaptureSession::close`] before the backend is stopped, so a
/// callback that is already running sees it at its next check.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag; returns whether it was set
    pub fn revoke(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Session configuration inputs
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Flash mode the session starts with
    pub initial_flash_mode: FlashMode,
}

/// Highest preset `supported` accepts, trying 1080p, then 720p, then 480p
pub fn negotiate_preset(supported: impl Fn(SessionPreset) -> bool) -> CameraResult<SessionPreset> {
    SessionPreset::ALL
        .iter()
        .copied()
        .find(|preset| supported(*preset))
        .ok_or(CameraError::ResolutionUnsupported)
}

/// Releases the device configuration lock on every exit path
struct ConfigurationLock<'a> {
    backend: &'a dyn CameraBackend,
    device: &'a CameraDevice,
}

impl<'a> ConfigurationLock<'a> {
    fn acquire(backend: &'a dyn CameraBackend, device: &'a CameraDevice) -> CameraResult<Self> {
        backend
            .lock_for_configuration(device)
            .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;
        Ok(Self { backend, device })
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.backend.unlock_for_configuration(self.device);
    }
}

/// An active capture session
pub struct CaptureSession {
    backend: Arc<dyn CameraBackend>,
    device: CameraDevice,
    input: Option<DeviceInput>,
    photo_output: Option<CaptureOutput>,
    video_output: Option<CaptureOutput>,
    preset: SessionPreset,
    flash_mode: FlashMode,
    flash_available: bool,
    liveness: Liveness,
    next_request_id: AtomicU64,
}

impl CaptureSession {
    /// Configure and start a session.
    ///
    /// `make_sink` is called once the preset is known, with the liveness flag
    /// the sink must check at callback entry. The sink is returned alongside
    /// the session.
    pub fn initialize<S, F>(
        backend: Arc<dyn CameraBackend>,
        options: &SessionOptions,
        make_sink: F,
    ) -> CameraResult<(Self, Arc<S>)>
    where
        S: CaptureSink + 'static,
        F: FnOnce(SessionPreset, Liveness) -> Arc<S>,
    {
        info!(backend = %backend.backend_type(), "Initializing capture session");

        let device = Self::discover_device(backend.as_ref())?;
        let flash_available = Self::configure_device(backend.as_ref(), &device)?;

        let mut session = CaptureSession {
            backend,
            device,
            input: None,
            photo_output: None,
            video_output: None,
            preset: SessionPreset::Vga640x480,
            flash_mode: options.initial_flash_mode,
            flash_available,
            liveness: Liveness::new(),
            next_request_id: AtomicU64::new(1),
        };

        // Dropping `session` on error runs `close`, which detaches whatever
        // was attached so far.
        session.attach_input()?;
        session.attach_outputs();

        let backend = Arc::clone(&session.backend);
        session.preset = negotiate_preset(|p| backend.can_set_preset(p))?;
        backend.set_preset(session.preset)?;

        let sink = make_sink(session.preset, session.liveness.clone());
        backend.set_capture_sink(Some(Arc::clone(&sink) as Arc<dyn CaptureSink>));

        backend
            .start_running()
            .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;

        info!(
            device = %session.device.name,
            preset = %session.preset,
            flash_available,
            "Capture session running"
        );

        Ok((session, sink))
    }

    /// First back-facing wide-angle camera
    fn discover_device(backend: &dyn CameraBackend) -> CameraResult<CameraDevice> {
        let cameras = backend.discover_devices(DeviceType::BuiltInWideAngle);
        debug!(count = cameras.len(), "Discovered wide-angle cameras");

        cameras
            .into_iter()
            .find(|camera| camera.position == DevicePosition::Back)
            .ok_or(CameraError::DeviceNotFound)
    }

    /// Set continuous auto-focus and check for a flash while the device is locked
    fn configure_device(backend: &dyn CameraBackend, device: &CameraDevice) -> CameraResult<bool> {
        let _lock = ConfigurationLock::acquire(backend, device)?;

        if device.supports_continuous_autofocus {
            backend
                .set_focus_mode(device, FocusMode::ContinuousAutoFocus)
                .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;
        } else {
            debug!(device = %device.name, "Continuous auto-focus unsupported, keeping default");
        }

        let flash_available = device.has_flash
            && backend
                .is_flash_available(device)
                .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;
        Ok(flash_available)
    }

    fn attach_input(&mut self) -> CameraResult<()> {
        let input = self
            .backend
            .create_input(&self.device)
            .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;

        if self.backend.can_add_input(&input) {
            self.backend
                .add_input(input.clone())
                .map_err(|e| CameraError::ConfigurationFailed(e.to_string()))?;
            self.input = Some(input);
        } else {
            debug!(device = %self.device.name, "Session rejected device input");
        }
        Ok(())
    }

    /// Attach photo and video outputs. Outputs the session rejects are skipped.
    fn attach_outputs(&mut self) {
        let photo = CaptureOutput::Photo(PhotoOutputSettings {
            high_resolution_capture: true,
            codec: PhotoCodec::Jpeg,
        });
        let video = CaptureOutput::Video(VideoOutputSettings {
            pixel_format: PixelFormat::Bgra,
            always_discards_late_frames: true,
        });

        self.photo_output = self.try_add_output(photo);
        self.video_output = self.try_add_output(video);
    }

    fn try_add_output(&self, output: CaptureOutput) -> Option<CaptureOutput> {
        if !self.backend.can_add_output(&output) {
            debug!(?output, "Session rejected output");
            return None;
        }
        match self.backend.add_output(output) {
            Ok(()) => Some(output),
            Err(e) => {
                debug!(?output, error = %e, "Failed to attach output");
                None
            }
        }
    }

    /// Stop the session and detach every input and output.
    ///
    /// Safe to call more than once and concurrently with in-flight callbacks.
    pub fn close(&self) {
        if !self.liveness.revoke() {
            debug!("Capture session already closed");
            return;
        }

        info!(device = %self.device.name, "Closing capture session");

        self.backend.stop_running();
        self.backend.set_capture_sink(None);

        for input in self.backend.inputs() {
            self.backend.remove_input(&input);
        }
        for output in self.backend.outputs() {
            self.backend.remove_output(&output);
        }
    }

    /// Store the flash mode for the next capture
    pub fn set_flash_mode(&mut self, mode: FlashMode) {
        debug!(%mode, "Flash mode set");
        self.flash_mode = mode;
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.flash_mode
    }

    /// Submit a one-shot capture that writes to `path`.
    ///
    /// Returns once the request is submitted; the result is delivered to the
    /// sink's completion callback.
    pub fn take_picture(&self, path: impl Into<PathBuf>) -> CameraResult<PhotoRequest> {
        if !self.liveness.is_live() {
            return Err(CameraError::NoActiveSession);
        }
        if self.photo_output.is_none() {
            return Err(CameraError::CaptureSubmission(
                "session has no photo output".to_string(),
            ));
        }

        let request = PhotoRequest {
            id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
            path: path.into(),
            flash_mode: self.flash_mode,
        };
        let settings = PhotoSettings {
            flash_mode: self.flash_mode,
            codec: PhotoCodec::Jpeg,
            high_resolution: true,
        };

        if self.flash_mode != FlashMode::Off && !self.flash_available {
            debug!(flash = %self.flash_mode, "Flash requested but unavailable on device");
        }

        self.backend
            .capture_photo(settings, request.clone())
            .map_err(|e| CameraError::CaptureSubmission(e.to_string()))?;

        debug!(id = request.id, path = %request.path.display(), "Capture request submitted");
        Ok(request)
    }

    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn flash_available(&self) -> bool {
        self.flash_available
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_photo_output(&self) -> bool {
        self.photo_output.is_some()
    }

    pub fn has_video_output(&self) -> bool {
        self.video_output.is_some()
    }

    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.liveness.is_live() {
            debug!("Capture session dropped while live");
            self.close();
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device.name)
            .field("preset", &self.preset)
            .field("flash_mode", &self.flash_mode)
            .field("live", &self.liveness.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_prefers_highest() {
        let preset = negotiate_preset(|_| true).unwrap();
        assert_eq!(preset, SessionPreset::Hd1920x1080);
    }

    #[test]
    fn test_negotiate_falls_back_in_order() {
        let preset = negotiate_preset(|p| p != SessionPreset::Hd1920x1080).unwrap();
        assert_eq!(preset, SessionPreset::Hd1280x720);

        let preset = negotiate_preset(|p| p == SessionPreset::Vga640x480).unwrap();
        assert_eq!(preset, SessionPreset::Vga640x480);
    }

    #[test]
    fn test_negotiate_never_skips_supported_higher_preset() {
        // 1080p and 480p supported, 720p not: 1080p must win
        let preset = negotiate_preset(|p| p != SessionPreset::Hd1280x720).unwrap();
        assert_eq!(preset, SessionPreset::Hd1920x1080);
    }

    #[test]
    fn test_negotiate_none_supported() {
        let result = negotiate_preset(|_| false);
        assert!(matches!(result, Err(CameraError::ResolutionUnsupported)));
    }

    #[test]
    fn test_liveness_revoke_once() {
        let liveness = Liveness::new();
        let clone = liveness.clone();
        assert!(clone.is_live());
        assert!(liveness.revoke());
        assert!(!liveness.revoke());
        assert!(!clone.is_live());
    }
}
