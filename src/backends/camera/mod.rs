// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The backend models a native capture framework: a session that devices,
//! inputs and outputs are wired into, and that delivers preview samples and
//! photo completions to a registered [`CaptureSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Plugin (channel)  │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐       ┌─────────────────────┐
//! │   CaptureSession    │       │   CapturePipeline   │
//! │ (lifecycle, flash)  │       │  (CaptureSink impl) │
//! └──────────┬──────────┘       └──────────▲──────────┘
//!            │ configure / start           │ callbacks
//!            ▼                             │
//! ┌─────────────────────────────────────────┴─┐
//! │           CameraBackend trait             │
//! └──────────────────────┬────────────────────┘
//!                        ▼
//!                  ┌───────────┐
//!                  │ Synthetic │  ← Concrete implementation
//!                  └───────────┘
//! ```

pub mod frame_loop;
pub mod manager;
pub mod synthetic;
pub mod types;

pub use manager::{CaptureSession, Liveness, SessionOptions, negotiate_preset};
pub use types::*;

use std::sync::Arc;

/// Receiver of capture callbacks.
///
/// Preview samples arrive on the backend's capture worker; photo completions
/// arrive on a separate callback thread. Neither is the thread that started
/// the session.
pub trait CaptureSink: Send + Sync {
    /// Called once per delivered preview sample.
    ///
    /// `sample` is only valid for the duration of the call. The sink may
    /// adjust `connection`; the backend applies it to subsequent samples.
    fn on_preview_frame(
        &self,
        sample: &SampleBuffer<'_>,
        device_orientation: DeviceOrientation,
        connection: &mut VideoConnection,
    );

    /// Called once per submitted capture request, with the encoded still or
    /// the hardware error.
    fn on_photo_capture_complete(&self, request: PhotoRequest, result: BackendResult<JpegSample>);
}

/// Native capture framework
///
/// Methods take `&self`; implementations synchronize internally because
/// capture callbacks run on backend-owned threads.
pub trait CameraBackend: Send + Sync {
    // ===== Discovery =====

    /// Devices with the given lens capability, in discovery order
    fn discover_devices(&self, device_type: DeviceType) -> Vec<CameraDevice>;

    // ===== Device configuration =====

    /// Take exclusive configuration access to a device
    fn lock_for_configuration(&self, device: &CameraDevice) -> BackendResult<()>;

    /// Release configuration access taken with [`lock_for_configuration`](Self::lock_for_configuration)
    fn unlock_for_configuration(&self, device: &CameraDevice);

    /// Set the focus mode. Requires the device to be locked.
    fn set_focus_mode(&self, device: &CameraDevice, mode: FocusMode) -> BackendResult<()>;

    /// Whether the device flash can fire right now. Requires the device to be locked.
    fn is_flash_available(&self, device: &CameraDevice) -> BackendResult<bool>;

    // ===== Session wiring =====

    /// Open an input for a device
    fn create_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput>;

    fn can_add_input(&self, input: &DeviceInput) -> bool;

    fn add_input(&self, input: DeviceInput) -> BackendResult<()>;

    fn remove_input(&self, input: &DeviceInput);

    /// Inputs currently attached
    fn inputs(&self) -> Vec<DeviceInput>;

    fn can_add_output(&self, output: &CaptureOutput) -> bool;

    fn add_output(&self, output: CaptureOutput) -> BackendResult<()>;

    fn remove_output(&self, output: &CaptureOutput);

    /// Outputs currently attached
    fn outputs(&self) -> Vec<CaptureOutput>;

    fn can_set_preset(&self, preset: SessionPreset) -> bool;

    fn set_preset(&self, preset: SessionPreset) -> BackendResult<()>;

    /// Register (or clear) the receiver of preview samples and photo completions
    fn set_capture_sink(&self, sink: Option<Arc<dyn CaptureSink>>);

    // ===== Lifecycle =====

    fn start_running(&self) -> BackendResult<()>;

    /// Stop delivering samples.
    ///
    /// Must not return while a callback is still executing on a backend thread.
    fn stop_running(&self);

    fn is_running(&self) -> bool;

    // ===== Capture =====

    /// Submit a one-shot still capture. Completion is reported through
    /// [`CaptureSink::on_photo_capture_complete`].
    fn capture_photo(&self, settings: PhotoSettings, request: PhotoRequest) -> BackendResult<()>;

    // ===== Metadata =====

    fn backend_type(&self) -> CameraBackendType;
}

/// Get a backend instance for the given type
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
    frame_rate: u32,
) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::Synthetic => Arc::new(synthetic::SyntheticBackend::new(
            synthetic::SyntheticConfig::with_frame_rate(frame_rate),
        )),
    }
}
