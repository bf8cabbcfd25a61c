// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! A software camera that behaves like a native capture framework: devices
//! are discovered and locked, inputs and outputs are wired into a session,
//! preview samples arrive on a dedicated capture thread and photo completions
//! arrive on a separate callback thread.
//!
//! Tests can switch off both threads with [`SyntheticConfig::manual`] and
//! drive delivery explicitly with [`SyntheticBackend::emit_preview_frame`]
//! and [`SyntheticBackend::deliver_pending_photos`].

mod pattern;

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::*;
use super::{CameraBackend, CaptureSink};
use crate::constants::{frame_interval, synthetic as timing};
use crate::media::exif;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// How long the photo worker blocks before re-checking its stop signal
const WORKER_POLL: Duration = Duration::from_millis(20);

/// How capture completions are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoDelivery {
    /// On a dedicated callback thread after a short processing delay
    Worker,
    /// Queued until [`SyntheticBackend::deliver_pending_photos`] is called
    Manual,
}

/// Synthetic camera configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub devices: Vec<CameraDevice>,
    /// Presets the session accepts
    pub supported_presets: Vec<SessionPreset>,
    /// Preview pacing; `None` disables the capture thread
    pub frame_interval: Option<Duration>,
    pub photo_delivery: PhotoDelivery,
    /// Device pose reported with every sample and capture
    pub device_orientation: DeviceOrientation,
    pub accepts_input: bool,
    pub accepts_outputs: bool,
}

impl SyntheticConfig {
    /// Threaded camera producing preview frames at `frame_rate`
    pub fn with_frame_rate(frame_rate: u32) -> Self {
        Self {
            frame_interval: Some(frame_interval(frame_rate)),
            ..Self::default()
        }
    }

    /// Camera without background threads
    pub fn manual() -> Self {
        Self {
            frame_interval: None,
            photo_delivery: PhotoDelivery::Manual,
            ..Self::default()
        }
    }

    /// A phone-like set of cameras: back wide-angle with flash, front
    /// wide-angle, back telephoto
    pub fn default_devices() -> Vec<CameraDevice> {
        vec![
            CameraDevice {
                id: "synthetic:back-wide".to_string(),
                name: "Back Camera".to_string(),
                position: DevicePosition::Back,
                device_type: DeviceType::BuiltInWideAngle,
                has_flash: true,
                supports_continuous_autofocus: true,
            },
            CameraDevice {
                id: "synthetic:front-wide".to_string(),
                name: "Front Camera".to_string(),
                position: DevicePosition::Front,
                device_type: DeviceType::BuiltInWideAngle,
                has_flash: false,
                supports_continuous_autofocus: false,
            },
            CameraDevice {
                id: "synthetic:back-tele".to_string(),
                name: "Back Telephoto Camera".to_string(),
                position: DevicePosition::Back,
                device_type: DeviceType::BuiltInTelephoto,
                has_flash: true,
                supports_continuous_autofocus: true,
            },
        ]
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            devices: Self::default_devices(),
            supported_presets: SessionPreset::ALL.to_vec(),
            frame_interval: Some(frame_interval(timing::DEFAULT_FRAME_RATE)),
            photo_delivery: PhotoDelivery::Worker,
            device_orientation: DeviceOrientation::Portrait,
            accepts_input: true,
            accepts_outputs: true,
        }
    }
}

/// A capture in flight. The sink is captured at submission, the way a
/// native photo output holds its per-request delegate.
struct PhotoJob {
    request: PhotoRequest,
    sink: Arc<dyn CaptureSink>,
    preset: SessionPreset,
    orientation: DeviceOrientation,
    fail: bool,
}

struct PhotoWorker {
    controller: CaptureLoopController,
    sender: mpsc::Sender<PhotoJob>,
}

struct State {
    locked_device: Option<String>,
    focus_mode: FocusMode,
    inputs: Vec<DeviceInput>,
    outputs: Vec<CaptureOutput>,
    preset: Option<SessionPreset>,
    sink: Option<Arc<dyn CaptureSink>>,
    running: bool,
    connection: VideoConnection,
    device_orientation: DeviceOrientation,
    pending_photos: VecDeque<PhotoJob>,
    fail_next_submission: bool,
    fail_next_photo: bool,
    fail_next_focus: bool,
}

struct Inner {
    config: SyntheticConfig,
    state: Mutex<State>,
    frame_loop: Mutex<Option<CaptureLoopController>>,
    photo_worker: Mutex<Option<PhotoWorker>>,
    frames_delivered: AtomicU64,
    dropped_frames: AtomicU64,
    started_at: Mutex<Instant>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn device(&self, device: &CameraDevice) -> BackendResult<&CameraDevice> {
        self.config
            .devices
            .iter()
            .find(|d| d.id == device.id)
            .ok_or_else(|| BackendError::DeviceNotFound(device.id.clone()))
    }

    fn require_lock(&self, device: &CameraDevice) -> BackendResult<()> {
        match &self.state().locked_device {
            Some(id) if *id == device.id => Ok(()),
            _ => Err(BackendError::InvalidState(format!(
                "{} is not locked for configuration",
                device.name
            ))),
        }
    }

    /// Render one sample into `buf` and hand it to the sink.
    ///
    /// Returns false when nothing was delivered. The state lock is not held
    /// while the sink runs.
    fn deliver_preview(&self, buf: &mut Vec<u8>) -> bool {
        let (sink, preset, orientation, mut connection) = {
            let state = self.state();
            let has_video = state.outputs.iter().any(CaptureOutput::is_video);
            match (&state.sink, state.preset) {
                (Some(sink), Some(preset)) if state.running && has_video => (
                    Arc::clone(sink),
                    preset,
                    state.device_orientation,
                    state.connection,
                ),
                _ => return false,
            }
        };

        let frame = self.frames_delivered.load(Ordering::Relaxed);
        let (width, height) = (preset.width(), preset.height());
        pattern::fill_bgra(buf, width, height, frame);

        let timestamp = self
            .started_at
            .lock()
            .map(|t| t.elapsed())
            .unwrap_or_default();

        let sample = SampleBuffer {
            data: buf.as_slice(),
            width,
            height,
            stride: width as usize * 4,
            format: PixelFormat::Bgra,
            timestamp,
        };

        sink.on_preview_frame(&sample, orientation, &mut connection);

        self.state().connection = connection;
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        trace!(frame, ?orientation, "Preview sample delivered");
        true
    }

    fn complete_photo(job: PhotoJob) {
        let result = if job.fail {
            Err(BackendError::CaptureFailed(
                "sensor readout failed".to_string(),
            ))
        } else {
            pattern::encode_still(
                job.preset.width(),
                job.preset.height(),
                exif::orientation_for_device(job.orientation),
            )
            .map(|data| JpegSample { data })
        };

        debug!(id = job.request.id, ok = result.is_ok(), "Delivering photo completion");
        job.sink.on_photo_capture_complete(job.request, result);
    }

    fn start_frame_loop(self: &Arc<Self>, interval: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let controller = CaptureLoopController::start_paced(
            "synthetic-capture",
            interval,
            || Ok(Vec::new()),
            move |buf, tick| {
                let Some(inner) = weak.upgrade() else {
                    return LoopAction::Stop;
                };
                if tick.dropped > 0 {
                    inner.dropped_frames.fetch_add(tick.dropped, Ordering::Relaxed);
                }
                inner.deliver_preview(buf);
                LoopAction::Continue
            },
        );
        *self.frame_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(controller);
    }

    fn start_photo_worker(&self) {
        let (sender, receiver) = mpsc::channel::<PhotoJob>();
        let controller = CaptureLoopController::start("synthetic-photo", move || {
            match receiver.recv_timeout(WORKER_POLL) {
                Ok(job) => {
                    std::thread::sleep(timing::PHOTO_PROCESSING_DELAY);
                    Self::complete_photo(job);
                    LoopAction::Continue
                }
                Err(RecvTimeoutError::Timeout) => LoopAction::Continue,
                Err(RecvTimeoutError::Disconnected) => LoopAction::Stop,
            }
        });
        *self.photo_worker.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(PhotoWorker { controller, sender });
    }
}

/// Software camera backend
pub struct SyntheticBackend {
    inner: Arc<Inner>,
}

impl SyntheticBackend {
    pub fn new(config: SyntheticConfig) -> Self {
        let state = State {
            locked_device: None,
            focus_mode: FocusMode::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            preset: None,
            sink: None,
            running: false,
            connection: VideoConnection::default(),
            device_orientation: config.device_orientation,
            pending_photos: VecDeque::new(),
            fail_next_submission: false,
            fail_next_photo: false,
            fail_next_focus: false,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                frame_loop: Mutex::new(None),
                photo_worker: Mutex::new(None),
                frames_delivered: AtomicU64::new(0),
                dropped_frames: AtomicU64::new(0),
                started_at: Mutex::new(Instant::now()),
            }),
        }
    }

    /// Deliver one preview sample on the calling thread
    pub fn emit_preview_frame(&self) -> bool {
        let mut buf = Vec::new();
        self.inner.deliver_preview(&mut buf)
    }

    /// Complete every queued capture on the calling thread, in submission
    /// order. Returns how many completions were delivered.
    pub fn deliver_pending_photos(&self) -> usize {
        let jobs: Vec<PhotoJob> = self.inner.state().pending_photos.drain(..).collect();
        let count = jobs.len();
        for job in jobs {
            Inner::complete_photo(job);
        }
        count
    }

    pub fn pending_photo_count(&self) -> usize {
        self.inner.state().pending_photos.len()
    }

    /// Change the reported device pose
    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        self.inner.state().device_orientation = orientation;
    }

    /// Make the next capture submission fail
    pub fn fail_next_submission(&self) {
        self.inner.state().fail_next_submission = true;
    }

    /// Make the next submitted capture complete with a hardware error
    pub fn fail_next_photo(&self) {
        self.inner.state().fail_next_photo = true;
    }

    /// Make the next focus change fail as unsupported
    pub fn fail_next_focus(&self) {
        self.inner.state().fail_next_focus = true;
    }

    /// Connection state as last written back by the sink
    pub fn connection(&self) -> VideoConnection {
        self.inner.state().connection
    }

    pub fn frames_delivered(&self) -> u64 {
        self.inner.frames_delivered.load(Ordering::Relaxed)
    }

    /// Preview ticks skipped because delivery overran the frame interval
    pub fn dropped_frames(&self) -> u64 {
        self.inner.dropped_frames.load(Ordering::Relaxed)
    }

    pub fn locked_device(&self) -> Option<String> {
        self.inner.state().locked_device.clone()
    }

    pub fn focus_mode(&self) -> FocusMode {
        self.inner.state().focus_mode
    }

    pub fn preset(&self) -> Option<SessionPreset> {
        self.inner.state().preset
    }

    pub fn has_sink(&self) -> bool {
        self.inner.state().sink.is_some()
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl CameraBackend for SyntheticBackend {
    fn discover_devices(&self, device_type: DeviceType) -> Vec<CameraDevice> {
        self.inner
            .config
            .devices
            .iter()
            .filter(|d| d.device_type == device_type)
            .cloned()
            .collect()
    }

    fn lock_for_configuration(&self, device: &CameraDevice) -> BackendResult<()> {
        self.inner.device(device)?;
        let mut state = self.inner.state();
        match &state.locked_device {
            Some(id) if *id != device.id => Err(BackendError::DeviceLocked(id.clone())),
            _ => {
                state.locked_device = Some(device.id.clone());
                Ok(())
            }
        }
    }

    fn unlock_for_configuration(&self, device: &CameraDevice) {
        let mut state = self.inner.state();
        if state.locked_device.as_deref() == Some(device.id.as_str()) {
            state.locked_device = None;
        }
    }

    fn set_focus_mode(&self, device: &CameraDevice, mode: FocusMode) -> BackendResult<()> {
        let known = self.inner.device(device)?;
        self.inner.require_lock(device)?;

        if std::mem::take(&mut self.inner.state().fail_next_focus) {
            return Err(BackendError::FormatNotSupported(format!(
                "{} rejected focus mode {:?}",
                device.name, mode
            )));
        }
        if mode == FocusMode::ContinuousAutoFocus && !known.supports_continuous_autofocus {
            return Err(BackendError::FormatNotSupported(format!(
                "{} has no continuous auto-focus",
                device.name
            )));
        }

        self.inner.state().focus_mode = mode;
        debug!(device = %device.name, ?mode, "Focus mode set");
        Ok(())
    }

    fn is_flash_available(&self, device: &CameraDevice) -> BackendResult<bool> {
        let known = self.inner.device(device)?;
        self.inner.require_lock(device)?;
        Ok(known.has_flash)
    }

    fn create_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
        let known = self.inner.device(device)?;
        Ok(DeviceInput {
            device_id: known.id.clone(),
        })
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        self.inner.config.accepts_input && !self.inner.state().inputs.contains(input)
    }

    fn add_input(&self, input: DeviceInput) -> BackendResult<()> {
        if !self.can_add_input(&input) {
            return Err(BackendError::InvalidState(format!(
                "cannot add input for {}",
                input.device_id
            )));
        }
        self.inner.state().inputs.push(input);
        Ok(())
    }

    fn remove_input(&self, input: &DeviceInput) {
        self.inner.state().inputs.retain(|i| i != input);
    }

    fn inputs(&self) -> Vec<DeviceInput> {
        self.inner.state().inputs.clone()
    }

    fn can_add_output(&self, output: &CaptureOutput) -> bool {
        if !self.inner.config.accepts_outputs {
            return false;
        }
        // One output of each kind
        !self
            .inner
            .state()
            .outputs
            .iter()
            .any(|o| o.is_photo() == output.is_photo())
    }

    fn add_output(&self, output: CaptureOutput) -> BackendResult<()> {
        if !self.can_add_output(&output) {
            return Err(BackendError::InvalidState(format!(
                "cannot add output {:?}",
                output
            )));
        }
        self.inner.state().outputs.push(output);
        Ok(())
    }

    fn remove_output(&self, output: &CaptureOutput) {
        self.inner.state().outputs.retain(|o| o != output);
    }

    fn outputs(&self) -> Vec<CaptureOutput> {
        self.inner.state().outputs.clone()
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        self.inner.config.supported_presets.contains(&preset)
    }

    fn set_preset(&self, preset: SessionPreset) -> BackendResult<()> {
        if !self.can_set_preset(preset) {
            return Err(BackendError::FormatNotSupported(preset.to_string()));
        }
        self.inner.state().preset = Some(preset);
        debug!(%preset, "Session preset set");
        Ok(())
    }

    fn set_capture_sink(&self, sink: Option<Arc<dyn CaptureSink>>) {
        self.inner.state().sink = sink;
    }

    fn start_running(&self) -> BackendResult<()> {
        {
            let mut state = self.inner.state();
            if state.running {
                return Ok(());
            }
            if state.preset.is_none() {
                return Err(BackendError::InvalidState("no session preset".to_string()));
            }
            state.running = true;
        }

        *self.inner.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();

        if let Some(interval) = self.inner.config.frame_interval {
            self.inner.start_frame_loop(interval);
        }
        if self.inner.config.photo_delivery == PhotoDelivery::Worker {
            self.inner.start_photo_worker();
        }

        info!(
            frame_interval_ms = self.inner.config.frame_interval.map(|i| i.as_millis() as u64),
            delivery = ?self.inner.config.photo_delivery,
            "Synthetic camera running"
        );
        Ok(())
    }

    fn stop_running(&self) {
        self.inner.state().running = false;

        // Join outside every lock the worker threads take
        let frame_loop = self
            .inner
            .frame_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut controller) = frame_loop {
            controller.stop();
        }

        let worker = self
            .inner
            .photo_worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(PhotoWorker {
            mut controller,
            sender,
        }) = worker
        {
            drop(sender);
            controller.stop();
        }

        debug!("Synthetic camera stopped");
    }

    fn is_running(&self) -> bool {
        self.inner.state().running
    }

    fn capture_photo(&self, settings: PhotoSettings, request: PhotoRequest) -> BackendResult<()> {
        let job = {
            let mut state = self.inner.state();

            if !state.running {
                return Err(BackendError::InvalidState("session is not running".to_string()));
            }
            if !state.outputs.iter().any(CaptureOutput::is_photo) {
                return Err(BackendError::InvalidState("no photo output".to_string()));
            }
            if std::mem::take(&mut state.fail_next_submission) {
                return Err(BackendError::CaptureFailed(
                    "photo output rejected the request".to_string(),
                ));
            }
            let Some(sink) = state.sink.clone() else {
                return Err(BackendError::InvalidState("no capture sink".to_string()));
            };
            let Some(preset) = state.preset else {
                return Err(BackendError::InvalidState("no session preset".to_string()));
            };

            PhotoJob {
                request,
                sink,
                preset,
                orientation: state.device_orientation,
                fail: std::mem::take(&mut state.fail_next_photo),
            }
        };

        debug!(
            id = job.request.id,
            flash = %settings.flash_mode,
            high_resolution = settings.high_resolution,
            "Capture submitted"
        );

        match self.inner.config.photo_delivery {
            PhotoDelivery::Manual => {
                self.inner.state().pending_photos.push_back(job);
                Ok(())
            }
            PhotoDelivery::Worker => {
                let worker = self.inner.photo_worker.lock().unwrap_or_else(|e| e.into_inner());
                let sender = worker
                    .as_ref()
                    .map(|w| w.sender.clone())
                    .ok_or_else(|| BackendError::InvalidState("photo worker stopped".to_string()))?;
                drop(worker);
                sender.send(job).map_err(|_| {
                    warn!("Photo worker disconnected");
                    BackendError::InvalidState("photo worker stopped".to_string())
                })
            }
        }
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop_running();
        }
    }
}
