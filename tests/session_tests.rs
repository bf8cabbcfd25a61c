// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture session lifecycle

use camera_support::CameraError;
use camera_support::backends::camera::synthetic::{SyntheticBackend, SyntheticConfig};
use camera_support::backends::camera::{
    CameraBackend, CameraDevice, CaptureSession, DevicePosition, DeviceType, FlashMode, FocusMode,
    SessionOptions, SessionPreset,
};
use camera_support::pipelines::CapturePipeline;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn start(
    backend: &Arc<SyntheticBackend>,
) -> Result<(CaptureSession, Arc<CapturePipeline>), CameraError> {
    CaptureSession::initialize(
        Arc::clone(backend) as Arc<dyn CameraBackend>,
        &SessionOptions::default(),
        |preset, liveness| Arc::new(CapturePipeline::new(preset, liveness)),
    )
}

fn manual_backend(config: SyntheticConfig) -> Arc<SyntheticBackend> {
    Arc::new(SyntheticBackend::new(config))
}

fn back_wide(id: &str) -> CameraDevice {
    CameraDevice {
        id: id.to_string(),
        name: id.to_string(),
        position: DevicePosition::Back,
        device_type: DeviceType::BuiltInWideAngle,
        has_flash: false,
        supports_continuous_autofocus: false,
    }
}

#[test]
fn test_initialize_configures_back_camera() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (session, _pipeline) = start(&backend).unwrap();

    assert_eq!(session.device().name, "Back Camera");
    assert_eq!(session.preset(), SessionPreset::Hd1920x1080);
    assert!(session.flash_available());
    assert!(session.has_input());
    assert!(session.has_photo_output());
    assert!(session.has_video_output());
    assert!(backend.is_running());
    assert!(backend.has_sink());
    assert_eq!(backend.focus_mode(), FocusMode::ContinuousAutoFocus);
    assert_eq!(backend.locked_device(), None, "Configuration lock released");
}

#[test]
fn test_initialize_picks_first_back_camera() {
    let backend = manual_backend(SyntheticConfig {
        devices: vec![back_wide("first"), back_wide("second")],
        ..SyntheticConfig::manual()
    });
    let (session, _pipeline) = start(&backend).unwrap();

    assert_eq!(session.device().id, "first");
    assert!(!session.flash_available());
    assert_eq!(backend.focus_mode(), FocusMode::Locked);
}

#[test]
fn test_no_back_camera() {
    let front_only = SyntheticConfig::default_devices()
        .into_iter()
        .filter(|d| d.position == DevicePosition::Front)
        .collect();
    let backend = manual_backend(SyntheticConfig {
        devices: front_only,
        ..SyntheticConfig::manual()
    });

    assert!(matches!(start(&backend), Err(CameraError::DeviceNotFound)));
    assert!(!backend.is_running());
}

#[test]
fn test_no_supported_preset_leaves_nothing_attached() {
    let backend = manual_backend(SyntheticConfig {
        supported_presets: Vec::new(),
        ..SyntheticConfig::manual()
    });

    assert!(matches!(
        start(&backend),
        Err(CameraError::ResolutionUnsupported)
    ));
    assert!(!backend.is_running());
    assert!(backend.inputs().is_empty());
    assert!(backend.outputs().is_empty());
    assert!(!backend.has_sink());
}

#[test]
fn test_preset_fallback_order() {
    let backend = manual_backend(SyntheticConfig {
        supported_presets: vec![SessionPreset::Vga640x480, SessionPreset::Hd1280x720],
        ..SyntheticConfig::manual()
    });
    let (session, pipeline) = start(&backend).unwrap();

    assert_eq!(session.preset(), SessionPreset::Hd1280x720);
    assert_eq!(pipeline.preview().size(), (1280, 720));
}

#[test]
fn test_highest_supported_preset_always_wins() {
    let backend = manual_backend(SyntheticConfig {
        supported_presets: vec![SessionPreset::Vga640x480, SessionPreset::Hd1920x1080],
        ..SyntheticConfig::manual()
    });
    let (session, _pipeline) = start(&backend).unwrap();
    assert_eq!(session.preset(), SessionPreset::Hd1920x1080);
}

#[test]
fn test_focus_rejection_is_configuration_failure() {
    let backend = manual_backend(SyntheticConfig::manual());
    backend.fail_next_focus();

    match start(&backend) {
        Err(e @ CameraError::ConfigurationFailed(_)) => {
            assert_eq!(e.code(), "CONFIGURATION_FAILED");
        }
        other => panic!("expected ConfigurationFailed, got {:?}", other.err()),
    }
    assert_eq!(backend.locked_device(), None, "Configuration lock released");
    assert!(!backend.is_running());
}

#[test]
fn test_rejected_outputs_are_skipped() {
    let backend = manual_backend(SyntheticConfig {
        accepts_outputs: false,
        accepts_input: false,
        ..SyntheticConfig::manual()
    });
    let (session, _pipeline) = start(&backend).unwrap();

    assert!(!session.has_input());
    assert!(!session.has_photo_output());
    assert!(!session.has_video_output());
    assert!(matches!(
        session.take_picture("/tmp/never.jpg"),
        Err(CameraError::CaptureSubmission(_))
    ));
}

#[test]
fn test_close_twice() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (session, _pipeline) = start(&backend).unwrap();

    session.close();
    session.close();

    assert!(!session.is_live());
    assert!(!backend.is_running());
    assert!(!backend.has_sink());
    assert!(backend.inputs().is_empty());
    assert!(backend.outputs().is_empty());
    assert!(!backend.emit_preview_frame());
}

#[test]
fn test_take_picture_after_close() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (session, _pipeline) = start(&backend).unwrap();
    session.close();

    assert!(matches!(
        session.take_picture("/tmp/never.jpg"),
        Err(CameraError::NoActiveSession)
    ));
}

#[test]
fn test_take_picture_carries_flash_mode_and_path() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (mut session, _pipeline) = start(&backend).unwrap();

    assert_eq!(session.flash_mode(), FlashMode::Auto);
    session.set_flash_mode(FlashMode::Off);

    let first = session.take_picture("/tmp/a.jpg").unwrap();
    let second = session.take_picture("/tmp/b.jpg").unwrap();

    assert_eq!(first.flash_mode, FlashMode::Off);
    assert_ne!(first.id, second.id);
    assert_ne!(first.path, second.path);
    assert_eq!(backend.pending_photo_count(), 2);
}

#[test]
fn test_rejected_submission() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (session, _pipeline) = start(&backend).unwrap();

    backend.fail_next_submission();
    assert!(matches!(
        session.take_picture("/tmp/a.jpg"),
        Err(CameraError::CaptureSubmission(_))
    ));
    assert_eq!(backend.pending_photo_count(), 0);
}

#[test]
fn test_dropping_session_stops_backend() {
    let backend = manual_backend(SyntheticConfig::manual());
    let (session, _pipeline) = start(&backend).unwrap();
    drop(session);
    assert!(!backend.is_running());
}

#[test]
fn test_no_frames_after_close_with_threads() {
    let backend = manual_backend(SyntheticConfig {
        supported_presets: vec![SessionPreset::Vga640x480],
        ..SyntheticConfig::with_frame_rate(120)
    });
    let (session, pipeline) = start(&backend).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while pipeline.preview().frames_converted() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(pipeline.preview().frames_converted() >= 3);

    session.close();
    let at_close = pipeline.preview().frames_converted();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(pipeline.preview().frames_converted(), at_close);
}
