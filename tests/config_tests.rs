// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use camera_support::Config;
use camera_support::backends::camera::FlashMode;
use std::path::PathBuf;

fn temp_config_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("camera-support-{}", uuid::Uuid::new_v4()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.channel_name, "camera_support");
    assert_eq!(config.default_flash_mode, FlashMode::Auto);
    assert!(config.photo_dir.is_none());
}

#[test]
fn test_config_save_and_load() {
    let path = temp_config_path();
    let config = Config {
        default_flash_mode: FlashMode::Off,
        synthetic_frame_rate: 60,
        photo_dir: Some(PathBuf::from("/tmp/photos")),
        ..Config::default()
    };

    config.save_to(&path).unwrap();
    assert_eq!(Config::load_from(&path), config);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn test_missing_config_gives_defaults() {
    assert_eq!(Config::load_from(&temp_config_path()), Config::default());
}

#[test]
fn test_partial_config_fills_defaults() {
    let path = temp_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, br#"{"default_flash_mode":"on"}"#).unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.default_flash_mode, FlashMode::On);
    assert_eq!(config.channel_name, "camera_support");

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn test_invalid_config_gives_defaults() {
    let path = temp_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{ not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn test_unusable_values_are_clamped() {
    let path = temp_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        br#"{"synthetic_frame_rate":0}"#,
    )
    .unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.synthetic_frame_rate, 1);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn test_session_options_follow_config() {
    let config = Config {
        default_flash_mode: FlashMode::On,
        ..Config::default()
    };
    let options = config.session_options();
    assert_eq!(options.initial_flash_mode, FlashMode::On);
}

#[test]
fn test_preset_and_quality_keys_are_ignored() {
    // Negotiation order and photo quality are fixed; files from older
    // versions that still carry them load with everything else intact.
    let path = temp_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        br#"{"preset_priority":["640x480"],"jpeg_quality":10,"default_flash_mode":"off"}"#,
    )
    .unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.default_flash_mode, FlashMode::Off);

    let saved = serde_json::to_value(&config).unwrap();
    assert!(saved.get("preset_priority").is_none());
    assert!(saved.get("jpeg_quality").is_none());

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}
