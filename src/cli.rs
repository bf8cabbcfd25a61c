// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! Every command runs the plugin in-process against the synthetic camera and
//! talks to it through the JSON method codec, the same way a host would.

use camera_support::backends::camera::{
    CameraBackend, DeviceType, FlashMode, SessionPreset, get_backend_for_type,
};
use camera_support::channel::{JsonMethodCodec, MethodCall, MethodCodec, MethodResult};
use camera_support::constants::{arguments, cli as limits, methods};
use camera_support::texture::{LocalTextureRegistry, TextureId};
use camera_support::{CameraSupportPlugin, Config, storage};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Plugin, its texture registry and the codec used to reach it
struct Harness {
    plugin: CameraSupportPlugin,
    registry: Arc<LocalTextureRegistry>,
    codec: JsonMethodCodec,
}

impl Harness {
    fn new(config: Config) -> Self {
        let backend = get_backend_for_type(config.backend, config.synthetic_frame_rate);
        let registry = Arc::new(LocalTextureRegistry::new());
        let plugin = CameraSupportPlugin::new(config, backend, registry.clone());
        Self {
            plugin,
            registry,
            codec: JsonMethodCodec,
        }
    }

    /// Round-trip one call through the codec
    fn call(&self, method: &str, args: Value) -> CliResult<MethodResult> {
        let message = self.codec.encode_call(&MethodCall::new(method, args))?;
        let reply = self.plugin.handle_message(&self.codec, &message)?;
        Ok(self.codec.decode_result(&reply)?)
    }

    /// Like `call`, but an error envelope or "not implemented" is an error
    fn call_ok(&self, method: &str, args: Value) -> CliResult<Value> {
        match self.call(method, args)? {
            MethodResult::Success(value) => Ok(value),
            MethodResult::Error { code, message, .. } => Err(format!(
                "{} failed: {} ({})",
                method,
                message.unwrap_or_default(),
                code
            )
            .into()),
            MethodResult::NotImplemented => Err(format!("{} is not implemented", method).into()),
        }
    }

    fn initialize(&self) -> CliResult<TextureId> {
        let id = self
            .call_ok(methods::INITIALIZE, Value::Null)?
            .as_i64()
            .ok_or("initialize returned no texture id")?;
        Ok(TextureId(id))
    }
}

/// List all available cameras
pub fn list_cameras() -> CliResult<()> {
    let config = Config::load();
    let backend = get_backend_for_type(config.backend, config.synthetic_frame_rate);

    let cameras: Vec<_> = DeviceType::ALL
        .iter()
        .flat_map(|device_type| backend.discover_devices(*device_type))
        .collect();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({} backend):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!(
            "      Position: {}, lens: {}, flash: {}",
            camera.position,
            camera.device_type,
            if camera.has_flash { "yes" } else { "no" }
        );
    }
    println!();

    let presets: Vec<String> = supported_presets(backend.as_ref())
        .iter()
        .map(|p| p.to_string())
        .collect();
    println!("Session presets: {}", presets.join(", "));

    Ok(())
}

fn supported_presets(backend: &dyn CameraBackend) -> Vec<SessionPreset> {
    SessionPreset::ALL
        .iter()
        .copied()
        .filter(|preset| backend.can_set_preset(*preset))
        .collect()
}

/// Take a photo and wait for it to land on disk
pub fn take_photo(output: Option<PathBuf>, flash: Option<FlashMode>) -> CliResult<()> {
    let mut config = Config::load();

    let output_path = match output {
        Some(path) if path.is_dir() => storage::timestamped_photo_path(&path),
        Some(path) => path,
        None => {
            let dir = config
                .photo_dir
                .clone()
                .unwrap_or_else(storage::default_photo_dir);
            storage::timestamped_photo_path(&dir)
        }
    };

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let harness = Harness::new(config.clone());
    harness.initialize()?;

    if let Some(mode) = flash {
        harness.call_ok(methods::SET_FLASH_MODE, named(&[(arguments::MODE, json!(mode.code()))]))?;
    }

    println!("Capturing...");
    let path_arg = output_path.to_string_lossy().to_string();
    harness.call_ok(
        methods::TAKE_PICTURE,
        named(&[(arguments::FILE_PATH, json!(path_arg))]),
    )?;

    let saved = wait_for_file(&output_path);
    harness.call_ok(methods::DISPOSE, Value::Null)?;

    if !saved {
        return Err(format!(
            "Timed out waiting for {}",
            output_path.display()
        )
        .into());
    }

    println!("Photo saved: {}", output_path.display());

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.photo_dir = Some(parent.to_path_buf());
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "Failed to remember photo directory");
        }
    }

    Ok(())
}

/// Argument map from name/value pairs
fn named(pairs: &[(&str, Value)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

fn wait_for_file(path: &Path) -> bool {
    let start = Instant::now();
    while start.elapsed() < limits::PHOTO_TIMEOUT {
        if path.exists() {
            return true;
        }
        std::thread::sleep(limits::POLL_INTERVAL);
    }
    path.exists()
}

/// Run the preview until the texture has seen `frames` notifications
pub fn run_preview(frames: u64) -> CliResult<()> {
    let harness = Harness::new(Config::load());
    let texture = harness.initialize()?;
    println!("Texture {} registered", texture);

    let start = Instant::now();
    while harness.registry.frame_count(texture) < frames
        && start.elapsed() < limits::PREVIEW_TIMEOUT
    {
        std::thread::sleep(limits::POLL_INTERVAL);
    }

    let received = harness.registry.frame_count(texture);
    let elapsed = start.elapsed();
    let latest = harness.registry.copy_pixel_buffer(texture);

    harness.call_ok(methods::DISPOSE, Value::Null)?;

    match latest {
        Some(buffer) => println!(
            "Latest frame: {}x{} ({} bytes per row)",
            buffer.width, buffer.height, buffer.bytes_per_row
        ),
        None => println!("No frame received"),
    }
    println!(
        "{} frame notifications in {:.2}s ({:.1} fps)",
        received,
        elapsed.as_secs_f64(),
        received as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    if received < frames {
        return Err(format!("Expected {} frames, got {}", frames, received).into());
    }
    Ok(())
}

/// Send one raw call and print the encoded reply
pub fn send_call(method: &str, args: Option<&str>) -> CliResult<()> {
    let args: Value = match args {
        Some(text) => serde_json::from_str(text)?,
        None => Value::Null,
    };

    let config = Config::load();
    let harness = Harness::new(config);

    let message = harness
        .codec
        .encode_call(&MethodCall::new(method, args))?;
    let reply = harness.plugin.handle_message(&harness.codec, &message)?;

    if reply.is_empty() {
        println!("(not implemented)");
    } else {
        println!("{}", String::from_utf8_lossy(&reply));
    }
    Ok(())
}
