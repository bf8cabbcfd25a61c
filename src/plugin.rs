// SPDX-License-Identifier: GPL-3.0-only

//! Method channel front end
//!
//! [`CameraSupportPlugin`] owns the single capture session slot and answers
//! method calls against it. `initialize` fills the slot and registers the
//! session's pipeline as a texture; `dispose` empties it.

use crate::backends::camera::{CameraBackend, CaptureSession, FlashMode, SessionPreset};
use crate::channel::{MethodCall, MethodCodec, MethodResult};
use crate::config::Config;
use crate::constants::{DEFAULT_ASPECT_RATIO, arguments, methods};
use crate::errors::{CameraError, ChannelError};
use crate::pipelines::CapturePipeline;
use crate::texture::{PixelBufferSource, TextureId, TextureRegistry};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

struct ActiveSession {
    session: CaptureSession,
    pipeline: Arc<CapturePipeline>,
    texture_id: TextureId,
}

/// Camera plugin bound to one backend and one texture registry
pub struct CameraSupportPlugin {
    config: Config,
    backend: Arc<dyn CameraBackend>,
    registry: Arc<dyn TextureRegistry>,
    session: Mutex<Option<ActiveSession>>,
}

impl CameraSupportPlugin {
    pub fn new(
        config: Config,
        backend: Arc<dyn CameraBackend>,
        registry: Arc<dyn TextureRegistry>,
    ) -> Self {
        Self {
            config,
            backend,
            registry,
            session: Mutex::new(None),
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.config.channel_name
    }

    pub fn has_active_session(&self) -> bool {
        self.slot().is_some()
    }

    /// Texture the active session publishes to
    pub fn texture_id(&self) -> Option<TextureId> {
        self.slot().as_ref().map(|active| active.texture_id)
    }

    /// Preset the active session negotiated
    pub fn session_preset(&self) -> Option<SessionPreset> {
        self.slot().as_ref().map(|active| active.session.preset())
    }

    /// Decode one message, answer it and encode the reply.
    ///
    /// Malformed calls are answered with an error envelope; only a reply that
    /// cannot be encoded is an error.
    pub fn handle_message(
        &self,
        codec: &dyn MethodCodec,
        message: &[u8],
    ) -> Result<Vec<u8>, ChannelError> {
        let result = match codec.decode_call(message) {
            Ok(call) => self.handle(&call),
            Err(e) => {
                warn!(error = %e, "Rejecting malformed method call");
                MethodResult::from(e)
            }
        };
        codec.encode_result(&result)
    }

    /// Answer one method call
    pub fn handle(&self, call: &MethodCall) -> MethodResult {
        debug!(method = %call.method, "Method call");

        let result = match call.method.as_str() {
            methods::GET_PLATFORM_VERSION => MethodResult::Success(json!(platform_version())),
            methods::INITIALIZE => self.initialize(),
            methods::TAKE_PICTURE => self.take_picture(call),
            methods::SET_FLASH_MODE => self.set_flash_mode(call),
            methods::GET_FLASH_MODE => self.get_flash_mode(),
            methods::SET_ASPECT_RATIO => {
                let x = call.argument::<i64>(arguments::X).ok().flatten();
                let y = call.argument::<i64>(arguments::Y).ok().flatten();
                debug!(?x, ?y, "Aspect ratio change ignored");
                MethodResult::ok()
            }
            methods::GET_ASPECT_RATIO => {
                let (x, y) = DEFAULT_ASPECT_RATIO;
                MethodResult::Success(json!({ "x": x, "y": y }))
            }
            methods::DISPOSE => {
                self.dispose();
                MethodResult::ok()
            }
            methods::GET_SUPPORTED_ASPECT_RATIOS => MethodResult::NotImplemented,
            other => {
                debug!(method = %other, "Unknown method");
                MethodResult::NotImplemented
            }
        };

        if let MethodResult::Error { code, message, .. } = &result {
            debug!(method = %call.method, %code, ?message, "Method call failed");
        }
        result
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn initialize(&self) -> MethodResult {
        let mut slot = self.slot();

        if let Some(previous) = slot.take() {
            info!(texture = %previous.texture_id, "Replacing active session");
            self.teardown(previous);
        }

        let created = CaptureSession::initialize(
            Arc::clone(&self.backend),
            &self.config.session_options(),
            |preset, liveness| Arc::new(CapturePipeline::new(preset, liveness)),
        );

        let (session, pipeline) = match created {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "Camera initialization failed");
                return e.into();
            }
        };

        let texture_id = self
            .registry
            .register(Arc::clone(&pipeline) as Arc<dyn PixelBufferSource>);

        let registry = Arc::downgrade(&self.registry);
        pipeline.set_frame_listener(move || {
            if let Some(registry) = registry.upgrade() {
                registry.texture_frame_available(texture_id);
            }
        });

        info!(
            texture = %texture_id,
            preset = %session.preset(),
            "Camera initialized"
        );

        *slot = Some(ActiveSession {
            session,
            pipeline,
            texture_id,
        });
        MethodResult::Success(json!(texture_id.0))
    }

    fn take_picture(&self, call: &MethodCall) -> MethodResult {
        let path: String = match call.required_argument(arguments::FILE_PATH) {
            Ok(path) => path,
            Err(e) => return e.into(),
        };

        let slot = self.slot();
        let Some(active) = slot.as_ref() else {
            return CameraError::NoActiveSession.into();
        };

        // Fire and forget: the caller is acked whether or not the capture lands
        if let Err(e) = active.session.take_picture(&path) {
            warn!(path = %path, error = %e, "Capture request failed");
        }
        MethodResult::ok()
    }

    fn set_flash_mode(&self, call: &MethodCall) -> MethodResult {
        let code: i64 = match call.required_argument(arguments::MODE) {
            Ok(code) => code,
            Err(e) => return e.into(),
        };

        let mut slot = self.slot();
        let Some(active) = slot.as_mut() else {
            return CameraError::NoActiveSession.into();
        };

        match FlashMode::from_code(code) {
            Some(mode) => active.session.set_flash_mode(mode),
            None => warn!(code, "Unknown flash mode code, keeping current mode"),
        }
        MethodResult::ok()
    }

    fn get_flash_mode(&self) -> MethodResult {
        match self.slot().as_ref() {
            Some(active) => MethodResult::Success(json!(active.session.flash_mode().code())),
            None => CameraError::NoActiveSession.into(),
        }
    }

    fn dispose(&self) {
        match self.slot().take() {
            Some(active) => self.teardown(active),
            None => debug!("Dispose without active session"),
        }
    }

    /// Stop callbacks first, then detach the texture
    fn teardown(&self, active: ActiveSession) {
        let ActiveSession {
            session,
            pipeline,
            texture_id,
        } = active;

        session.close();
        pipeline.clear_frame_listener();
        self.registry.unregister(texture_id);

        info!(texture = %texture_id, "Camera disposed");
    }
}

impl Drop for CameraSupportPlugin {
    fn drop(&mut self) {
        if let Some(active) = self.slot().take() {
            self.teardown(active);
        }
    }
}

/// `"<os> <arch>"` of the running build
pub fn platform_version() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}
