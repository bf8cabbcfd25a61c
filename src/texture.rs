// SPDX-License-Identifier: GPL-3.0-only

//! Host texture registry
//!
//! The host renderer pulls preview frames: a pixel buffer source is
//! registered under a texture id, the plugin signals the id whenever a new
//! frame is ready, and the renderer copies the latest buffer on its own
//! schedule.

use crate::media::PixelBuffer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Handle identifying a registered texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub i64);

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something the renderer can pull frames from
pub trait PixelBufferSource: Send + Sync {
    /// Latest frame, or `None` before the first frame arrives
    fn copy_pixel_buffer(&self) -> Option<Arc<PixelBuffer>>;
}

/// Host side of the texture protocol
pub trait TextureRegistry: Send + Sync {
    fn register(&self, source: Arc<dyn PixelBufferSource>) -> TextureId;

    /// Tell the renderer a new frame can be pulled
    fn texture_frame_available(&self, id: TextureId);

    fn unregister(&self, id: TextureId);
}

struct Entry {
    source: Arc<dyn PixelBufferSource>,
    frames_available: u64,
}

/// In-process registry that counts frame notifications
pub struct LocalTextureRegistry {
    next_id: AtomicI64,
    entries: Mutex<HashMap<TextureId, Entry>>,
}

impl LocalTextureRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TextureId, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Frame notifications received for `id`; zero for unknown ids
    pub fn frame_count(&self, id: TextureId) -> u64 {
        self.entries()
            .get(&id)
            .map(|e| e.frames_available)
            .unwrap_or(0)
    }

    /// Pull the latest frame the way the renderer would
    pub fn copy_pixel_buffer(&self, id: TextureId) -> Option<Arc<PixelBuffer>> {
        let source = self.entries().get(&id).map(|e| Arc::clone(&e.source))?;
        source.copy_pixel_buffer()
    }

    pub fn is_registered(&self, id: TextureId) -> bool {
        self.entries().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl Default for LocalTextureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureRegistry for LocalTextureRegistry {
    fn register(&self, source: Arc<dyn PixelBufferSource>) -> TextureId {
        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().insert(
            id,
            Entry {
                source,
                frames_available: 0,
            },
        );
        debug!(%id, "Texture registered");
        id
    }

    fn texture_frame_available(&self, id: TextureId) {
        if let Some(entry) = self.entries().get_mut(&id) {
            entry.frames_available += 1;
            trace!(%id, frames = entry.frames_available, "Texture frame available");
        }
    }

    fn unregister(&self, id: TextureId) {
        if self.entries().remove(&id).is_some() {
            debug!(%id, "Texture unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Arc<PixelBuffer>);

    impl PixelBufferSource for Fixed {
        fn copy_pixel_buffer(&self) -> Option<Arc<PixelBuffer>> {
            Some(Arc::clone(&self.0))
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let registry = LocalTextureRegistry::new();
        let source = Arc::new(Fixed(Arc::new(PixelBuffer::new(1, 1))));
        let a = registry.register(source.clone());
        let b = registry.register(source);
        assert_eq!(a, TextureId(1));
        assert!(b > a);
    }

    #[test]
    fn test_notifications_counted_until_unregistered() {
        let registry = LocalTextureRegistry::new();
        let id = registry.register(Arc::new(Fixed(Arc::new(PixelBuffer::new(2, 2)))));

        registry.texture_frame_available(id);
        registry.texture_frame_available(id);
        assert_eq!(registry.frame_count(id), 2);
        assert_eq!(registry.copy_pixel_buffer(id).map(|b| b.width), Some(2));

        registry.unregister(id);
        registry.texture_frame_available(id);
        assert_eq!(registry.frame_count(id), 0);
        assert!(registry.copy_pixel_buffer(id).is_none());
        assert!(registry.is_empty());
    }
}
