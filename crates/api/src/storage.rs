//! Durable image storage and room-photo resolution.
//!
//! The object store is an external collaborator; the orchestrator only
//! depends on the [`ImageStore`] contract. [`LocalImageStore`] is the
//! filesystem-backed implementation: generated images land under
//! `{root}/generations/{user}/`, and room photos uploaded by the wider
//! application are resolved back from their public URL to a path under the
//! same root, never outside it.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use decora_core::error::CoreError;
use decora_core::types::DbId;

use crate::config::StorageConfig;

/// Longest edge of derived thumbnails, in pixels.
const THUMBNAIL_EDGE: u32 = 320;

/// URLs of a stored generation artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub image_url: String,
    pub thumbnail_url: String,
}

/// Storage contract consumed by the orchestrator.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the returned image bytes, producing a canonical URL and a
    /// derived thumbnail URL.
    async fn save_generated_image(
        &self,
        user_id: DbId,
        generation_id: DbId,
        image_base64: &str,
    ) -> Result<StoredImage, CoreError>;

    /// Resolve a room-photo URL to its stored bytes, base64-encoded for the
    /// provider's inline payload.
    async fn load_room_image(&self, room_image_url: &str) -> Result<String, CoreError>;
}

// ---------------------------------------------------------------------------
// Local filesystem implementation
// ---------------------------------------------------------------------------

/// Filesystem-backed [`ImageStore`].
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Map a public image URL back to a path under the storage root.
    ///
    /// Accepts either a full URL on our public base or a bare `/images/...`
    /// path. Rejects anything that would escape the root.
    fn resolve_public_url(&self, url: &str) -> Result<PathBuf, CoreError> {
        let path = url.strip_prefix(&self.public_base_url).unwrap_or(url);
        let relative = path.strip_prefix("/images/").ok_or_else(|| {
            CoreError::Validation(format!("Unrecognized image URL: {url}"))
        })?;

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(CoreError::Validation(format!(
                "Invalid image path in URL: {url}"
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save_generated_image(
        &self,
        user_id: DbId,
        generation_id: DbId,
        image_base64: &str,
    ) -> Result<StoredImage, CoreError> {
        let bytes = BASE64.decode(image_base64).map_err(|e| {
            CoreError::Internal(format!("Provider returned undecodable image data: {e}"))
        })?;

        // Thumbnail derivation is CPU-bound; keep it off the async runtime.
        let thumb_bytes = {
            let bytes = bytes.clone();
            tokio::task::spawn_blocking(move || make_thumbnail(&bytes))
                .await
                .map_err(|e| CoreError::Internal(format!("Thumbnail task panicked: {e}")))??
        };

        let dir = self.root.join("generations").join(user_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to create image directory: {e}")))?;

        let image_name = format!("{generation_id}.png");
        let thumb_name = format!("{generation_id}_thumb.png");
        tokio::fs::write(dir.join(&image_name), &bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write image: {e}")))?;
        tokio::fs::write(dir.join(&thumb_name), &thumb_bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write thumbnail: {e}")))?;

        let base = format!(
            "{}/images/generations/{user_id}",
            self.public_base_url
        );
        Ok(StoredImage {
            image_url: format!("{base}/{image_name}"),
            thumbnail_url: format!("{base}/{thumb_name}"),
        })
    }

    async fn load_room_image(&self, room_image_url: &str) -> Result<String, CoreError> {
        let path = self.resolve_public_url(room_image_url)?;
        let bytes = tokio::fs::read(&path).await.map_err(|_| {
            CoreError::Validation(format!("Room image not found: {room_image_url}"))
        })?;
        Ok(BASE64.encode(bytes))
    }
}

/// Re-encode the image at thumbnail size (PNG).
fn make_thumbnail(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Internal(format!("Provider returned an invalid image: {e}")))?;
    let thumb = img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE);
    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CoreError::Internal(format!("Failed to encode thumbnail: {e}")))?;
    Ok(out.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
