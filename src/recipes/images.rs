use anyhow::Context;
use bytes::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use crate::state::AppState;

pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// A payload that decoded as an image.
#[derive(Debug, Clone)]
pub struct CheckedImage {
    pub body: Bytes,
    pub ext: &'static str,
    pub content_type: &'static str,
}

fn describe(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Jpeg => Some(("jpg", "image/jpeg")),
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::WebP => Some(("webp", "image/webp")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        _ => None,
    }
}

/// Sniffs the format from the bytes (the client's content type is not
/// trusted) and decodes the image fully to reject truncated files.
pub fn check_image(body: Bytes) -> Result<CheckedImage, &'static str> {
    let format = image::guess_format(&body).map_err(|_| INVALID_IMAGE)?;
    let (ext, content_type) = describe(format).ok_or(INVALID_IMAGE)?;
    image::load_from_memory_with_format(&body, format).map_err(|_| INVALID_IMAGE)?;
    Ok(CheckedImage {
        body,
        ext,
        content_type,
    })
}

/// Fresh storage key, so uploads never overwrite each other.
pub fn image_key(ext: &str) -> String {
    format!("uploads/recipe/{}.{}", Uuid::new_v4(), ext)
}

pub async fn store_image(st: &AppState, img: CheckedImage) -> anyhow::Result<String> {
    let key = image_key(img.ext);
    st.storage
        .put_object(&key, img.body, img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best effort; a leftover object is logged, never surfaced to the client.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        tracing::warn!(error = ?e, key, "failed to delete recipe image");
    }
}

pub async fn image_url(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, st.config.image_url_ttl_seconds)
        .await
        .with_context(|| format!("presign url for {}", key))
}
