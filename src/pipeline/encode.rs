//! Image encoding: local file → base64 `data:` URL.
//!
//! Only used when [`crate::config::OcrConfig::embed_local_images`] is set.
//! A remote inference server cannot open our `file://` URLs, but every
//! OpenAI-compatible vision endpoint accepts the image inline as a data URL.

use crate::error::OcrError;
use crate::reference::ImageReference;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// The URL to put in the request's `image_url` part.
///
/// Remote references, and local ones when `embed` is off, pass through
/// verbatim.
pub async fn image_url_for(reference: &ImageReference, embed: bool) -> Result<String, OcrError> {
    if !embed || !reference.is_local() {
        return Ok(reference.as_str().to_string());
    }

    let path = reference
        .to_file_path()
        .ok_or_else(|| OcrError::attachment(reference.as_str(), "not a local file URL"))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| OcrError::attachment(&path.display().to_string(), e.to_string()))?;

    Ok(to_data_url(&bytes, &path))
}

/// Encode bytes as a `data:<mime>;base64,…` URL.
pub fn to_data_url(bytes: &[u8], path: &Path) -> String {
    let mime = sniff_mime(bytes, path);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64 ({})", path.display(), b64.len(), mime);
    format!("data:{mime};base64,{b64}")
}

/// MIME type from magic bytes, then extension, then a generic fallback.
fn sniff_mime(bytes: &[u8], path: &Path) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}
