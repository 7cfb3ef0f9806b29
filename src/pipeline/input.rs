//! Input normalisation: turn an inbound chat message into one image reference.
//!
//! ## Why write uploads to a temp file?
//!
//! The inference server takes a URL, not a byte buffer, and the local Nexa
//! server can open `file://` URLs directly. Uploaded bytes are therefore
//! written to a uniquely named [`NamedTempFile`] and referenced by
//! `file://` URL. The file is owned by [`ResolvedInput`], so it is deleted
//! when the input is released or dropped, on success, error and panic
//! alike.

use crate::error::OcrError;
use crate::message::{ChatMessage, Element};
use crate::reference::{is_remote_url, ImageReference};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Extension used when an upload's filename carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

const TEMP_PREFIX: &str = "nexa-ocr-";

/// The normalised input: a remote URL, or an upload materialised on disk.
#[derive(Debug)]
pub enum ResolvedInput {
    /// The message text was an HTTP(S) URL.
    Remote(ImageReference),
    /// An image attachment, written to a temp file kept alive by `file`.
    Uploaded {
        reference: ImageReference,
        name: String,
        file: NamedTempFile,
    },
}

impl ResolvedInput {
    /// The reference to hand to the OCR client.
    pub fn reference(&self) -> &ImageReference {
        match self {
            ResolvedInput::Remote(r) => r,
            ResolvedInput::Uploaded { reference, .. } => reference,
        }
    }

    /// Path of the temp file backing an upload.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ResolvedInput::Remote(_) => None,
            ResolvedInput::Uploaded { file, .. } => Some(file.path()),
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, ResolvedInput::Uploaded { .. })
    }

    /// Delete the backing temp file now, logging if the delete fails.
    ///
    /// Dropping a `ResolvedInput` also deletes the file, silently; call this
    /// on the normal path so a failed delete shows up in the logs.
    pub fn release(self) {
        if let ResolvedInput::Uploaded { name, file, .. } = self {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!("Removed temp upload {} ({})", path.display(), name),
                Err(e) => warn!("Failed to remove temp upload {}: {}", path.display(), e),
            }
        }
    }
}

/// Classify `message` and produce its image reference.
///
/// 1. Any image attachment → its bytes go to a temp file under `upload_dir`
///    (system temp dir if None) and a `file://` reference is returned.
/// 2. Otherwise, trimmed text starting with `http://`/`https://` → that text.
/// 3. Otherwise → [`OcrError::NoImageInput`].
pub fn normalize_message(
    message: &ChatMessage,
    upload_dir: Option<&Path>,
) -> Result<ResolvedInput, OcrError> {
    if let Some(element) = message.first_image() {
        return materialize_upload(element, upload_dir);
    }

    let text = message.content.trim();
    if is_remote_url(text) {
        debug!("Message text is an image URL: {}", text);
        return Ok(ResolvedInput::Remote(ImageReference::parse(text)?));
    }

    Err(OcrError::NoImageInput)
}

/// Write an image attachment to a fresh temp file.
fn materialize_upload(
    element: &Element,
    upload_dir: Option<&Path>,
) -> Result<ResolvedInput, OcrError> {
    let name = if element.name.is_empty() {
        "<unnamed>"
    } else {
        element.name.as_str()
    };

    let owned;
    let bytes: &[u8] = match (&element.content, &element.path) {
        (Some(content), _) => content,
        (None, Some(path)) => {
            owned = std::fs::read(path).map_err(|e| {
                OcrError::attachment(name, format!("cannot read {}: {e}", path.display()))
            })?;
            &owned
        }
        (None, None) => return Err(OcrError::attachment(name, "attachment has no content")),
    };

    if bytes.is_empty() {
        return Err(OcrError::attachment(name, "attachment is empty"));
    }

    let suffix = format!(
        ".{}",
        element.extension().as_deref().unwrap_or(DEFAULT_EXTENSION)
    );
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(&suffix);
    let mut file = match upload_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| OcrError::attachment(name, format!("cannot create temp file: {e}")))?;

    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|e| OcrError::attachment(name, format!("cannot write temp file: {e}")))?;

    let reference = ImageReference::from_path(file.path())?;
    debug!(
        "Wrote {} bytes of '{}' to {}",
        bytes.len(),
        name,
        file.path().display()
    );

    Ok(ResolvedInput::Uploaded {
        reference,
        name: name.to_string(),
        file,
    })
}
