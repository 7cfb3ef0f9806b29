//! Error types for the nexa-ocr library.
//!
//! Every failure the core can produce is an [`OcrError`]. Callers that need
//! to branch on the failure class (e.g. a chat shell choosing between a
//! guidance prompt and an error line) match on [`OcrError::kind`] instead of
//! on individual variants, so new variants never break a shell.
//!
//! None of these errors are fatal to the process: the
//! [`crate::assistant::OcrAssistant`] turns each one into a
//! [`crate::shell::Reply`] at the boundary with the chat shell.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// All errors returned by the nexa-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The message carried neither an image attachment nor URL-shaped text.
    #[error("No image found: upload an image or paste a direct http:// or https:// image URL")]
    NoImageInput,

    /// A string was offered as an image reference but has no recognised scheme.
    #[error("Invalid image reference '{input}': expected an http://, https:// or file:// URL")]
    InvalidReference { input: String },

    // ── Attachment errors ─────────────────────────────────────────────────
    /// An image attachment was present but its bytes were empty or unreadable.
    #[error("Could not read attached image '{name}': {reason}")]
    AttachmentRead { name: String, reason: String },

    // ── Request errors ────────────────────────────────────────────────────
    /// The OCR endpoint was unreachable, answered with a non-success status,
    /// or returned a body without usable text.
    #[error("OCR request to '{endpoint}' failed: {detail}")]
    RequestFailed { endpoint: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`OcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Nothing in the inbound message could be turned into an image reference.
    Input,
    /// An image attachment could not be read or materialised.
    AttachmentRead,
    /// The inference endpoint call failed.
    Request,
    /// The configuration is unusable.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::AttachmentRead => "attachment_read",
            ErrorKind::Request => "request",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OcrError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::NoImageInput | OcrError::InvalidReference { .. } => ErrorKind::Input,
            OcrError::AttachmentRead { .. } => ErrorKind::AttachmentRead,
            OcrError::RequestFailed { .. } => ErrorKind::Request,
            OcrError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn request(endpoint: &str, detail: impl Into<String>) -> Self {
        OcrError::RequestFailed {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn attachment(name: &str, reason: impl Into<String>) -> Self {
        OcrError::AttachmentRead {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
