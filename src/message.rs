//! Inbound chat message shape.
//!
//! The chat shell owns its own protocol; the core only needs a text body and
//! a list of typed attachments. Shells map whatever they receive onto
//! [`ChatMessage`] before calling into [`crate::assistant::OcrAssistant`].

use image::ImageFormat;
use std::path::{Path, PathBuf};

/// A single inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    /// Free-form text typed by the user.
    pub content: String,
    /// Attachments in the order the user added them.
    pub elements: Vec<Element>,
}

impl ChatMessage {
    /// A text-only message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// The first attachment tagged as an image, if any.
    pub fn first_image(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.kind == ElementKind::Image)
    }
}

/// Type tag the shell attaches to each element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Image,
    File,
    Audio,
    Video,
    Other(String),
}

impl ElementKind {
    /// Map a shell's free-form type tag (`"image"`, `"file"`, …) to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => ElementKind::Image,
            "file" => ElementKind::File,
            "audio" => ElementKind::Audio,
            "video" => ElementKind::Video,
            other => ElementKind::Other(other.to_string()),
        }
    }

    /// Classify raw bytes: `Image` if the magic bytes or the filename
    /// extension name an image format, otherwise `File`.
    pub fn sniff(bytes: &[u8], name: &str) -> Self {
        if image::guess_format(bytes).is_ok() || ImageFormat::from_path(name).is_ok() {
            ElementKind::Image
        } else {
            ElementKind::File
        }
    }
}

/// An attachment carried by a [`ChatMessage`].
///
/// Shells that buffer uploads in memory fill `content`; shells that spool
/// uploads to disk fill `path` instead. `content` wins when both are set.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    /// Original filename as uploaded, e.g. `table.png`. May be empty.
    pub name: String,
    pub content: Option<Vec<u8>>,
    pub path: Option<PathBuf>,
}

impl Element {
    /// An in-memory image attachment.
    pub fn image(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ElementKind::Image,
            name: name.into(),
            content: Some(bytes.into()),
            path: None,
        }
    }

    /// An attachment that lives on disk and is read lazily.
    pub fn on_disk(kind: ElementKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            kind,
            name,
            content: None,
            path: Some(path),
        }
    }

    /// Read a local file into an attachment, tagging it by sniffing its bytes.
    pub async fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            kind: ElementKind::sniff(&bytes, &name),
            name,
            content: Some(bytes),
            path: None,
        })
    }

    /// Lower-cased filename extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase())
    }
}
