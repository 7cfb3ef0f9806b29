//! The canonical image locator handed to the OCR endpoint.

use crate::error::OcrError;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const REMOTE_SCHEMES: [&str; 2] = ["http://", "https://"];
const FILE_SCHEME: &str = "file://";

/// A URL pointing at image bytes: `http://`, `https://` or `file://`.
///
/// Only the scheme prefix is checked. Whether the URL actually resolves to
/// an image is for the inference server to find out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    /// Accept `input` verbatim if it carries a recognised scheme.
    pub fn parse(input: impl Into<String>) -> Result<Self, OcrError> {
        let input = input.into();
        if is_remote_url(&input) || input.starts_with(FILE_SCHEME) {
            Ok(Self(input))
        } else {
            Err(OcrError::InvalidReference { input })
        }
    }

    /// Build a `file://` reference for a local path.
    ///
    /// Relative paths are made absolute against the current directory.
    pub fn from_path(path: &Path) -> Result<Self, OcrError> {
        let absolute = std::path::absolute(path).map_err(|e| OcrError::InvalidReference {
            input: format!("{} ({e})", path.display()),
        })?;
        let url = Url::from_file_path(&absolute).map_err(|_| OcrError::InvalidReference {
            input: absolute.display().to_string(),
        })?;
        Ok(Self(url.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `file://` references.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(FILE_SCHEME)
    }

    /// The filesystem path behind a `file://` reference.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_local() {
            return None;
        }
        Url::parse(&self.0).ok()?.to_file_path().ok()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check if the input string starts like an HTTP(S) URL.
pub fn is_remote_url(input: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|s| input.starts_with(s))
}
