//! Chat-shell seam: the replies the assistant sends back to the user.
//!
//! The assistant never prints. It hands [`Reply`] values to a
//! [`ChatShell`], and the shell decides how to show them: a terminal, a web
//! socket, a test recorder. `Reply` implements `Display` with the default
//! user-facing wording, so simple shells can just call `to_string()`.
//!
//! # Example
//!
//! ```rust
//! use nexa_ocr::{ChatShell, Reply};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Transcript(Mutex<Vec<String>>);
//!
//! impl ChatShell for Transcript {
//!     fn send(&self, reply: &Reply) {
//!         self.0.lock().unwrap().push(reply.to_string());
//!     }
//! }
//!
//! let shell = Transcript::default();
//! shell.send(&Reply::Guidance);
//! assert!(shell.0.lock().unwrap()[0].contains("Upload an image"));
//! ```

use std::fmt;
use std::sync::Arc;

/// One outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Greeting sent when a chat session starts.
    Welcome,
    /// An uploaded image is being sent for OCR.
    RunningUpload,
    /// A pasted image URL is being sent for OCR.
    RunningUrl(String),
    /// OCR succeeded; carries the text verbatim.
    Extracted(String),
    /// The message had nothing to OCR.
    Guidance,
    /// Attachment or request failure, already rendered for the user.
    Failed(String),
}

impl Reply {
    /// True for replies that end the handling of a message.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Reply::Extracted(_) | Reply::Guidance | Reply::Failed(_)
        )
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Welcome => write!(
                f,
                "👋 Welcome to **Nexa OCR Assistant!**\n\n\
                 Upload an image or paste an image URL, and I'll extract the text for you."
            ),
            Reply::RunningUpload => write!(f, "🔍 Running OCR on uploaded image..."),
            Reply::RunningUrl(url) => write!(f, "🔗 Received image URL: {url}\nRunning OCR..."),
            Reply::Extracted(text) => write!(f, "✅ **Extracted Text:**\n\n{text}"),
            Reply::Guidance => write!(
                f,
                "Please either:\n\
                 1️⃣ Upload an image file, or\n\
                 2️⃣ Paste a direct image URL."
            ),
            Reply::Failed(msg) => write!(f, "❌ Error: {msg}"),
        }
    }
}

/// Receives replies from [`crate::assistant::OcrAssistant`].
///
/// Implementations must be `Send + Sync`: one assistant may serve many
/// sessions concurrently, each with its own shell.
pub trait ChatShell: Send + Sync {
    fn send(&self, reply: &Reply);
}

/// A shell that discards every reply.
pub struct NoopShell;

impl ChatShell for NoopShell {
    fn send(&self, _reply: &Reply) {}
}

impl<S: ChatShell + ?Sized> ChatShell for Arc<S> {
    fn send(&self, reply: &Reply) {
        (**self).send(reply)
    }
}
