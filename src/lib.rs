//! # nexa-ocr
//!
//! A chat front end for OCR models served behind an OpenAI-compatible
//! chat-completion API (by default DeepSeek-OCR on a local Nexa server).
//!
//! The crate does no image processing of its own. It turns whatever the user
//! sent (an uploaded image or a pasted image URL) into one image URL, sends
//! one request, and hands the model's text back to the chat shell.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ChatMessage
//!  │
//!  ├─ 1. Input   upload → scoped temp file (file://) | text → http(s) URL
//!  ├─ 2. Encode  optionally inline local files as data: URLs
//!  ├─ 3. Request one chat-completion call: [image_url, "<|FREE|>OCR."]
//!  └─ 4. Reply   extracted text or a user-facing error, via ChatShell
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nexa_ocr::{ChatMessage, OcrAssistant, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // NEXA_OCR_BASE_URL / NEXA_OCR_API_KEY / NEXA_OCR_MODEL override the defaults
//!     let assistant = OcrAssistant::new(OcrConfig::from_env()?)?;
//!     let message = ChatMessage::text("https://example.com/receipt.jpg");
//!     let output = assistant.process_message(&message).await?;
//!     println!("{}", output.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nexa-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assistant;
pub mod config;
pub mod error;
pub mod message;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod reference;
pub mod shell;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assistant::{reply_for_error, OcrAssistant};
pub use config::{OcrConfig, OcrConfigBuilder};
pub use error::{ErrorKind, OcrError};
pub use message::{ChatMessage, Element, ElementKind};
pub use output::{OcrOutput, TokenUsage};
pub use pipeline::input::{normalize_message, ResolvedInput};
pub use pipeline::llm::OcrClient;
pub use reference::ImageReference;
pub use shell::{ChatShell, NoopShell, Reply};
