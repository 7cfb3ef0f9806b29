//! Pipeline stages for turning a chat message into extracted text.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm
//! (message)  (URL)     (endpoint)
//! ```
//!
//! 1. [`input`]: classify the message; write uploads to a scoped temp file
//! 2. [`encode`]: pick the URL to send, optionally inlining local files
//! 3. [`llm`]: one chat-completion request; the only stage with network I/O

pub mod encode;
pub mod input;
pub mod llm;
