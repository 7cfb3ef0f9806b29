//! Result types returned by a successful OCR request.

use crate::reference::ImageReference;
use serde::Serialize;

/// Text extracted from one image, plus request bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutput {
    /// Content of the first response choice, exactly as the model returned it.
    pub text: String,
    /// The reference that was sent.
    pub image: ImageReference,
    /// Model identifier the request selected.
    pub model: String,
    /// Wall-clock time of the HTTP exchange.
    pub duration_ms: u64,
    /// Token accounting, when the server reports it.
    pub usage: Option<TokenUsage>,
}

/// Token counts reported in the response's `usage` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}
