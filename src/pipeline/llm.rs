//! OCR request client: one chat-completion call per image reference.
//!
//! The request is a single user turn with two content parts, always in this
//! order: the image URL, then the fixed [`FREE_OCR_PROMPT`] directive.
//! Streaming is off and output is capped at
//! [`OcrConfig::max_tokens`](crate::config::OcrConfig::max_tokens).
//!
//! No retry loop and no cache: every call is exactly one HTTP exchange, and
//! the caller decides what to tell the user when it fails.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::output::{OcrOutput, TokenUsage};
use crate::pipeline::encode;
use crate::prompts::FREE_OCR_PROMPT;
use crate::reference::ImageReference;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest slice of an error response body quoted in an error message.
const BODY_SNIPPET_CHARS: usize = 200;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

/// Only the first choice is decoded strictly. Later choices and the usage
/// block stay raw JSON.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

impl Usage {
    /// Token counts, or `None` when the block is missing or not usable.
    fn from_raw(raw: Option<serde_json::Value>) -> Option<TokenUsage> {
        let usage: Usage = serde_json::from_value(raw?).ok()?;
        Some(TokenUsage {
            prompt_tokens: usage.prompt_tokens.unwrap_or_default(),
            completion_tokens: usage.completion_tokens.unwrap_or_default(),
        })
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Client for an OpenAI-compatible OCR endpoint.
///
/// Cloning is cheap: the HTTP connection pool and the config are shared.
/// The config is never mutated after construction, so one client can serve
/// any number of concurrent chat sessions.
#[derive(Debug, Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    config: Arc<OcrConfig>,
    endpoint: String,
}

impl OcrClient {
    /// Build a client with the config's timeouts applied to every request.
    pub fn new(config: impl Into<Arc<OcrConfig>>) -> Result<Self, OcrError> {
        let config = config.into();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| OcrError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        let endpoint = config.completions_url();

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run OCR on `reference` and return the extracted text verbatim.
    pub async fn extract(&self, reference: &ImageReference) -> Result<String, OcrError> {
        Ok(self.extract_output(reference).await?.text)
    }

    /// Run OCR on `reference`, returning text plus timing and token usage.
    pub async fn extract_output(&self, reference: &ImageReference) -> Result<OcrOutput, OcrError> {
        let image_url = encode::image_url_for(reference, self.config.embed_local_images).await?;
        let request = build_request(&self.config, &image_url);

        info!("OCR request → {} (model {})", reference, self.config.model);
        let start = Instant::now();

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!("OCR endpoint answered HTTP {}", status);
            return Err(OcrError::request(
                &self.endpoint,
                format!("HTTP {}: {}", status, snippet(&body)),
            ));
        }

        let (text, usage) = parse_response(&self.endpoint, &body)?;
        let duration = start.elapsed();

        debug!(
            "OCR response: {} chars, usage {:?}, {:?}",
            text.len(),
            usage,
            duration
        );
        info!("OCR complete in {}ms", duration.as_millis());

        Ok(OcrOutput {
            text,
            image: reference.clone(),
            model: self.config.model.clone(),
            duration_ms: duration.as_millis() as u64,
            usage,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> OcrError {
        let detail = if e.is_timeout() {
            format!(
                "timed out after {}s ({})",
                self.config.request_timeout_secs,
                error_chain(&e)
            )
        } else if e.is_connect() {
            format!("connection failed: {}", error_chain(&e))
        } else {
            error_chain(&e)
        };
        warn!("OCR request failed: {}", detail);
        OcrError::request(&self.endpoint, detail)
    }
}

/// Build the chat-completion body for one image.
fn build_request<'a>(config: &'a OcrConfig, image_url: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![RequestMessage {
            role: "user",
            content: vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
                ContentPart::Text {
                    text: FREE_OCR_PROMPT,
                },
            ],
        }],
        stream: false,
        max_tokens: config.max_tokens,
    }
}

/// Pull the first choice's content out of a response body.
fn parse_response(endpoint: &str, body: &str) -> Result<(String, Option<TokenUsage>), OcrError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        OcrError::request(
            endpoint,
            format!("unparseable response body ({e}): {}", snippet(body)),
        )
    })?;

    let usage = Usage::from_raw(parsed.usage);

    let first = parsed
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::request(endpoint, "response contained no choices"))?;

    let choice: Choice = serde_json::from_value(first).map_err(|e| {
        OcrError::request(endpoint, format!("malformed first choice ({e}): {}", snippet(body)))
    })?;

    let text = choice
        .message
        .content
        .ok_or_else(|| OcrError::request(endpoint, "first choice has no text content"))?;

    Ok((text, usage))
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    match trimmed.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}\u{2026}", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// `Display` of an error followed by each of its sources.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
