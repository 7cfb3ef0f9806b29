//! Message handling: the glue between a chat shell and the OCR pipeline.
//!
//! [`OcrAssistant::handle_message`] is the boundary where every
//! [`OcrError`] becomes a [`Reply`]. Nothing below it talks to the user and
//! nothing above it sees a `Result`.

use crate::config::OcrConfig;
use crate::error::{ErrorKind, OcrError};
use crate::message::ChatMessage;
use crate::output::OcrOutput;
use crate::pipeline::input::{normalize_message, ResolvedInput};
use crate::pipeline::llm::OcrClient;
use crate::shell::{ChatShell, Reply};
use std::sync::Arc;
use tracing::{debug, info};

/// Routes chat messages to the OCR endpoint.
///
/// Holds only the immutable config and a pooled HTTP client, so one
/// instance can be cloned into every chat session.
#[derive(Debug, Clone)]
pub struct OcrAssistant {
    client: OcrClient,
}

impl OcrAssistant {
    pub fn new(config: impl Into<Arc<OcrConfig>>) -> Result<Self, OcrError> {
        Ok(Self {
            client: OcrClient::new(config)?,
        })
    }

    pub fn client(&self) -> &OcrClient {
        &self.client
    }

    /// Greet a new chat session.
    pub fn start(&self, shell: &dyn ChatShell) {
        shell.send(&Reply::Welcome);
    }

    /// Normalise `message`, run one OCR request, and clean up.
    ///
    /// The temp file of an upload is deleted before this returns, whether
    /// the request succeeded or not.
    pub async fn process_message(&self, message: &ChatMessage) -> Result<OcrOutput, OcrError> {
        let resolved = normalize_message(message, self.client.config().upload_dir.as_deref())?;
        self.run(resolved, None).await
    }

    /// Handle one inbound message, sending every reply through `shell`.
    ///
    /// Sends a status reply before the request and exactly one final reply
    /// ([`Reply::Extracted`], [`Reply::Guidance`] or [`Reply::Failed`]).
    pub async fn handle_message(&self, message: &ChatMessage, shell: &dyn ChatShell) {
        let resolved = match normalize_message(message, self.client.config().upload_dir.as_deref())
        {
            Ok(resolved) => resolved,
            Err(e) => {
                shell.send(&reply_for_error(&e));
                return;
            }
        };

        let reply = match self.run(resolved, Some(shell)).await {
            Ok(output) => Reply::Extracted(output.text),
            Err(e) => reply_for_error(&e),
        };
        shell.send(&reply);
    }

    async fn run(
        &self,
        resolved: ResolvedInput,
        shell: Option<&dyn ChatShell>,
    ) -> Result<OcrOutput, OcrError> {
        if let Some(shell) = shell {
            let status = match &resolved {
                ResolvedInput::Uploaded { .. } => Reply::RunningUpload,
                ResolvedInput::Remote(url) => Reply::RunningUrl(url.to_string()),
            };
            shell.send(&status);
        }

        if let ResolvedInput::Uploaded { name, .. } = &resolved {
            info!("Running OCR on uploaded image '{}'", name);
        }

        let result = self.client.extract_output(resolved.reference()).await;
        resolved.release();
        result
    }
}

/// The reply a shell shows for `error`.
pub fn reply_for_error(error: &OcrError) -> Reply {
    match error.kind() {
        ErrorKind::Input => {
            debug!("No actionable input: {}", error);
            Reply::Guidance
        }
        _ => Reply::Failed(error.to_string()),
    }
}
