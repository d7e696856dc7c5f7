/// Remote generative model integration
///
/// The editor only needs three request/response calls from the model:
/// transform an image by prompt, generate an image from a prompt, and
/// rewrite a prompt. [`ImageService`] is that seam; [`gemini`] is the
/// production implementation.

pub mod gemini;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::state::data::{FormatError, Image};
use crate::state::session::{Completion, Job, Output, Request};

pub use gemini::GeminiClient;

/// Errors from the remote model. Kept `Clone` so results can travel in UI messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network, timeout, or body decoding failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A response with no image part (often a blocked request)
    #[error("no image data found in the response{}", reason_suffix(.reason))]
    NoImage { reason: Option<String> },

    /// A text call that came back empty
    #[error("no text found in the response")]
    NoText,

    /// The image part could not be decoded
    #[error("invalid image payload: {0}")]
    Payload(#[from] FormatError),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Http(err.to_string())
    }
}

/// The three remote operations the editor consumes
pub trait ImageService: Send + Sync + 'static {
    /// Transform `image` according to `prompt`
    fn edit_image(
        &self,
        image: Image,
        prompt: String,
    ) -> impl Future<Output = Result<Image, RemoteError>> + Send;

    /// Produce a new image from text alone
    fn generate_image(
        &self,
        prompt: String,
    ) -> impl Future<Output = Result<Image, RemoteError>> + Send;

    /// Rewrite a prompt to be more descriptive
    fn enhance_prompt(
        &self,
        prompt: String,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

/// Run one job against the service and package the result for the session
pub async fn dispatch<S: ImageService>(service: Arc<S>, job: Job) -> Completion {
    let Job { ticket, request } = job;
    debug!(action = ?ticket.action, "calling remote model");

    let result = match request {
        Request::Edit { image, prompt } => service.edit_image(image, prompt).await.map(Output::Image),
        Request::Generate { prompt } => service.generate_image(prompt).await.map(Output::Image),
        Request::EnhancePrompt { prompt } => service.enhance_prompt(prompt).await.map(Output::Text),
    };

    Completion { ticket, result }
}
