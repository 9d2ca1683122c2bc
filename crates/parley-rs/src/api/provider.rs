//! The completion provider seam.
//!
//! The ask flow only needs "prompt in, text and token counts out". Anything
//! that can do that implements [`CompletionProvider`]; the crate ships
//! [`OpenAiClient`](super::client::OpenAiClient) for OpenAI-compatible HTTP
//! endpoints, and tests plug in scripted fakes.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`CompletionProvider::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>>;

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    /// Optional system message sent before the prompt.
    pub system: Option<String>,
    pub prompt: String,
    pub max_completion_tokens: u32,
}

/// Generated text and the token usage it was billed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Something that turns a prompt into generated text.
///
/// Errors are human-readable strings and are not retried by the caller.
pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}
