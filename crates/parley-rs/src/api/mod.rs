//! Completion API layer: the provider seam, the HTTP client, and pricing.
//!
//! - [`provider`]: [`CompletionProvider`], the trait the ask flow talks to,
//!   plus its request and result types.
//! - [`client`]: [`OpenAiClient`], an async client for OpenAI-compatible
//!   chat completion endpoints.
//! - [`pricing`]: per-model [`ModelPricing`] tables that turn token usage
//!   into an exact dollar cost.

pub mod client;
pub mod pricing;
pub mod provider;

pub use client::{ApiMessage, ChatRequest, DEFAULT_MODEL, OPENAI_URL, OpenAiClient, Role};
pub use pricing::{ModelPricing, known_pricing, pricing_for_model};
pub use provider::{Completion, CompletionFuture, CompletionProvider, CompletionRequest};
