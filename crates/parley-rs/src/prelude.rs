//! Convenience re-exports for common `parley-rs` types.
//!
//! ```ignore
//! use parley_rs::prelude::*;
//! ```
//!
//! Pulls in what a gateway needs: the [`AppContext`] and ask types, the
//! config, messages, the completion provider seam and the OpenAI client.
//! Lower-level storage types ([`RecordLog`](crate::store::RecordLog),
//! [`Record`](crate::store::Record)) are left out; import them from
//! [`store`](crate::store) when needed.

// ── Ask flow ────────────────────────────────────────────────────────
pub use crate::agent::{Answer, AppContext, AskError, AskRequest, AskService};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::ParleyConfig;
pub use crate::context::{ContextWindowBuilder, PromptTemplates};

// ── Storage ─────────────────────────────────────────────────────────
pub use crate::store::{Message, MessageStore, SpendEntry, SpendLedger, StoreError};
pub use crate::usd::Usd;

// ── Completion API ──────────────────────────────────────────────────
pub use crate::api::{
    Completion, CompletionFuture, CompletionProvider, CompletionRequest, ModelPricing,
    OpenAiClient,
};
