//! Chat memory for a question-answering chat bot.
//!
//! `parley-rs` keeps an append-only log of every message in every chat, a
//! ledger of what each answer cost, and builds word-budgeted context windows
//! from recent history so a completion model can answer questions about the
//! conversation. The core abstraction is the
//! [`AskService`](agent::ask::AskService): one call saves the question,
//! assembles context, asks the model, charges the ledger and logs the answer.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use parley_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("OPENAI_API_KEY").map_err(|e| e.to_string())?;
//!     let client = OpenAiClient::new(api_key)?;
//!
//!     let config = ParleyConfig::new("./data").with_max_context_words(2_000);
//!     let ctx = AppContext::open(&config, Arc::new(client)).map_err(|e| e.to_string())?;
//!
//!     let now = Utc::now();
//!     let question = Message::new(42, now, 7, "alice", "/ask_today what did we decide?");
//!     let request = AskRequest::new(question, "what did we decide?", now - Duration::days(1));
//!     let answer = ctx.ask(request).await.map_err(|e| e.to_string())?;
//!
//!     println!("{}", answer.text);
//!     println!("Total spend: ${}", ctx.total_spend(42).map_err(|e| e.to_string())?.to_fixed(6));
//!     ctx.shutdown().map_err(|e| e.to_string())
//! }
//! ```
//!
//! # Where to find things
//!
//! If you're looking for how to...
//!
//! - **Store and query messages:** see [`MessageStore`](store::MessageStore)
//!   and [`Message`](store::Message). History is read backward from the end
//!   of a chat's log, so recent queries stay cheap on long-lived chats.
//!
//! - **Track spend:** see [`SpendLedger`](store::SpendLedger). Amounts are
//!   exact [`Usd`](usd::Usd) values; per-model prices live in
//!   [`api::pricing`].
//!
//! - **Control what the model sees:** see
//!   [`ContextWindowBuilder`](context::ContextWindowBuilder) for the word
//!   budget, depth limit and calendar offset, and
//!   [`PromptTemplates`](context::PromptTemplates) for the phrasing.
//!
//! - **Plug in another model backend:** implement
//!   [`CompletionProvider`](api::provider::CompletionProvider). The bundled
//!   [`OpenAiClient`](api::client::OpenAiClient) speaks the OpenAI chat
//!   completions protocol.
//!
//! - **Store something else:** implement [`Record`](store::Record) for your
//!   type and use [`RecordLog`](store::RecordLog) directly.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`store`] | Append-only record log, message store, spend ledger |
//! | [`context`] | Context window builder and prompt templates |
//! | [`api`] | Completion provider trait, OpenAI client, pricing |
//! | [`agent`] | Ask flow and application context |
//! | [`config`] | [`ParleyConfig`](config::ParleyConfig) with defaults |
//! | [`usd`] | Exact decimal dollar amounts |

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod prelude;
pub mod store;
pub mod usd;

pub use api::client::{DEFAULT_MODEL, OPENAI_URL};
