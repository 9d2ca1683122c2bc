//! The ask flow: question in, answer out, every step logged.
//!
//! [`AskService::ask_at`] runs one question end to end:
//!
//! 1. Save the inbound message to the chat log.
//! 2. Build and render a context window from the history since the
//!    requested start.
//! 3. Send the prompt to the [`CompletionProvider`].
//! 4. Price the token usage and record it in the spend ledger.
//! 5. Save the answer to the chat log under the bot's identity.
//!
//! A failure at any step aborts the rest; steps already done stay done.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::pricing::{ModelPricing, pricing_for_model};
use crate::api::provider::{CompletionProvider, CompletionRequest};
use crate::config::{DEFAULT_BOT_USERNAME, DEFAULT_MAX_COMPLETION_TOKENS, ParleyConfig};
use crate::context::ContextWindowBuilder;
use crate::store::{Message, MessageStore, SpendLedger, StoreError};
use crate::usd::Usd;

/// Errors from the ask flow.
#[derive(Error, Debug)]
pub enum AskError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("completion failed: {0}")]
    Provider(String),
}

/// One question to answer.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub chat_id: i64,
    /// The text the model should answer.
    pub question: String,
    /// History from this instant up to the time of asking is used as context.
    pub context_start: DateTime<Utc>,
    /// The chat message that carried the question. Saved before anything
    /// else happens; its username is the one the prompt addresses.
    pub message: Message,
}

impl AskRequest {
    /// A request for `question`, asked by `message`, in `message`'s chat.
    pub fn new(
        message: Message,
        question: impl Into<String>,
        context_start: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id: message.chat_id,
            question: question.into(),
            context_start,
            message,
        }
    }
}

/// The outcome of a successful ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub cost: Usd,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// History lines that made it into the prompt.
    pub context_lines: usize,
}

/// Answers questions with chat history as context.
///
/// Holds no storage of its own; the message store and ledger are passed to
/// each call so one service can serve any number of stores.
pub struct AskService {
    provider: Arc<dyn CompletionProvider>,
    builder: ContextWindowBuilder,
    model: String,
    max_completion_tokens: u32,
    system_prompt: Option<String>,
    pricing: ModelPricing,
    bot_user_id: i64,
    bot_username: String,
}

impl AskService {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            provider,
            builder: ContextWindowBuilder::default(),
            pricing: pricing_for_model(&model),
            model,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            system_prompt: None,
            bot_user_id: 0,
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
        }
    }

    /// A service configured from `config`.
    pub fn from_config(config: &ParleyConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let mut service = Self::new(provider, config.model.clone())
            .with_window_builder(config.window_builder())
            .with_max_completion_tokens(config.max_completion_tokens)
            .with_pricing(config.pricing())
            .with_bot_identity(config.bot_user_id, config.bot_username.clone());
        service.system_prompt = config.system_prompt.clone();
        service
    }

    pub fn with_window_builder(mut self, builder: ContextWindowBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_bot_identity(mut self, user_id: i64, username: impl Into<String>) -> Self {
        self.bot_user_id = user_id;
        self.bot_username = username.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn window_builder(&self) -> &ContextWindowBuilder {
        &self.builder
    }

    /// Answer `request` now.
    pub async fn ask(
        &self,
        messages: &MessageStore,
        ledger: &SpendLedger,
        request: AskRequest,
    ) -> Result<Answer, AskError> {
        self.ask_at(messages, ledger, request, Utc::now()).await
    }

    /// Answer `request` as if it were asked at `now`.
    ///
    /// An inbound message stamped later than `now` moves `now` forward to its
    /// timestamp, so the question stays inside its own context window and the
    /// answer is never logged before it.
    pub async fn ask_at(
        &self,
        messages: &MessageStore,
        ledger: &SpendLedger,
        request: AskRequest,
        now: DateTime<Utc>,
    ) -> Result<Answer, AskError> {
        let AskRequest {
            chat_id,
            question,
            context_start,
            message,
        } = request;
        let now = now.max(message.timestamp);

        messages.save(&message)?;

        let window = self.builder.build(
            messages,
            chat_id,
            &message.username,
            &question,
            context_start,
            now,
        );
        let prompt = window.render(self.builder.templates());
        debug!(
            "Ask in chat {}: {} context line(s), prompt {} bytes",
            chat_id,
            window.lines.len(),
            prompt.len()
        );

        let completion_request = CompletionRequest {
            model: self.model.clone(),
            system: self.system_prompt.clone(),
            prompt,
            max_completion_tokens: self.max_completion_tokens,
        };
        let completion = self
            .provider
            .complete(&completion_request)
            .await
            .map_err(AskError::Provider)?;

        let cost = self
            .pricing
            .estimate_cost(completion.prompt_tokens, completion.completion_tokens);
        ledger.record(chat_id, cost, now)?;

        let reply = Message::new(
            chat_id,
            now,
            self.bot_user_id,
            self.bot_username.clone(),
            completion.text.clone(),
        );
        messages.save(&reply)?;

        info!(
            "Answered in chat {}: model={}, tokens={}+{}, cost=${}, context_lines={}",
            chat_id,
            self.model,
            completion.prompt_tokens,
            completion.completion_tokens,
            cost,
            window.lines.len()
        );

        Ok(Answer {
            text: completion.text,
            cost,
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            context_lines: window.lines.len(),
        })
    }
}
