//! Application configuration with sensible defaults.
//!
//! [`ParleyConfig`] captures everything the ask flow needs and converts it
//! into library types via [`window_builder`](ParleyConfig::window_builder)
//! and [`pricing`](ParleyConfig::pricing). Every field has a default, so a
//! config file only needs to name what it changes.

use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::api::client::{DEFAULT_MODEL, OPENAI_URL};
use crate::api::pricing::{ModelPricing, known_pricing};
use crate::context::{
    ContextWindowBuilder, DEFAULT_MAX_CONTEXT_WORDS, DEFAULT_MAX_HISTORY_DEPTH, PromptTemplates,
};

/// Name the bot's own answers are logged under.
pub const DEFAULT_BOT_USERNAME: &str = "AIBot";

/// Default cap on generated tokens per answer.
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 1_000;

const SECONDS_PER_MINUTE: i32 = 60;
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// Configuration for a parley instance.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ParleyConfig {
    /// Directory holding the chat and spend logs. Default: `"data"`.
    pub data_dir: PathBuf,
    /// Model identifier. Default: `"gpt-4o-mini"`.
    pub model: String,
    /// Chat completions endpoint. Default: the public OpenAI URL.
    pub api_url: String,
    /// Maximum tokens per answer. Default: `1000`.
    pub max_completion_tokens: u32,
    /// Maximum messages fetched for one context window. Default: `1000`.
    pub max_history_depth: usize,
    /// Word budget of one context window. Default: `10000`.
    pub max_context_words: usize,
    /// Username the bot's answers are logged under. Default: `"AIBot"`.
    pub bot_username: String,
    /// User id the bot's answers are logged under. Default: `0`.
    pub bot_user_id: i64,
    /// Offset from UTC, in minutes, used to decide calendar days.
    /// Default: `0`.
    pub utc_offset_minutes: i32,
    /// Optional system message sent with every question.
    pub system_prompt: Option<String>,
    /// Explicit price, overriding the built-in table.
    pub pricing: Option<ModelPricing>,
    /// Prompt phrasing.
    pub templates: PromptTemplates,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            model: DEFAULT_MODEL.to_string(),
            api_url: OPENAI_URL.to_string(),
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
            max_context_words: DEFAULT_MAX_CONTEXT_WORDS,
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
            bot_user_id: 0,
            utc_offset_minutes: 0,
            system_prompt: None,
            pricing: None,
            templates: PromptTemplates::default(),
        }
    }
}

impl ParleyConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    pub fn with_max_history_depth(mut self, depth: usize) -> Self {
        self.max_history_depth = depth;
        self
    }

    pub fn with_max_context_words(mut self, words: usize) -> Self {
        self.max_context_words = words;
        self
    }

    pub fn with_bot_identity(mut self, user_id: i64, username: impl Into<String>) -> Self {
        self.bot_user_id = user_id;
        self.bot_username = username.into();
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Reject values that cannot work at all.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }
        if self.max_completion_tokens == 0 {
            return Err("max_completion_tokens must be positive".into());
        }
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(format!(
                "utc_offset_minutes must be within ±{MAX_OFFSET_MINUTES}, got {}",
                self.utc_offset_minutes
            ));
        }
        if let Some(p) = self.pricing
            && (p.input_per_million < 0.0 || p.output_per_million < 0.0)
        {
            return Err("pricing must not be negative".into());
        }
        Ok(())
    }

    /// The configured offset, or UTC when it is out of range.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(SECONDS_PER_MINUTE))
            .unwrap_or_else(|| {
                warn!(
                    "utc_offset_minutes={} is out of range; using UTC",
                    self.utc_offset_minutes
                );
                Utc.fix()
            })
    }

    /// Pricing for the configured model: the explicit override, else the
    /// built-in table, else a default estimate.
    pub fn pricing(&self) -> ModelPricing {
        if let Some(p) = self.pricing {
            return p;
        }
        known_pricing(&self.model).unwrap_or_else(|| {
            warn!(
                "No pricing known for model '{}'; using default estimate",
                self.model
            );
            ModelPricing::default()
        })
    }

    /// A [`ContextWindowBuilder`] with this config's limits and phrasing.
    pub fn window_builder(&self) -> ContextWindowBuilder {
        ContextWindowBuilder::default()
            .with_max_context_words(self.max_context_words)
            .with_max_history_depth(self.max_history_depth)
            .with_utc_offset(self.utc_offset())
            .with_templates(self.templates.clone())
    }
}
