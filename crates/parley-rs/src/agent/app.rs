//! The application context: one storage root, one ask service.
//!
//! [`AppContext`] is built once at startup and passed by reference to
//! whatever drives it (the chat gateway, the CLI). It owns the single
//! [`RecordLog`] both typed stores share, so every partition has at most one
//! append handle for the life of the process.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::ask::{Answer, AskError, AskRequest, AskService};
use crate::api::provider::CompletionProvider;
use crate::config::ParleyConfig;
use crate::store::{
    MAX_HISTORY_DEPTH, Message, MessageStore, RecordLog, SpendEntry, SpendLedger, StoreError,
};
use crate::usd::Usd;

pub struct AppContext {
    log: Arc<RecordLog>,
    messages: MessageStore,
    ledger: SpendLedger,
    asker: AskService,
    config: ParleyConfig,
}

impl AppContext {
    /// Open the storage under `config.data_dir` and wire the ask flow to
    /// `provider`.
    pub fn open(
        config: &ParleyConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, StoreError> {
        let log = Arc::new(RecordLog::open(&config.data_dir, MAX_HISTORY_DEPTH)?);
        let ctx = Self {
            messages: MessageStore::new(Arc::clone(&log)),
            ledger: SpendLedger::new(Arc::clone(&log)),
            asker: AskService::from_config(config, provider),
            config: config.clone(),
            log,
        };
        info!(
            "Opened data dir {}: model={}, max_history_depth={}, max_context_words={}",
            config.data_dir.display(),
            config.model,
            config.max_history_depth,
            config.max_context_words
        );
        Ok(ctx)
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn ledger(&self) -> &SpendLedger {
        &self.ledger
    }

    pub fn ask_service(&self) -> &AskService {
        &self.asker
    }

    /// Save a chat message that is not addressed to the bot.
    pub fn log_message(&self, message: &Message) -> Result<(), StoreError> {
        self.messages.save(message)
    }

    pub async fn ask(&self, request: AskRequest) -> Result<Answer, AskError> {
        self.asker.ask(&self.messages, &self.ledger, request).await
    }

    pub async fn ask_at(
        &self,
        request: AskRequest,
        now: DateTime<Utc>,
    ) -> Result<Answer, AskError> {
        self.asker
            .ask_at(&self.messages, &self.ledger, request, now)
            .await
    }

    /// All-time spend of a chat.
    pub fn total_spend(&self, chat_id: i64) -> Result<Usd, StoreError> {
        self.ledger.total(chat_id)
    }

    pub fn spend_entries(&self, chat_id: i64) -> Result<Vec<SpendEntry>, StoreError> {
        self.ledger.entries(chat_id)
    }

    /// Up to `limit` most recent messages of a chat within `[start, end]`,
    /// oldest first.
    pub fn history(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        self.messages.query(chat_id, start, end, limit)
    }

    /// Flush and release every append handle.
    pub fn shutdown(&self) -> Result<(), StoreError> {
        let handles = self.log.open_handles();
        self.log.close_all()?;
        info!("Closed {handles} append handle(s)");
        Ok(())
    }
}
