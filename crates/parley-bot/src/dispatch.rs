//! Routes chat events to the application context.

use chrono::{DateTime, Utc};
use parley_rs::agent::{AppContext, AskError, AskRequest};
use tracing::{debug, warn};

use crate::commands::Command;
use crate::event::{ChatEvent, Reply};

/// Reply sent when the completion provider fails.
pub const PROVIDER_FAILURE_REPLY: &str = "Sorry, I couldn't get an answer right now.";

/// Decimal places shown by `/spent`.
const SPEND_PLACES: u32 = 6;

/// Handles one chat event at a time against a shared [`AppContext`].
///
/// Storage calls (appends with `sync_data`, file scans) run inline on the
/// async task. Events are handled one at a time, so no other work waits
/// behind them.
pub struct Dispatcher<'a> {
    ctx: &'a AppContext,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Handle `event` now.
    pub async fn handle(&self, event: &ChatEvent) -> Result<Option<Reply>, AskError> {
        self.handle_at(event, Utc::now()).await
    }

    /// Handle `event` as if it arrived at `now`.
    ///
    /// Plain messages are logged and produce no reply. Commands with usage
    /// errors are answered with the usage text and not logged. Provider
    /// failures become a reply; storage failures are returned.
    pub async fn handle_at(
        &self,
        event: &ChatEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<Reply>, AskError> {
        let command = match event.text.as_deref().and_then(Command::parse) {
            None => {
                self.ctx.log_message(&event.to_message())?;
                debug!("Logged message from {} in chat {}", event.sender_id, event.chat_id);
                return Ok(None);
            }
            Some(Err(usage)) => return Ok(Some(Reply::new(event.chat_id, usage.to_string()))),
            Some(Ok(command)) => command,
        };

        let question = match command.question(event.reply_to_text.as_deref()) {
            Ok(Some(question)) => question,
            Ok(None) => return self.spent(event.chat_id).map(Some),
            Err(usage) => return Ok(Some(Reply::new(event.chat_id, usage.to_string()))),
        };
        let offset = self.ctx.config().utc_offset();
        let context_start = command.context_start(now, offset).unwrap_or(now);

        let request = AskRequest::new(event.to_message(), question, context_start);
        match self.ctx.ask_at(request, now).await {
            Ok(answer) => Ok(Some(Reply::new(event.chat_id, answer.text))),
            Err(AskError::Provider(e)) => {
                warn!("Completion failed in chat {}: {e}", event.chat_id);
                Ok(Some(Reply::new(event.chat_id, PROVIDER_FAILURE_REPLY)))
            }
            Err(e) => Err(e),
        }
    }

    fn spent(&self, chat_id: i64) -> Result<Reply, AskError> {
        let total = self.ctx.total_spend(chat_id)?;
        Ok(Reply::new(
            chat_id,
            format!(
                "Total spend for this chat: ${}",
                total.to_fixed(SPEND_PLACES)
            ),
        ))
    }
}
