//! Word-budgeted context windows over a chat's message history.
//!
//! [`ContextWindowBuilder`] turns the messages of a chat since a start
//! instant into compact lines `"<username> <day_offset>: <text>"`, keeping
//! the most recent messages that fit in `max_context_words` words and
//! restoring chronological order. `day_offset` is the day-of-month
//! difference to the oldest retrieved message: a cheap relative label, not a
//! calendar-aware duration, so it can go negative across a month boundary.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use tracing::{debug, warn};

use super::prompt::PromptTemplates;
use crate::store::{Message, MessageStore};

/// Default word budget for the rendered context.
pub const DEFAULT_MAX_CONTEXT_WORDS: usize = 10_000;

/// Default number of messages retrieved before budgeting.
pub const DEFAULT_MAX_HISTORY_DEPTH: usize = 1_000;

/// A prompt fragment built from recent chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Name of the user asking the question.
    pub username: String,
    pub question: String,
    /// Messages retrieved from the store before the word budget was applied.
    pub retrieved: usize,
    /// Rendered context lines, oldest first.
    pub lines: Vec<String>,
    /// Words of message text included in `lines`.
    pub words: usize,
}

impl ContextWindow {
    /// A window without history.
    pub fn empty(username: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            question: question.into(),
            retrieved: 0,
            lines: Vec::new(),
            words: 0,
        }
    }

    /// Whether no history was retrieved at all.
    pub fn is_empty(&self) -> bool {
        self.retrieved == 0
    }

    /// Final prompt text. Without retrieved history this is the minimal
    /// one-line form.
    pub fn render(&self, templates: &PromptTemplates) -> String {
        if self.is_empty() {
            templates.render_minimal(&self.username, &self.question)
        } else {
            templates.render_full(&self.username, &self.question, &self.lines)
        }
    }
}

/// Builds [`ContextWindow`]s from a [`MessageStore`].
///
/// Never fails: a storage error is logged and the window degrades to empty,
/// which renders as the minimal prompt.
///
/// # Example
///
/// ```ignore
/// let builder = ContextWindowBuilder::default()
///     .with_max_context_words(2_000)
///     .with_utc_offset(FixedOffset::east_opt(3 * 3600).unwrap());
///
/// let window = builder.build(&store, chat_id, "alice", "what did I miss?", start, Utc::now());
/// let prompt = window.render(builder.templates());
/// ```
#[derive(Debug, Clone)]
pub struct ContextWindowBuilder {
    max_context_words: usize,
    max_history_depth: usize,
    utc_offset: FixedOffset,
    templates: PromptTemplates,
}

impl Default for ContextWindowBuilder {
    fn default() -> Self {
        Self {
            max_context_words: DEFAULT_MAX_CONTEXT_WORDS,
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
            utc_offset: utc(),
            templates: PromptTemplates::default(),
        }
    }
}

impl ContextWindowBuilder {
    pub fn with_max_context_words(mut self, words: usize) -> Self {
        self.max_context_words = words;
        self
    }

    pub fn with_max_history_depth(mut self, depth: usize) -> Self {
        self.max_history_depth = depth;
        self
    }

    /// Offset used for calendar dates: the same-day shortcut and day labels.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn max_context_words(&self) -> usize {
        self.max_context_words
    }

    pub fn max_history_depth(&self) -> usize {
        self.max_history_depth
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Build the window for a question asked at `now` with history from
    /// `context_start`.
    ///
    /// When `context_start` falls on the same calendar day as `now` the
    /// store is not consulted at all.
    pub fn build(
        &self,
        store: &MessageStore,
        chat_id: i64,
        username: &str,
        question: &str,
        context_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ContextWindow {
        if same_calendar_day(context_start, now, self.utc_offset) {
            debug!("Context starts today; skipping history for chat {chat_id}");
            return ContextWindow::empty(username, question);
        }

        match store.query(chat_id, context_start, now, self.max_history_depth) {
            Ok(messages) => self.fold(username, question, &messages),
            Err(e) => {
                warn!("History lookup failed for chat {chat_id}: {e}. Continuing without context.");
                ContextWindow::empty(username, question)
            }
        }
    }

    /// Build and render in one step.
    pub fn render_prompt(
        &self,
        store: &MessageStore,
        chat_id: i64,
        username: &str,
        question: &str,
        context_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> String {
        self.build(store, chat_id, username, question, context_start, now)
            .render(&self.templates)
    }

    /// Apply the word budget to `messages` (oldest first).
    ///
    /// Walks from the newest message backward, stopping at the first message
    /// that would push the running word count past the budget; that message
    /// and everything older are left out.
    pub fn fold(&self, username: &str, question: &str, messages: &[Message]) -> ContextWindow {
        let mut window = ContextWindow::empty(username, question);
        window.retrieved = messages.len();
        let Some(oldest) = messages.first() else {
            return window;
        };
        let start_day = i64::from(oldest.timestamp.with_timezone(&self.utc_offset).day());

        for msg in messages.iter().rev() {
            let words = window.words + msg.word_count();
            if words > self.max_context_words {
                break;
            }
            window.words = words;
            let day = i64::from(msg.timestamp.with_timezone(&self.utc_offset).day());
            window
                .lines
                .push(format!("{} {}: {}", msg.username, day - start_day, msg.text));
        }
        window.lines.reverse();

        debug!(
            "Context window: {} of {} message(s), {} word(s) (budget {})",
            window.lines.len(),
            window.retrieved,
            window.words,
            self.max_context_words
        );
        window
    }
}

/// Whether two instants fall on the same calendar date at `offset`.
pub fn same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    a.with_timezone(&offset).date_naive() == b.with_timezone(&offset).date_naive()
}

fn utc() -> FixedOffset {
    Utc.fix()
}
