//! Chat messages on top of [`RecordLog`].
//!
//! Each chat owns partition `chat_<chat_id>` with lines
//! `epoch_seconds,user_id,username,text`. Newlines in `text` are written as
//! the two characters `\n` and are deliberately **not** restored on read:
//! the stored (escaped) text is what queries return, which keeps every
//! message on a single line when rendered into a prompt.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::log::{Record, RecordLog, TimeWindow, parse_epoch_seconds};

/// A chat message as logged and returned by queries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub chat_id: i64,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub text: String,
}

impl Message {
    pub fn new(
        chat_id: i64,
        timestamp: DateTime<Utc>,
        user_id: i64,
        username: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            timestamp,
            user_id,
            username: username.into(),
            text: text.into(),
        }
    }

    /// Number of whitespace-delimited words in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// On-disk shape of a message line; the chat id lives in the partition name.
struct MessageRecord {
    timestamp: DateTime<Utc>,
    user_id: i64,
    username: String,
    text: String,
}

impl Record for MessageRecord {
    const FIELD_COUNT: usize = 4;

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.timestamp().to_string(),
            self.user_id.to_string(),
            self.username.clone(),
            self.text.clone(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        let user_id = fields[1]
            .parse()
            .map_err(|e| format!("bad user id '{}': {e}", fields[1]))?;
        Ok(Self {
            timestamp: parse_epoch_seconds(fields[0])?,
            user_id,
            username: fields[2].to_string(),
            text: fields[3].to_string(),
        })
    }
}

/// Replace literal newlines with the two-character escape `\n`.
pub fn escape_text(text: &str) -> String {
    text.replace('\n', "\\n")
}

/// Make a display name safe for the username field.
///
/// Commas would shift the field boundaries and line breaks would split the
/// record, so both become `_`.
pub fn normalize_username(username: &str) -> String {
    username.replace([',', '\n', '\r'], "_")
}

/// Partition key holding a chat's messages.
pub fn message_partition(chat_id: i64) -> String {
    format!("chat_{chat_id}")
}

/// Typed message log over a shared [`RecordLog`].
#[derive(Debug, Clone)]
pub struct MessageStore {
    log: Arc<RecordLog>,
}

impl MessageStore {
    pub fn new(log: Arc<RecordLog>) -> Self {
        Self { log }
    }

    /// Append a message to its chat's partition.
    ///
    /// Callers must save messages of one chat in non-decreasing timestamp
    /// order; see [`RecordLog`] for why.
    pub fn save(&self, message: &Message) -> Result<(), StoreError> {
        let record = MessageRecord {
            timestamp: message.timestamp,
            user_id: message.user_id,
            username: normalize_username(&message.username),
            text: escape_text(&message.text),
        };
        self.log
            .append_record(&message_partition(message.chat_id), &record)
    }

    /// Messages of `chat_id` with `start <= timestamp <= end`, oldest first,
    /// limited to the `limit` most recent of them.
    pub fn query(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let records: Vec<MessageRecord> = self.log.scan_backward(
            &message_partition(chat_id),
            TimeWindow::new(start, end),
            limit,
        )?;
        Ok(records
            .into_iter()
            .map(|r| Message {
                chat_id,
                timestamp: r.timestamp,
                user_id: r.user_id,
                username: r.username,
                text: r.text,
            })
            .collect())
    }
}
