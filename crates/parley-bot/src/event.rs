//! Wire types for the line-delimited JSON gateway.
//!
//! Inbound, one [`ChatEvent`] per line:
//!
//! ```json
//! {"chat_id": -100123, "timestamp": "2024-05-10T12:00:00Z", "sender_id": 7,
//!  "sender_name": "alice", "text": "/ask_today what did we decide?"}
//! ```
//!
//! Outbound, one [`Reply`] per line: `{"chat_id": -100123, "text": "..."}`.

use chrono::{DateTime, Utc};
use parley_rs::store::Message;
use serde::{Deserialize, Serialize};

/// A message observed in a chat.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub chat_id: i64,
    pub timestamp: DateTime<Utc>,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// `None` for non-text messages (stickers, photos, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Text of the message this one replies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_text: Option<String>,
}

impl ChatEvent {
    pub fn new(
        chat_id: i64,
        timestamp: DateTime<Utc>,
        sender_id: i64,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            timestamp,
            sender_id,
            sender_name: Some(sender_name.into()),
            text: Some(text.into()),
            reply_to_text: None,
        }
    }

    pub fn with_reply_to(mut self, text: impl Into<String>) -> Self {
        self.reply_to_text = Some(text.into());
        self
    }

    /// The name the sender is logged under; senders without a public name
    /// are logged by id.
    pub fn username(&self) -> String {
        self.sender_name
            .clone()
            .unwrap_or_else(|| self.sender_id.to_string())
    }

    /// This event as a log entry. Missing text is logged as empty.
    pub fn to_message(&self) -> Message {
        Message::new(
            self.chat_id,
            self.timestamp,
            self.sender_id,
            self.username(),
            self.text.clone().unwrap_or_default(),
        )
    }
}

/// Text to send back to a chat.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
}

impl Reply {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }
}
