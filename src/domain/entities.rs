//! Domain entities.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{CallbackTokenType, MessageStatus};

/// A Telegram account known to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the name shown when the author of a message is revealed.
    ///
    /// Prefers the username, then the full name. `None` when neither is set.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return Some(username.to_owned());
        }
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_owned())
    }
}

/// Profile fields reported by Telegram with every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramProfile {
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
}

/// A personal link through which anonymous messages are received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub owner_user_id: i64,
    pub slug: String,
    pub label: String,
    pub prompt: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// An anonymous message received through a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub link_id: i64,
    pub recipient_user_id: i64,
    pub sender_user_id: Option<i64>,
    pub text: String,
    pub is_reveal_allowed: bool,
    pub is_revealed: bool,
    pub status: MessageStatus,
    pub is_reported: bool,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Conversation rooted at an anonymous message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: i64,
    pub root_message_id: i64,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// A reply inside a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: i64,
    pub thread_id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Opaque value stored in inline button callback data.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackToken {
    pub id: i64,
    pub token: String,
    pub kind: CallbackTokenType,
    pub entity_id: i64,
    pub extra_data: Option<Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CallbackToken {
    /// Whether the token expired before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Aggregated counters for a link owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total_messages: i64,
    pub total_replies: i64,
    pub total_revealed: i64,
    pub total_reported: i64,
    pub total_links: i64,
    pub link_stats: Vec<LinkStats>,
}

/// Per-link counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStats {
    pub link_id: i64,
    pub label: String,
    pub messages_count: i64,
    pub unique_senders: i64,
}
