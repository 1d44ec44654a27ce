//! Conversation states persisted between updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StoreError;

/// What the bot expects next from a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogState {
    /// Opened a link, must choose whether the author may be revealed.
    AwaitRevealChoice { pending_link_slug: String },

    /// Must type the anonymous message.
    AwaitMessageText {
        pending_link_slug: String,
        pending_reveal_allowed: bool,
    },

    /// Must type a reply to a received message.
    AwaitReplyText { reply_to_message_id: i64 },

    /// Creating a link: must type its label.
    AwaitLinkLabel,

    /// Creating a link: must type its prompt or `-`.
    AwaitLinkPrompt { label: String },
}

impl DialogState {
    /// Name stored in the `state` column.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AwaitRevealChoice { .. } => "await_reveal_choice",
            Self::AwaitMessageText { .. } => "await_message_text",
            Self::AwaitReplyText { .. } => "await_reply_text",
            Self::AwaitLinkLabel => "await_link_label",
            Self::AwaitLinkPrompt { .. } => "await_link_prompt",
        }
    }

    /// Encodes the state as a JSON document for storage.
    pub fn to_data(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a stored record.
    ///
    /// The stored name wins over any tag in `data`, so records written with
    /// only the payload fields still decode.
    pub fn from_record(user_id: i64, name: &str, data: Option<Value>) -> Result<Self, StoreError> {
        let mut data = match data {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => serde_json::Map::new(),
            Some(other) => {
                return Err(StoreError::CorruptDialogState {
                    user_id,
                    reason: format!("expected an object, got {other}"),
                });
            }
        };
        data.insert("state".to_owned(), Value::String(name.to_owned()));
        serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::CorruptDialogState {
            user_id,
            reason: e.to_string(),
        })
    }
}
