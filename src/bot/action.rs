//! Transport-neutral updates and the actions produced for them.

use crate::domain::TelegramProfile;

/// An update relevant to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Message(IncomingMessage),
    Callback(IncomingCallback),
}

/// A private message sent to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub from: TelegramProfile,
    /// `None` for stickers, photos and other non-text content.
    pub text: Option<String>,
}

/// A press on an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub query_id: String,
    pub from: TelegramProfile,
    pub data: Option<String>,
    /// Message that carries the pressed button, when still accessible.
    pub origin: Option<MessageRef>,
}

/// Location of a message the bot sent earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Inline button behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Rows of inline buttons.
pub type InlineKeyboard = Vec<Vec<InlineButton>>;

/// Keyboard attached to a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(InlineKeyboard),
    /// One-time reply keyboard of plain text buttons.
    Reply(Vec<Vec<String>>),
    RemoveReply,
}

/// Something the transport must do on behalf of the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Answer in the chat the update came from.
    Send {
        chat_id: i64,
        text: String,
        markup: Option<Markup>,
    },

    /// Replace the text and inline keyboard of an earlier message.
    Edit {
        target: MessageRef,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },

    /// Remove the inline keyboard of an earlier message.
    ClearKeyboard { target: MessageRef },

    /// Answer a callback query. Emitted exactly once per callback.
    AnswerCallback {
        query_id: String,
        text: Option<String>,
        show_alert: bool,
    },

    /// Message to another user. Failures are logged, never surfaced.
    Notify {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
}

impl Action {
    pub fn send(chat_id: i64, text: impl Into<String>) -> Self {
        Self::Send {
            chat_id,
            text: text.into(),
            markup: None,
        }
    }

    pub fn send_with(chat_id: i64, text: impl Into<String>, markup: Markup) -> Self {
        Self::Send {
            chat_id,
            text: text.into(),
            markup: Some(markup),
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Send { .. } => "send",
            Self::Edit { .. } => "edit",
            Self::ClearKeyboard { .. } => "clear_keyboard",
            Self::AnswerCallback { .. } => "answer_callback",
            Self::Notify { .. } => "notify",
        }
    }
}
