//! Conversation logic of the bot, independent of the Telegram transport.
//!
//! The transport turns updates into [`Incoming`] values, hands them to
//! [`BotHandler`] and performs the returned [`Action`]s.

mod action;
mod command;
mod handler;

pub use action::{
    Action, ButtonAction, Incoming, IncomingCallback, IncomingMessage, InlineButton,
    InlineKeyboard, Markup, MessageRef,
};
pub use command::{BotCommand, MessageFilters, deeplink, parse_period};
pub use handler::{BotHandler, PAGE_SIZE};
