//! Domain model for anonymous valentines.
//!
//! Entities mirror the persisted records, ports describe what the
//! services need from storage.

mod dialog;
mod entities;
mod errors;
mod ports;
mod types;

pub use dialog::DialogState;
pub use entities::{
    CallbackToken, Link, LinkStats, Message, TelegramProfile, Thread, ThreadMessage, User,
    UserStats,
};
pub use errors::{ServiceError, StoreError};
pub use ports::{
    CallbackTokenRepository, DialogStateStore, LinkRepository, MessageQuery, MessageRepository,
    Repositories, ThreadMessageRepository, ThreadRepository, UserRepository,
};
pub use types::{CallbackTokenType, MessageStatus, ParseEnumError};

/// Maximum length of an anonymous message or reply, in characters.
pub const MAX_TEXT_LENGTH: usize = 2000;
