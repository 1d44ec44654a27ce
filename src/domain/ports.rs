//! Storage ports.
//!
//! Services depend on these traits only; the PostgreSQL adapters live in
//! [`crate::storage`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{
    CallbackToken, CallbackTokenType, DialogState, Link, LinkStats, Message, MessageStatus,
    StoreError, TelegramProfile, Thread, ThreadMessage, User, UserStats,
};

/// Filters for listing received messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub user_id: i64,
    pub status: Option<MessageStatus>,
    pub link_id: Option<i64>,
    pub from_date: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl MessageQuery {
    /// Query for all messages received by `user_id` with default paging.
    #[must_use]
    pub const fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            status: None,
            link_id: None,
            from_date: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_telegram_id(&self, telegram_user_id: i64) -> Result<Option<User>, StoreError>;

    async fn get_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    /// Creates the user or refreshes its profile fields.
    async fn upsert_from_telegram(&self, profile: &TelegramProfile) -> Result<User, StoreError>;
}

#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn create(
        &self,
        owner_user_id: i64,
        slug: &str,
        label: &str,
        prompt: Option<&str>,
    ) -> Result<Link, StoreError>;

    /// Links of an owner that are not deleted.
    async fn list_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>, StoreError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError>;

    async fn get_by_id(&self, link_id: i64) -> Result<Option<Link>, StoreError>;

    /// Whether any link, deleted or not, already uses `slug`.
    async fn exists_slug(&self, slug: &str) -> Result<bool, StoreError>;

    async fn set_active(&self, link_id: i64, is_active: bool) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(
        &self,
        link_id: i64,
        recipient_user_id: i64,
        sender_user_id: Option<i64>,
        text: &str,
        is_reveal_allowed: bool,
    ) -> Result<Message, StoreError>;

    async fn get_by_id(&self, message_id: i64) -> Result<Option<Message>, StoreError>;

    /// Received messages matching the query, newest first.
    async fn list_for_user(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError>;

    async fn mark_revealed(&self, message_id: i64) -> Result<(), StoreError>;

    async fn mark_read(&self, message_id: i64) -> Result<(), StoreError>;

    /// Message counters for a recipient. `total_links` and `link_stats` are left empty.
    async fn get_stats(&self, user_id: i64) -> Result<UserStats, StoreError>;

    async fn get_link_stats(&self, user_id: i64) -> Result<Vec<LinkStats>, StoreError>;
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn get_by_root_message(&self, message_id: i64) -> Result<Option<Thread>, StoreError>;

    async fn create(&self, root_message_id: i64) -> Result<Thread, StoreError>;
}

#[async_trait]
pub trait ThreadMessageRepository: Send + Sync {
    async fn create(
        &self,
        thread_id: i64,
        from_user_id: i64,
        to_user_id: i64,
        text: &str,
    ) -> Result<ThreadMessage, StoreError>;

    /// Replies of a thread, oldest first.
    async fn list_by_thread(&self, thread_id: i64) -> Result<Vec<ThreadMessage>, StoreError>;
}

#[async_trait]
pub trait CallbackTokenRepository: Send + Sync {
    async fn create(
        &self,
        token: &str,
        kind: CallbackTokenType,
        entity_id: i64,
        extra_data: Option<Value>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CallbackToken, StoreError>;

    async fn get(&self, token: &str) -> Result<Option<CallbackToken>, StoreError>;

    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Deletes tokens that expired before `now`, returning how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Per-user conversation state between updates.
#[async_trait]
pub trait DialogStateStore: Send + Sync {
    /// Loads the state of a user.
    ///
    /// Returns [`StoreError::CorruptDialogState`] when a record exists but
    /// cannot be decoded.
    async fn load(&self, user_id: i64) -> Result<Option<DialogState>, StoreError>;

    async fn save(&self, user_id: i64, state: &DialogState) -> Result<(), StoreError>;

    async fn clear(&self, user_id: i64) -> Result<(), StoreError>;
}

/// Every port at once, for components that drive whole conversations.
pub trait Repositories:
    UserRepository
    + LinkRepository
    + MessageRepository
    + ThreadRepository
    + ThreadMessageRepository
    + CallbackTokenRepository
    + DialogStateStore
{
}

impl<T> Repositories for T where
    T: UserRepository
        + LinkRepository
        + MessageRepository
        + ThreadRepository
        + ThreadMessageRepository
        + CallbackTokenRepository
        + DialogStateStore
{
}
