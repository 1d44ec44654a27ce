//! In-memory storage used by unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::{
    CallbackToken, CallbackTokenRepository, CallbackTokenType, DialogState, DialogStateStore, Link,
    LinkRepository, LinkStats, Message, MessageQuery, MessageRepository, MessageStatus,
    StoreError, TelegramProfile, Thread, ThreadMessage, ThreadMessageRepository, ThreadRepository,
    User, UserRepository, UserStats,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    links: Vec<Link>,
    messages: Vec<Message>,
    threads: Vec<Thread>,
    thread_messages: Vec<ThreadMessage>,
    tokens: Vec<CallbackToken>,
    dialogs: HashMap<i64, (String, Value)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Every repository port backed by vectors behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a link record, e.g. to deactivate or soft-delete it.
    pub async fn put_link(&self, link: Link) {
        let mut tables = self.tables.lock().await;
        tables.links.retain(|l| l.id != link.id);
        tables.links.push(link);
    }

    /// Stores a raw dialog record, bypassing encoding.
    pub async fn put_raw_dialog(&self, user_id: i64, name: &str, data: Value) {
        let mut tables = self.tables.lock().await;
        tables.dialogs.insert(user_id, (name.to_owned(), data));
    }

    pub async fn token_count(&self) -> usize {
        self.tables.lock().await.tokens.len()
    }

    pub async fn all_tokens(&self) -> Vec<CallbackToken> {
        self.tables.lock().await.tokens.clone()
    }

    pub async fn thread_messages(&self) -> Vec<ThreadMessage> {
        self.tables.lock().await.thread_messages.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_telegram_id(&self, telegram_user_id: i64) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.telegram_user_id == telegram_user_id)
            .cloned())
    }

    async fn get_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn upsert_from_telegram(&self, profile: &TelegramProfile) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        if let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.telegram_user_id == profile.telegram_user_id)
        {
            user.username.clone_from(&profile.username);
            user.first_name.clone_from(&profile.first_name);
            user.last_name.clone_from(&profile.last_name);
            user.language.clone_from(&profile.language);
            user.updated_at = now;
            return Ok(user.clone());
        }
        let user = User {
            id: tables.next_id(),
            telegram_user_id: profile.telegram_user_id,
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            language: profile.language.clone(),
            is_blocked: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn create(
        &self,
        owner_user_id: i64,
        slug: &str,
        label: &str,
        prompt: Option<&str>,
    ) -> Result<Link, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let link = Link {
            id: tables.next_id(),
            owner_user_id,
            slug: slug.to_owned(),
            label: label.to_owned(),
            prompt: prompt.map(str::to_owned),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.links.push(link.clone());
        Ok(link)
    }

    async fn list_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.owner_user_id == owner_user_id && l.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.slug == slug && l.deleted_at.is_none())
            .cloned())
    }

    async fn get_by_id(&self, link_id: i64) -> Result<Option<Link>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.id == link_id && l.deleted_at.is_none())
            .cloned())
    }

    async fn exists_slug(&self, slug: &str) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.links.iter().any(|l| l.slug == slug))
    }

    async fn set_active(&self, link_id: i64, is_active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(link) = tables.links.iter_mut().find(|l| l.id == link_id) {
            link.is_active = is_active;
            link.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(
        &self,
        link_id: i64,
        recipient_user_id: i64,
        sender_user_id: Option<i64>,
        text: &str,
        is_reveal_allowed: bool,
    ) -> Result<Message, StoreError> {
        let mut tables = self.tables.lock().await;
        let message = Message {
            id: tables.next_id(),
            link_id,
            recipient_user_id,
            sender_user_id,
            text: text.to_owned(),
            is_reveal_allowed,
            is_revealed: false,
            status: MessageStatus::New,
            is_reported: false,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn get_by_id(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn list_for_user(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.lock().await;
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        // Ids grow with insertion order, so reversing gives newest first.
        Ok(tables
            .messages
            .iter()
            .rev()
            .filter(|m| m.recipient_user_id == query.user_id)
            .filter(|m| query.status.is_none_or(|s| m.status == s))
            .filter(|m| query.link_id.is_none_or(|id| m.link_id == id))
            .filter(|m| query.from_date.is_none_or(|from| m.created_at >= from))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_revealed(&self, message_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(message) = tables.messages.iter_mut().find(|m| m.id == message_id) {
            message.is_revealed = true;
        }
        Ok(())
    }

    async fn mark_read(&self, message_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(message) = tables.messages.iter_mut().find(|m| m.id == message_id) {
            message.status = MessageStatus::Read;
            message.read_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn get_stats(&self, user_id: i64) -> Result<UserStats, StoreError> {
        let tables = self.tables.lock().await;
        let received = || {
            tables
                .messages
                .iter()
                .filter(move |m| m.recipient_user_id == user_id)
        };
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(UserStats {
            total_messages: count(received().count()),
            total_replies: count(
                tables
                    .thread_messages
                    .iter()
                    .filter(|t| t.from_user_id == user_id)
                    .count(),
            ),
            total_revealed: count(received().filter(|m| m.is_revealed).count()),
            total_reported: count(received().filter(|m| m.is_reported).count()),
            total_links: 0,
            link_stats: Vec::new(),
        })
    }

    async fn get_link_stats(&self, user_id: i64) -> Result<Vec<LinkStats>, StoreError> {
        let tables = self.tables.lock().await;
        let mut stats = Vec::new();
        for link in tables.links.iter().filter(|l| l.owner_user_id == user_id) {
            let messages: Vec<&Message> =
                tables.messages.iter().filter(|m| m.link_id == link.id).collect();
            if messages.is_empty() {
                continue;
            }
            let mut senders: Vec<i64> = messages.iter().filter_map(|m| m.sender_user_id).collect();
            senders.sort_unstable();
            senders.dedup();
            stats.push(LinkStats {
                link_id: link.id,
                label: link.label.clone(),
                messages_count: i64::try_from(messages.len()).unwrap_or(i64::MAX),
                unique_senders: i64::try_from(senders.len()).unwrap_or(i64::MAX),
            });
        }
        Ok(stats)
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn get_by_root_message(&self, message_id: i64) -> Result<Option<Thread>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .threads
            .iter()
            .find(|t| t.root_message_id == message_id)
            .cloned())
    }

    async fn create(&self, root_message_id: i64) -> Result<Thread, StoreError> {
        let mut tables = self.tables.lock().await;
        let thread = Thread {
            id: tables.next_id(),
            root_message_id,
            created_at: Utc::now(),
            closed_at: None,
        };
        tables.threads.push(thread.clone());
        Ok(thread)
    }
}

#[async_trait]
impl ThreadMessageRepository for MemoryStore {
    async fn create(
        &self,
        thread_id: i64,
        from_user_id: i64,
        to_user_id: i64,
        text: &str,
    ) -> Result<ThreadMessage, StoreError> {
        let mut tables = self.tables.lock().await;
        let reply = ThreadMessage {
            id: tables.next_id(),
            thread_id,
            from_user_id,
            to_user_id,
            text: text.to_owned(),
            created_at: Utc::now(),
            read_at: None,
        };
        tables.thread_messages.push(reply.clone());
        Ok(reply)
    }

    async fn list_by_thread(&self, thread_id: i64) -> Result<Vec<ThreadMessage>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .thread_messages
            .iter()
            .filter(|t| t.thread_id == thread_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CallbackTokenRepository for MemoryStore {
    async fn create(
        &self,
        token: &str,
        kind: CallbackTokenType,
        entity_id: i64,
        extra_data: Option<Value>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CallbackToken, StoreError> {
        let mut tables = self.tables.lock().await;
        let record = CallbackToken {
            id: tables.next_id(),
            token: token.to_owned(),
            kind,
            entity_id,
            extra_data,
            expires_at,
            created_at: Utc::now(),
        };
        tables.tokens.push(record.clone());
        Ok(record)
    }

    async fn get(&self, token: &str) -> Result<Option<CallbackToken>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.tokens.retain(|t| t.token != token);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|t| !t.is_expired(now));
        Ok(u64::try_from(before - tables.tokens.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl DialogStateStore for MemoryStore {
    async fn load(&self, user_id: i64) -> Result<Option<DialogState>, StoreError> {
        let tables = self.tables.lock().await;
        tables
            .dialogs
            .get(&user_id)
            .map(|(name, data)| DialogState::from_record(user_id, name, Some(data.clone())))
            .transpose()
    }

    async fn save(&self, user_id: i64, state: &DialogState) -> Result<(), StoreError> {
        let data = state.to_data()?;
        let mut tables = self.tables.lock().await;
        tables.dialogs.insert(user_id, (state.name().to_owned(), data));
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), StoreError> {
        self.tables.lock().await.dialogs.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(telegram_user_id: i64, username: &str) -> TelegramProfile {
        TelegramProfile {
            telegram_user_id,
            username: Some(username.to_owned()),
            first_name: None,
            last_name: None,
            language: Some("ru".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity() {
        let store = MemoryStore::new();
        let first = store.upsert_from_telegram(&profile(10, "old")).await.unwrap();
        let second = store.upsert_from_telegram(&profile(10, "new")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.username.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_deleted_links_hidden_but_slug_taken() {
        let store = MemoryStore::new();
        let link = LinkRepository::create(&store, 1, "abc", "Friends", None)
            .await
            .unwrap();
        store
            .put_link(Link {
                deleted_at: Some(Utc::now()),
                ..link.clone()
            })
            .await;

        assert!(store.get_by_slug("abc").await.unwrap().is_none());
        assert!(LinkRepository::get_by_id(&store, link.id).await.unwrap().is_none());
        assert!(store.list_by_owner(1).await.unwrap().is_empty());
        assert!(store.exists_slug("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filters() {
        let store = MemoryStore::new();
        let first = MessageRepository::create(&store, 7, 1, None, "one", false)
            .await
            .unwrap();
        let second = MessageRepository::create(&store, 8, 1, Some(2), "two", true)
            .await
            .unwrap();
        MessageRepository::create(&store, 7, 3, None, "other user", false)
            .await
            .unwrap();
        store.mark_read(first.id).await.unwrap();

        let all = store.list_for_user(&MessageQuery::for_user(1)).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let read = store
            .list_for_user(&MessageQuery {
                status: Some(MessageStatus::Read),
                ..MessageQuery::for_user(1)
            })
            .await
            .unwrap();
        assert_eq!(read.len(), 1);
        assert!(read[0].read_at.is_some());

        let by_link = store
            .list_for_user(&MessageQuery {
                link_id: Some(8),
                ..MessageQuery::for_user(1)
            })
            .await
            .unwrap();
        assert_eq!(by_link[0].id, second.id);

        let paged = store
            .list_for_user(&MessageQuery {
                limit: 1,
                offset: 1,
                ..MessageQuery::for_user(1)
            })
            .await
            .unwrap();
        assert_eq!(paged[0].id, first.id);
    }

    #[tokio::test]
    async fn test_dialog_state_roundtrip_and_clear() {
        let store = MemoryStore::new();
        let state = DialogState::AwaitReplyText {
            reply_to_message_id: 42,
        };
        store.save(5, &state).await.unwrap();
        assert_eq!(store.load(5).await.unwrap(), Some(state));

        store.clear(5).await.unwrap();
        assert_eq!(store.load(5).await.unwrap(), None);
    }
}
