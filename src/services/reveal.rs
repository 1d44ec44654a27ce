//! Author disclosure.

use crate::domain::{
    Link, LinkRepository, Message, MessageRepository, ServiceError, User, UserRepository,
};

/// Result of a successful reveal.
#[derive(Debug, Clone)]
pub struct RevealedAuthor {
    /// `None` when the message was sent without a known sender.
    pub sender: Option<User>,
    pub message: Message,
    pub link: Link,
}

/// Discloses the author of a message when the author allowed it.
pub struct RevealAuthorService<'a> {
    messages: &'a dyn MessageRepository,
    users: &'a dyn UserRepository,
    links: &'a dyn LinkRepository,
}

impl<'a> RevealAuthorService<'a> {
    pub fn new(
        messages: &'a dyn MessageRepository,
        users: &'a dyn UserRepository,
        links: &'a dyn LinkRepository,
    ) -> Self {
        Self {
            messages,
            users,
            links,
        }
    }

    pub async fn execute(&self, message_id: i64) -> Result<RevealedAuthor, ServiceError> {
        let message = self
            .messages
            .get_by_id(message_id)
            .await?
            .ok_or(ServiceError::MessageNotFound)?;

        if !message.is_reveal_allowed {
            return Err(ServiceError::RevealForbidden);
        }

        let sender = match message.sender_user_id {
            Some(sender_id) => self.users.get_by_id(sender_id).await?,
            None => None,
        };

        let link = self
            .links
            .get_by_id(message.link_id)
            .await?
            .ok_or(ServiceError::LinkNotFound)?;

        self.messages.mark_revealed(message.id).await?;
        Ok(RevealedAuthor {
            sender,
            message,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TelegramProfile;
    use crate::storage::memory::MemoryStore;

    async fn setup(store: &MemoryStore, sender: Option<i64>, allowed: bool) -> Message {
        let link = LinkRepository::create(store, 1, "abc", "L1", None)
            .await
            .unwrap();
        MessageRepository::create(store, link.id, link.owner_user_id, sender, "hi", allowed)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reveal_author_allowed() {
        let store = MemoryStore::new();
        let sender = store
            .upsert_from_telegram(&TelegramProfile {
                telegram_user_id: 123,
                username: Some("u".to_owned()),
                first_name: None,
                last_name: None,
                language: None,
            })
            .await
            .unwrap();
        let message = setup(&store, Some(sender.id), true).await;

        let result = RevealAuthorService::new(&store, &store, &store)
            .execute(message.id)
            .await
            .unwrap();

        assert_eq!(result.sender.map(|u| u.id), Some(sender.id));
        let stored = MessageRepository::get_by_id(&store, message.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_revealed);
    }

    #[tokio::test]
    async fn test_reveal_author_forbidden() {
        let store = MemoryStore::new();
        let message = setup(&store, None, false).await;

        let result = RevealAuthorService::new(&store, &store, &store)
            .execute(message.id)
            .await;

        assert!(matches!(result, Err(ServiceError::RevealForbidden)));
    }

    #[tokio::test]
    async fn test_reveal_anonymous_sender() {
        let store = MemoryStore::new();
        let message = setup(&store, None, true).await;

        let result = RevealAuthorService::new(&store, &store, &store)
            .execute(message.id)
            .await
            .unwrap();

        assert!(result.sender.is_none());
    }

    #[tokio::test]
    async fn test_reveal_missing_message() {
        let store = MemoryStore::new();
        let result = RevealAuthorService::new(&store, &store, &store)
            .execute(999)
            .await;
        assert!(matches!(result, Err(ServiceError::MessageNotFound)));
    }
}
