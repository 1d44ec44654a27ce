//! Sending, listing and replying to anonymous messages.

use tracing::info;

use crate::domain::{
    LinkRepository, Message, MessageQuery, MessageRepository, ServiceError, StoreError, Thread,
    ThreadMessage, ThreadMessageRepository, ThreadRepository, UserStats,
};

/// Input for sending an anonymous message through a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAnonymousMessage {
    pub slug: String,
    pub text: String,
    pub is_reveal_allowed: bool,
    pub sender_user_id: Option<i64>,
}

pub struct SendAnonymousMessageService<'a> {
    links: &'a dyn LinkRepository,
    messages: &'a dyn MessageRepository,
}

impl<'a> SendAnonymousMessageService<'a> {
    pub fn new(links: &'a dyn LinkRepository, messages: &'a dyn MessageRepository) -> Self {
        Self { links, messages }
    }

    /// Stores the message for the owner of the link.
    ///
    /// Fails with [`ServiceError::LinkUnavailable`] when the slug is unknown,
    /// deleted or switched off.
    pub async fn execute(&self, input: &SendAnonymousMessage) -> Result<Message, ServiceError> {
        let link = self
            .links
            .get_by_slug(&input.slug)
            .await?
            .filter(|l| l.is_active)
            .ok_or(ServiceError::LinkUnavailable)?;

        let message = self
            .messages
            .create(
                link.id,
                link.owner_user_id,
                input.sender_user_id,
                &input.text,
                input.is_reveal_allowed,
            )
            .await?;
        info!("Message {} stored for link {}", message.id, link.id);
        Ok(message)
    }
}

pub struct GetUserMessagesService<'a> {
    messages: &'a dyn MessageRepository,
}

impl<'a> GetUserMessagesService<'a> {
    pub fn new(messages: &'a dyn MessageRepository) -> Self {
        Self { messages }
    }

    pub async fn execute(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError> {
        self.messages.list_for_user(query).await
    }
}

/// Thread and reply produced by [`ReplyToMessageService`].
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub thread: Thread,
    pub reply: ThreadMessage,
}

pub struct ReplyToMessageService<'a> {
    messages: &'a dyn MessageRepository,
    threads: &'a dyn ThreadRepository,
    thread_messages: &'a dyn ThreadMessageRepository,
}

impl<'a> ReplyToMessageService<'a> {
    pub fn new(
        messages: &'a dyn MessageRepository,
        threads: &'a dyn ThreadRepository,
        thread_messages: &'a dyn ThreadMessageRepository,
    ) -> Self {
        Self {
            messages,
            threads,
            thread_messages,
        }
    }

    /// Appends a reply to the thread rooted at `message_id` and marks the
    /// root message read.
    ///
    /// The reply is addressed to the sender, or back to the recipient when
    /// the message has no known sender.
    pub async fn execute(
        &self,
        message_id: i64,
        from_user_id: i64,
        text: &str,
    ) -> Result<ReplyOutcome, ServiceError> {
        let message = self
            .messages
            .get_by_id(message_id)
            .await?
            .ok_or(ServiceError::MessageNotFound)?;

        let thread = match self.threads.get_by_root_message(message_id).await? {
            Some(thread) => thread,
            None => self.threads.create(message_id).await?,
        };

        let to_user_id = message.sender_user_id.unwrap_or(message.recipient_user_id);
        let reply = self
            .thread_messages
            .create(thread.id, from_user_id, to_user_id, text)
            .await?;
        self.messages.mark_read(message_id).await?;

        Ok(ReplyOutcome { thread, reply })
    }
}

pub struct GetUserStatsService<'a> {
    messages: &'a dyn MessageRepository,
    links: &'a dyn LinkRepository,
}

impl<'a> GetUserStatsService<'a> {
    pub fn new(messages: &'a dyn MessageRepository, links: &'a dyn LinkRepository) -> Self {
        Self { messages, links }
    }

    pub async fn execute(&self, user_id: i64) -> Result<UserStats, StoreError> {
        let mut stats = self.messages.get_stats(user_id).await?;
        let links = self.links.list_by_owner(user_id).await?;
        stats.total_links = i64::try_from(links.len()).unwrap_or(i64::MAX);
        stats.link_stats = self.messages.get_link_stats(user_id).await?;
        Ok(stats)
    }
}
