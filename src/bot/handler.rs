//! Conversation handler.
//!
//! Turns one [`Incoming`] update into the [`Action`]s the transport must
//! perform. All state lives in storage, so a handler can serve any number
//! of updates concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use super::action::{
    Action, Incoming, IncomingCallback, IncomingMessage, InlineButton, InlineKeyboard, Markup,
    MessageRef,
};
use super::command::{BotCommand, MessageFilters, deeplink};
use crate::domain::{
    CallbackToken, CallbackTokenType, DialogState, LinkRepository, MAX_TEXT_LENGTH, MessageQuery,
    MessageRepository, MessageStatus, Repositories, ServiceError, StoreError, User,
    UserRepository,
};
use crate::i18n::{Lang, Text, resolve_lang};
use crate::services::{
    CallbackTokenService, CreateLink, CreateLinkService, DEFAULT_TOKEN_TTL,
    GetUserMessagesService, GetUserStatsService, ListLinksService, ReplyToMessageService,
    RevealAuthorService, SendAnonymousMessage, SendAnonymousMessageService, UpsertUserService,
};

/// Messages listed per page.
pub const PAGE_SIZE: i64 = 5;

/// Characters of a message shown in list lines.
const LIST_PREVIEW_CHARS: usize = 80;

/// Characters of a message shown in notifications.
const NOTIFY_PREVIEW_CHARS: usize = 200;

/// Lifetime of the "open" button attached to a new message notification.
const NOTIFICATION_TOKEN_TTL: Duration = Duration::from_secs(86_400);

/// Lifetime of paging and link creation buttons.
const NAVIGATION_TOKEN_TTL: Duration = Duration::from_secs(1800);

/// Cursor stored in PAGINATE tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct PageCursor {
    status: Option<MessageStatus>,
    link_slug: Option<String>,
    from_ts: Option<DateTime<Utc>>,
    limit: i64,
    offset: i64,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            status: None,
            link_slug: None,
            from_ts: None,
            limit: PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageCursor {
    fn first(filters: MessageFilters) -> Self {
        Self {
            status: filters.status,
            link_slug: filters.link_slug,
            from_ts: filters.from_date,
            ..Self::default()
        }
    }

    fn at(&self, offset: i64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

/// Where a rendered screen goes.
#[derive(Debug, Clone, Copy)]
enum Place {
    /// A new message in a chat.
    Chat(i64),
    /// In place of an earlier message.
    Message(MessageRef),
}

impl Place {
    const fn chat_id(self) -> i64 {
        match self {
            Self::Chat(chat_id) => chat_id,
            Self::Message(target) => target.chat_id,
        }
    }

    fn render(self, text: String, keyboard: Option<InlineKeyboard>) -> Action {
        match self {
            Self::Chat(chat_id) => Action::Send {
                chat_id,
                text,
                markup: keyboard.map(Markup::Inline),
            },
            Self::Message(target) => Action::Edit {
                target,
                text,
                keyboard,
            },
        }
    }
}

/// How a callback query is answered.
#[derive(Debug, Clone, Default)]
struct Answer {
    text: Option<String>,
    show_alert: bool,
}

impl Answer {
    fn alert(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            show_alert: true,
        }
    }

    fn toast(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            show_alert: false,
        }
    }
}

/// Outcome of a callback: its answer and the follow-up actions.
struct CallbackReply {
    answer: Answer,
    actions: Vec<Action>,
}

impl CallbackReply {
    fn alert(text: &str) -> Self {
        Self {
            answer: Answer::alert(text),
            actions: Vec::new(),
        }
    }

    fn silent(actions: Vec<Action>) -> Self {
        Self {
            answer: Answer::default(),
            actions,
        }
    }
}

/// Handles bot updates on top of the storage ports.
pub struct BotHandler<S> {
    store: Arc<S>,
    bot_username: String,
}

impl<S: Repositories> BotHandler<S> {
    /// Creates a handler building deep links for `bot_username`.
    pub fn new(store: Arc<S>, bot_username: impl Into<String>) -> Self {
        Self {
            store,
            bot_username: bot_username.into(),
        }
    }

    /// Processes one update.
    ///
    /// Storage failures are logged and answered with a generic apology. A
    /// callback always yields exactly one [`Action::AnswerCallback`], placed
    /// first.
    pub async fn handle(&self, incoming: &Incoming) -> Vec<Action> {
        match incoming {
            Incoming::Message(message) => self.on_message(message).await,
            Incoming::Callback(callback) => self.on_callback(callback).await,
        }
    }

    async fn on_message(&self, message: &IncomingMessage) -> Vec<Action> {
        let lang = resolve_lang(message.from.language.as_deref());
        match self.dispatch_message(message, lang).await {
            Ok(actions) => actions,
            Err(e) => {
                error!(
                    "Failed to handle message from {}: {}",
                    message.from.telegram_user_id, e
                );
                vec![Action::send(message.chat_id, lang.text(Text::InternalError))]
            }
        }
    }

    async fn on_callback(&self, callback: &IncomingCallback) -> Vec<Action> {
        let lang = resolve_lang(callback.from.language.as_deref());
        let reply = match self.dispatch_callback(callback, lang).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "Failed to handle callback from {}: {}",
                    callback.from.telegram_user_id, e
                );
                CallbackReply::alert(lang.text(Text::InternalError))
            }
        };

        let mut actions = Vec::with_capacity(reply.actions.len() + 1);
        actions.push(Action::AnswerCallback {
            query_id: callback.query_id.clone(),
            text: reply.answer.text,
            show_alert: reply.answer.show_alert,
        });
        actions.extend(reply.actions);
        actions
    }

    async fn dispatch_message(
        &self,
        message: &IncomingMessage,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let chat_id = message.chat_id;
        let Some(text) = message.text.as_deref() else {
            return Ok(vec![Action::send(chat_id, lang.text(Text::TextOnly))]);
        };

        if let Some(command) = BotCommand::parse(text, Utc::now()) {
            debug!("Handling command: {}", command);
            return self.execute(command, message, lang).await;
        }
        if text.trim_start().starts_with('/') {
            debug!("Ignoring unknown command: {}", text);
            return Ok(Vec::new());
        }

        self.handle_text(message, text, lang).await
    }

    async fn execute(
        &self,
        command: BotCommand,
        message: &IncomingMessage,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let chat_id = message.chat_id;
        match command {
            BotCommand::Start => {
                let user = UpsertUserService::new(&*self.store)
                    .execute(&message.from)
                    .await?;
                self.store.clear(user.id).await?;
                Ok(vec![Action::send(chat_id, lang.text(Text::GreetingMenu))])
            }
            BotCommand::Help => Ok(vec![Action::send(chat_id, lang.text(Text::GreetingMenu))]),
            BotCommand::StartWithLink(slug) => self.start_with_link(message, &slug, lang).await,
            BotCommand::Messages(filters) => {
                let Some(user) = self.known_user(message.from.telegram_user_id).await? else {
                    return Ok(vec![Action::send(chat_id, lang.text(Text::UserNotFound))]);
                };
                let cursor = PageCursor::first(filters);
                let action = self
                    .render_messages_page(&user, &cursor, lang, Place::Chat(chat_id))
                    .await?;
                Ok(vec![action])
            }
            BotCommand::Links => {
                let Some(user) = self.known_user(message.from.telegram_user_id).await? else {
                    return Ok(vec![Action::send(chat_id, lang.text(Text::UserNotFound))]);
                };
                let action = self.render_links(&user, lang, Place::Chat(chat_id)).await?;
                Ok(vec![action])
            }
            BotCommand::Stats => {
                let Some(user) = self.known_user(message.from.telegram_user_id).await? else {
                    return Ok(vec![Action::send(chat_id, lang.text(Text::UserNotFound))]);
                };
                let stats = GetUserStatsService::new(&*self.store, &*self.store)
                    .execute(user.id)
                    .await?;
                Ok(vec![Action::send(chat_id, lang.stats(&stats))])
            }
        }
    }

    async fn known_user(&self, telegram_user_id: i64) -> Result<Option<User>, StoreError> {
        self.store.get_by_telegram_id(telegram_user_id).await
    }

    async fn start_with_link(
        &self,
        message: &IncomingMessage,
        slug: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let chat_id = message.chat_id;
        let user = UpsertUserService::new(&*self.store)
            .execute(&message.from)
            .await?;

        let Some(link) = self
            .store
            .get_by_slug(slug)
            .await?
            .filter(|l| l.is_active)
        else {
            return Ok(vec![Action::send(chat_id, lang.text(Text::InvalidLink))]);
        };

        self.store
            .save(
                user.id,
                &DialogState::AwaitRevealChoice {
                    pending_link_slug: link.slug.clone(),
                },
            )
            .await?;

        let mut lines = vec![lang.text(Text::SendPrompt).to_owned()];
        if let Some(prompt) = link.prompt.as_deref().filter(|p| !p.is_empty()) {
            lines.push(lang.link_prompt(prompt));
        }
        lines.push(lang.text(Text::RevealChoice).to_owned());

        Ok(vec![Action::send_with(
            chat_id,
            lines.join("\n"),
            reveal_keyboard(lang),
        )])
    }

    async fn handle_text(
        &self,
        message: &IncomingMessage,
        text: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let chat_id = message.chat_id;
        let user = UpsertUserService::new(&*self.store)
            .execute(&message.from)
            .await?;

        let state = match self.store.load(user.id).await {
            Ok(state) => state,
            Err(StoreError::CorruptDialogState { user_id, reason }) => {
                warn!("Dropping corrupt dialog state of user {}: {}", user_id, reason);
                self.store.clear(user.id).await?;
                return Ok(vec![Action::send(chat_id, lang.text(Text::SessionExpired))]);
            }
            Err(e) => return Err(e.into()),
        };

        match state {
            None => Ok(vec![Action::send(chat_id, lang.text(Text::SendPrompt))]),
            Some(DialogState::AwaitRevealChoice { pending_link_slug }) => {
                self.on_reveal_choice(&user, chat_id, pending_link_slug, text, lang)
                    .await
            }
            Some(DialogState::AwaitMessageText {
                pending_link_slug,
                pending_reveal_allowed,
            }) => {
                self.on_message_text(
                    &user,
                    chat_id,
                    pending_link_slug,
                    pending_reveal_allowed,
                    text,
                    lang,
                )
                .await
            }
            Some(DialogState::AwaitReplyText {
                reply_to_message_id,
            }) => {
                self.on_reply_text(&user, chat_id, reply_to_message_id, text, lang)
                    .await
            }
            Some(DialogState::AwaitLinkLabel) => {
                let label = text.trim();
                if label.is_empty() {
                    return Ok(vec![Action::send(chat_id, lang.text(Text::EnterLinkLabel))]);
                }
                self.store
                    .save(
                        user.id,
                        &DialogState::AwaitLinkPrompt {
                            label: label.to_owned(),
                        },
                    )
                    .await?;
                Ok(vec![Action::send(chat_id, lang.text(Text::EnterLinkPrompt))])
            }
            Some(DialogState::AwaitLinkPrompt { label }) => {
                self.on_link_prompt(&user, chat_id, label, text, lang).await
            }
        }
    }

    async fn on_reveal_choice(
        &self,
        user: &User,
        chat_id: i64,
        pending_link_slug: String,
        text: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let pending_reveal_allowed = if Text::ButtonRevealAllow.matches(text) {
            true
        } else if Text::ButtonRevealDeny.matches(text) {
            false
        } else {
            return Ok(vec![Action::send_with(
                chat_id,
                lang.text(Text::ChooseOption),
                reveal_keyboard(lang),
            )]);
        };

        self.store
            .save(
                user.id,
                &DialogState::AwaitMessageText {
                    pending_link_slug,
                    pending_reveal_allowed,
                },
            )
            .await?;
        Ok(vec![Action::send_with(
            chat_id,
            lang.text(Text::EnterText),
            Markup::RemoveReply,
        )])
    }

    async fn on_message_text(
        &self,
        user: &User,
        chat_id: i64,
        slug: String,
        is_reveal_allowed: bool,
        text: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        if !is_valid_length(text) {
            return Ok(vec![Action::send(chat_id, lang.text(Text::MessageLength))]);
        }

        let sent = SendAnonymousMessageService::new(&*self.store, &*self.store)
            .execute(&SendAnonymousMessage {
                slug,
                text: text.to_owned(),
                is_reveal_allowed,
                sender_user_id: Some(user.id),
            })
            .await;
        let message = match sent {
            Ok(message) => message,
            Err(ServiceError::LinkUnavailable) => {
                self.store.clear(user.id).await?;
                return Ok(vec![Action::send(chat_id, lang.text(Text::InvalidLink))]);
            }
            Err(e) => return Err(e),
        };

        let link = LinkRepository::get_by_id(&*self.store, message.link_id).await?;
        let recipient = UserRepository::get_by_id(&*self.store, message.recipient_user_id).await?;
        let open_token = CallbackTokenService::new(&*self.store)
            .create_token(
                CallbackTokenType::OpenMessage,
                message.id,
                None,
                NOTIFICATION_TOKEN_TTL,
            )
            .await?;
        self.store.clear(user.id).await?;

        let mut actions = vec![Action::send(chat_id, lang.text(Text::MessageSent))];
        if let Some(recipient) = recipient {
            let recipient_lang = resolve_lang(recipient.language.as_deref());
            let label = link.map(|l| l.label).unwrap_or_default();
            actions.push(Action::Notify {
                chat_id: recipient.telegram_user_id,
                text: recipient_lang.new_valentine(&label, &preview(text, NOTIFY_PREVIEW_CHARS)),
                keyboard: Some(vec![vec![InlineButton::callback(
                    recipient_lang.text(Text::ButtonOpenValentine),
                    open_token.token,
                )]]),
            });
        }
        Ok(actions)
    }

    async fn on_reply_text(
        &self,
        user: &User,
        chat_id: i64,
        message_id: i64,
        text: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        if !is_valid_length(text) {
            return Ok(vec![Action::send(chat_id, lang.text(Text::ReplyLength))]);
        }

        let outcome = match ReplyToMessageService::new(&*self.store, &*self.store, &*self.store)
            .execute(message_id, user.id, text)
            .await
        {
            Ok(outcome) => outcome,
            Err(ServiceError::MessageNotFound) => {
                self.store.clear(user.id).await?;
                return Ok(vec![Action::send(chat_id, lang.text(Text::MessageNotFound))]);
            }
            Err(e) => return Err(e),
        };
        self.store.clear(user.id).await?;
        info!(
            "Reply {} added to thread {}",
            outcome.reply.id, outcome.thread.id
        );

        let mut actions = vec![Action::send(chat_id, lang.text(Text::ReplySent))];
        if let Some(recipient) =
            UserRepository::get_by_id(&*self.store, outcome.reply.to_user_id).await?
        {
            let recipient_lang = resolve_lang(recipient.language.as_deref());
            actions.push(Action::Notify {
                chat_id: recipient.telegram_user_id,
                text: recipient_lang.reply_received(&preview(text, NOTIFY_PREVIEW_CHARS)),
                keyboard: None,
            });
        }
        Ok(actions)
    }

    async fn on_link_prompt(
        &self,
        user: &User,
        chat_id: i64,
        label: String,
        text: &str,
        lang: Lang,
    ) -> Result<Vec<Action>, ServiceError> {
        let prompt = match text.trim() {
            "-" | "" => None,
            prompt => Some(prompt.to_owned()),
        };
        let link = CreateLinkService::new(&*self.store)
            .execute(&CreateLink {
                owner_user_id: user.id,
                label,
                prompt,
            })
            .await?;
        self.store.clear(user.id).await?;
        info!("User {} created link {}", user.id, link.id);

        let text = format!(
            "{}\n{}\n{}",
            lang.text(Text::LinkCreated),
            link.label,
            deeplink(&self.bot_username, &link.slug)
        );
        Ok(vec![Action::send(chat_id, text)])
    }

    async fn render_links(
        &self,
        user: &User,
        lang: Lang,
        place: Place,
    ) -> Result<Action, StoreError> {
        let links = ListLinksService::new(&*self.store).execute(user.id).await?;
        let counts: HashMap<i64, i64> = self
            .store
            .get_link_stats(user.id)
            .await?
            .into_iter()
            .map(|s| (s.link_id, s.messages_count))
            .collect();
        let tokens = CallbackTokenService::new(&*self.store);

        let mut lines = vec![lang.text(Text::LinksHeader).to_owned()];
        if links.is_empty() {
            lines.push(lang.text(Text::NoLinks).to_owned());
        }
        let mut keyboard = Vec::with_capacity(links.len() + 1);
        for link in &links {
            let marker = if link.is_active { "✅" } else { "⏸" };
            let count = counts.get(&link.id).copied().unwrap_or(0);
            lines.push(format!("{marker} {} ({count})", link.label));

            let toggle = tokens
                .create_token(
                    CallbackTokenType::LinkToggle,
                    link.id,
                    Some(json!({ "link_id": link.id })),
                    DEFAULT_TOKEN_TTL,
                )
                .await?;
            keyboard.push(vec![InlineButton::callback(
                lang.text(Text::ButtonToggleLink),
                toggle.token,
            )]);
        }

        let create = tokens
            .create_token(
                CallbackTokenType::LinkCreate,
                0,
                Some(json!({})),
                NAVIGATION_TOKEN_TTL,
            )
            .await?;
        keyboard.push(vec![InlineButton::callback(
            lang.text(Text::ButtonCreateLink),
            create.token,
        )]);

        Ok(place.render(lines.join("\n"), Some(keyboard)))
    }

    async fn render_messages_page(
        &self,
        user: &User,
        cursor: &PageCursor,
        lang: Lang,
        place: Place,
    ) -> Result<Action, StoreError> {
        let mut link_filter = None;
        if let Some(slug) = cursor.link_slug.as_deref() {
            match self.store.get_by_slug(slug).await? {
                Some(link) if link.owner_user_id == user.id => link_filter = Some(link),
                _ => return Ok(place.render(lang.text(Text::LinkNotFound).to_owned(), None)),
            }
        }

        let limit = cursor.limit.max(1);
        let offset = cursor.offset.max(0);
        let messages = GetUserMessagesService::new(&*self.store)
            .execute(&MessageQuery {
                user_id: user.id,
                status: cursor.status,
                link_id: link_filter.as_ref().map(|l| l.id),
                from_date: cursor.from_ts,
                limit,
                offset,
            })
            .await?;
        if messages.is_empty() {
            return Ok(place.render(lang.text(Text::NoMessages).to_owned(), None));
        }

        let mut rows = vec![lang.text(Text::MessagesHeader).to_owned()];
        if let Some(status) = cursor.status {
            rows.push(lang.status_filter(status));
        }
        if let Some(link) = &link_filter {
            rows.push(lang.link_filter(&link.label));
        }
        if let Some(from) = cursor.from_ts {
            rows.push(lang.period_filter(from));
        }
        rows.push(String::new());

        let tokens = CallbackTokenService::new(&*self.store);
        let mut keyboard = Vec::with_capacity(messages.len() + 1);
        for message in &messages {
            let open = tokens
                .create_token(
                    CallbackTokenType::OpenMessage,
                    message.id,
                    None,
                    DEFAULT_TOKEN_TTL,
                )
                .await?;
            rows.push(format!(
                "- [{}] #{}: {}",
                message.status,
                message.id,
                preview(&message.text, LIST_PREVIEW_CHARS)
            ));
            keyboard.push(vec![InlineButton::callback(
                lang.open_message_button(message.id),
                open.token,
            )]);
        }

        let mut nav = Vec::new();
        if offset > 0 {
            let previous = paginate_token(&tokens, &cursor.at((offset - limit).max(0))).await?;
            nav.push(InlineButton::callback(lang.text(Text::ButtonPrevious), previous));
        }
        if i64::try_from(messages.len()).is_ok_and(|n| n == limit) {
            let next = paginate_token(&tokens, &cursor.at(offset + limit)).await?;
            nav.push(InlineButton::callback(lang.text(Text::ButtonNext), next));
        }
        if !nav.is_empty() {
            keyboard.push(nav);
        }

        Ok(place.render(rows.join("\n"), Some(keyboard)))
    }

    async fn dispatch_callback(
        &self,
        callback: &IncomingCallback,
        lang: Lang,
    ) -> Result<CallbackReply, ServiceError> {
        let Some(data) = callback.data.as_deref() else {
            return Ok(CallbackReply::alert(lang.text(Text::UnknownAction)));
        };
        let Some(token) = CallbackTokenService::new(&*self.store)
            .consume_token(data, true)
            .await?
        else {
            return Ok(CallbackReply::alert(lang.text(Text::ButtonExpired)));
        };
        let Some(user) = self.known_user(callback.from.telegram_user_id).await? else {
            return Ok(CallbackReply::alert(lang.text(Text::UserNotFound)));
        };
        debug!("Callback {} from user {}", token.kind.as_str(), user.id);

        let place = callback
            .origin
            .map_or(Place::Chat(user.telegram_user_id), Place::Message);

        match token.kind {
            CallbackTokenType::Paginate => {
                let cursor: PageCursor = token
                    .extra_data
                    .and_then(|extra| serde_json::from_value(extra).ok())
                    .unwrap_or_default();
                let page = self.render_messages_page(&user, &cursor, lang, place).await?;
                Ok(CallbackReply::silent(vec![page]))
            }
            CallbackTokenType::LinkCreate => {
                self.store.save(user.id, &DialogState::AwaitLinkLabel).await?;
                Ok(CallbackReply::silent(prompt_below(
                    callback.origin,
                    place,
                    lang.text(Text::EnterLinkLabel),
                )))
            }
            CallbackTokenType::LinkToggle => self.toggle_link(&user, &token, lang, place).await,
            CallbackTokenType::OpenMessage => {
                self.open_message(&user, token.entity_id, lang, place).await
            }
            CallbackTokenType::Reply => {
                let message = MessageRepository::get_by_id(&*self.store, token.entity_id).await?;
                if !message.is_some_and(|m| m.recipient_user_id == user.id) {
                    return Ok(CallbackReply::alert(lang.text(Text::MessageUnavailable)));
                }
                self.store
                    .save(
                        user.id,
                        &DialogState::AwaitReplyText {
                            reply_to_message_id: token.entity_id,
                        },
                    )
                    .await?;
                Ok(CallbackReply::silent(prompt_below(
                    callback.origin,
                    place,
                    lang.text(Text::ReplyPrompt),
                )))
            }
            CallbackTokenType::RevealAuthor => {
                self.reveal_author(token.entity_id, callback.origin, lang, place)
                    .await
            }
        }
    }

    async fn toggle_link(
        &self,
        user: &User,
        token: &CallbackToken,
        lang: Lang,
        place: Place,
    ) -> Result<CallbackReply, ServiceError> {
        let link_id = token
            .extra_data
            .as_ref()
            .and_then(|extra| extra.get("link_id"))
            .and_then(Value::as_i64)
            .unwrap_or(token.entity_id);
        let Some(link) = LinkRepository::get_by_id(&*self.store, link_id)
            .await?
            .filter(|l| l.owner_user_id == user.id)
        else {
            return Ok(CallbackReply::alert(lang.text(Text::LinkNotFound)));
        };

        let is_active = !link.is_active;
        self.store.set_active(link.id, is_active).await?;
        info!("User {} set link {} active={}", user.id, link.id, is_active);

        let toast = if is_active {
            Text::LinkToggledOn
        } else {
            Text::LinkToggledOff
        };
        let list = self.render_links(user, lang, place).await?;
        Ok(CallbackReply {
            answer: Answer::toast(lang.text(toast)),
            actions: vec![list],
        })
    }

    async fn open_message(
        &self,
        user: &User,
        message_id: i64,
        lang: Lang,
        place: Place,
    ) -> Result<CallbackReply, ServiceError> {
        let Some(message) = MessageRepository::get_by_id(&*self.store, message_id)
            .await?
            .filter(|m| m.recipient_user_id == user.id)
        else {
            return Ok(CallbackReply::alert(lang.text(Text::MessageUnavailable)));
        };
        self.store.mark_read(message.id).await?;
        let link = LinkRepository::get_by_id(&*self.store, message.link_id).await?;

        let tokens = CallbackTokenService::new(&*self.store);
        let reply = tokens
            .create_token(CallbackTokenType::Reply, message.id, None, DEFAULT_TOKEN_TTL)
            .await?;
        let mut keyboard = vec![vec![InlineButton::callback(
            lang.text(Text::ButtonReplyAnonymously),
            reply.token,
        )]];
        if message.is_reveal_allowed {
            let reveal = tokens
                .create_token(
                    CallbackTokenType::RevealAuthor,
                    message.id,
                    None,
                    DEFAULT_TOKEN_TTL,
                )
                .await?;
            keyboard.push(vec![InlineButton::callback(
                lang.text(Text::ButtonRevealAuthor),
                reveal.token,
            )]);
        }

        let label = link.map(|l| l.label).unwrap_or_default();
        let text = format!("{}\n\n{}", lang.valentine_via(&label), message.text);
        Ok(CallbackReply::silent(vec![place.render(text, Some(keyboard))]))
    }

    async fn reveal_author(
        &self,
        message_id: i64,
        origin: Option<MessageRef>,
        lang: Lang,
        place: Place,
    ) -> Result<CallbackReply, ServiceError> {
        let revealed = match RevealAuthorService::new(&*self.store, &*self.store, &*self.store)
            .execute(message_id)
            .await
        {
            Ok(revealed) => revealed,
            Err(ServiceError::RevealForbidden) => {
                return Ok(CallbackReply::alert(lang.text(Text::RevealForbidden)));
            }
            Err(ServiceError::MessageNotFound | ServiceError::LinkNotFound) => {
                return Ok(CallbackReply::alert(lang.text(Text::MessageNotFound)));
            }
            Err(e) => return Err(e),
        };
        let Some(sender) = revealed.sender else {
            return Ok(CallbackReply::alert(lang.text(Text::AuthorAnonymous)));
        };

        let name = sender
            .display_name()
            .unwrap_or_else(|| lang.text(Text::NoName).to_owned());
        let mut actions: Vec<Action> = origin
            .map(|target| Action::ClearKeyboard { target })
            .into_iter()
            .collect();
        actions.push(Action::send_with(
            place.chat_id(),
            lang.author(&name),
            Markup::Inline(vec![vec![InlineButton::url(
                lang.text(Text::ButtonOpenChat),
                format!("tg://user?id={}", sender.telegram_user_id),
            )]]),
        ));
        Ok(CallbackReply::silent(actions))
    }
}

/// Drops the buttons of the pressed message and asks for input below it.
fn prompt_below(origin: Option<MessageRef>, place: Place, text: &str) -> Vec<Action> {
    let mut actions: Vec<Action> = origin
        .map(|target| Action::ClearKeyboard { target })
        .into_iter()
        .collect();
    actions.push(Action::send(place.chat_id(), text));
    actions
}

async fn paginate_token(
    tokens: &CallbackTokenService<'_>,
    cursor: &PageCursor,
) -> Result<String, StoreError> {
    let token = tokens
        .create_token(
            CallbackTokenType::Paginate,
            0,
            Some(serde_json::to_value(cursor)?),
            NAVIGATION_TOKEN_TTL,
        )
        .await?;
    Ok(token.token)
}

fn reveal_keyboard(lang: Lang) -> Markup {
    Markup::Reply(vec![vec![
        lang.text(Text::ButtonRevealAllow).to_owned(),
        lang.text(Text::ButtonRevealDeny).to_owned(),
    ]])
}

fn is_valid_length(text: &str) -> bool {
    (1..=MAX_TEXT_LENGTH).contains(&text.chars().count())
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
