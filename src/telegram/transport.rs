//! teloxide adapter.
//!
//! Receives updates through a webhook or long polling, feeds them to the
//! [`BotHandler`] and performs the resulting actions with the Bot API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    MessageId, ReplyMarkup, User as TelegramUser,
};
use teloxide::update_listeners::webhooks;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::RateLimiter;
use crate::bot::{
    Action, BotHandler, ButtonAction, Incoming, IncomingCallback, IncomingMessage, InlineButton,
    InlineKeyboard, Markup, MessageRef,
};
use crate::domain::{Repositories, TelegramProfile};

/// Errors raised while talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Flood wait required: {0:?}")]
    FloodWait(Duration),
}

/// How updates reach the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSource {
    /// `getUpdates` long polling.
    Polling,
    /// Telegram posts updates to `url`; the listener binds `listen`.
    Webhook { listen: SocketAddr, url: Url },
}

/// Bridges teloxide and the transport-neutral handler.
pub struct TelegramTransport<S> {
    bot: Bot,
    handler: BotHandler<S>,
    notify_limiter: RateLimiter,
}

impl<S: Repositories + 'static> TelegramTransport<S> {
    /// Creates a transport spacing notifications by `notify_min_interval`.
    #[must_use]
    pub fn new(bot: Bot, handler: BotHandler<S>, notify_min_interval: Duration) -> Self {
        Self {
            bot,
            handler,
            notify_limiter: RateLimiter::new(notify_min_interval),
        }
    }

    /// Runs the dispatcher until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook cannot be registered or removed.
    pub async fn run(self: Arc<Self>, source: UpdateSource) -> Result<(), TelegramError> {
        let bot = self.bot.clone();
        let schema = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message::<S>))
            .branch(Update::filter_callback_query().endpoint(on_callback::<S>));

        let mut dispatcher = Dispatcher::builder(bot.clone(), schema)
            .dependencies(dptree::deps![self])
            .enable_ctrlc_handler()
            .build();

        match source {
            UpdateSource::Polling => {
                bot.delete_webhook().await?;
                info!("Receiving updates by long polling");
                dispatcher.dispatch().await;
            }
            UpdateSource::Webhook { listen, url } => {
                let listener =
                    webhooks::axum(bot, webhooks::Options::new(listen, url.clone())).await?;
                info!("Webhook listening on {} for {}", listen, url);
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("An error from the update listener"),
                    )
                    .await;
            }
        }

        info!("Dispatcher stopped");
        Ok(())
    }

    async fn process(&self, incoming: Incoming) {
        let actions = self.handler.handle(&incoming).await;
        for action in actions {
            let kind = action.kind();
            if let Err(e) = self.perform(action).await {
                error!("Failed to perform {} action: {}", kind, e);
            }
        }
    }

    async fn perform(&self, action: Action) -> Result<(), TelegramError> {
        match action {
            Action::Send {
                chat_id,
                text,
                markup,
            } => {
                let mut request = self.bot.send_message(ChatId(chat_id), text);
                if let Some(markup) = markup {
                    request = request.reply_markup(reply_markup(markup));
                }
                request.await?;
            }
            Action::Edit {
                target,
                text,
                keyboard,
            } => {
                let mut request = self.bot.edit_message_text(
                    ChatId(target.chat_id),
                    MessageId(target.message_id),
                    text,
                );
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(inline_markup(keyboard));
                }
                request.await?;
            }
            Action::ClearKeyboard { target } => {
                self.bot
                    .edit_message_reply_markup(ChatId(target.chat_id), MessageId(target.message_id))
                    .await?;
            }
            Action::AnswerCallback {
                query_id,
                text,
                show_alert,
            } => {
                let mut request = self.bot.answer_callback_query(query_id);
                if let Some(text) = text {
                    request = request.text(text).show_alert(show_alert);
                }
                request.await?;
            }
            Action::Notify {
                chat_id,
                text,
                keyboard,
            } => {
                if let Err(e) = self.notify(chat_id, &text, keyboard).await {
                    warn!("Failed to notify chat {}: {}", chat_id, e);
                }
            }
        }
        Ok(())
    }

    /// Sends a notification through the rate limiter, retrying once after a
    /// flood wait.
    async fn notify(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<(), TelegramError> {
        let markup = keyboard.map(inline_markup);
        let mut retried = false;
        loop {
            let waited = self.notify_limiter.wait_and_acquire().await;
            if !waited.is_zero() {
                debug!("Waited {:?} before notifying chat {}", waited, chat_id);
            }

            let mut request = self.bot.send_message(ChatId(chat_id), text);
            if let Some(markup) = markup.clone() {
                request = request.reply_markup(markup);
            }
            match request.await {
                Ok(_) => return Ok(()),
                Err(RequestError::RetryAfter(after)) => {
                    let wait = after.duration();
                    if retried {
                        return Err(TelegramError::FloodWait(wait));
                    }
                    self.notify_limiter.handle_flood_wait(wait).await;
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn on_message<S: Repositories + 'static>(
    transport: Arc<TelegramTransport<S>>,
    msg: Message,
) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref().and_then(profile) else {
        debug!("Ignoring message {} without a usable sender", msg.id.0);
        return Ok(());
    };
    transport
        .process(Incoming::Message(IncomingMessage {
            chat_id: msg.chat.id.0,
            from,
            text: msg.text().map(str::to_owned),
        }))
        .await;
    Ok(())
}

async fn on_callback<S: Repositories + 'static>(
    transport: Arc<TelegramTransport<S>>,
    query: CallbackQuery,
) -> ResponseResult<()> {
    let Some(from) = profile(&query.from) else {
        debug!("Ignoring callback {} with an unusable sender", query.id);
        return Ok(());
    };
    let origin = query.message.as_ref().map(|m| MessageRef {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    transport
        .process(Incoming::Callback(IncomingCallback {
            query_id: query.id.clone(),
            from,
            data: query.data.clone(),
            origin,
        }))
        .await;
    Ok(())
}

fn profile(user: &TelegramUser) -> Option<TelegramProfile> {
    Some(TelegramProfile {
        telegram_user_id: i64::try_from(user.id.0).ok()?,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
        last_name: user.last_name.clone(),
        language: user.language_code.clone(),
    })
}

fn reply_markup(markup: Markup) -> ReplyMarkup {
    match markup {
        Markup::Inline(keyboard) => ReplyMarkup::InlineKeyboard(inline_markup(keyboard)),
        Markup::Reply(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(
                rows.into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
            )
            .one_time_keyboard()
            .resize_keyboard(),
        ),
        Markup::RemoveReply => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

fn inline_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        keyboard
            .into_iter()
            .map(|row| row.into_iter().filter_map(inline_button).collect::<Vec<_>>()),
    )
}

fn inline_button(button: InlineButton) -> Option<InlineKeyboardButton> {
    match button.action {
        ButtonAction::Callback(data) => Some(InlineKeyboardButton::callback(button.text, data)),
        ButtonAction::Url(raw) => match Url::parse(&raw) {
            Ok(url) => Some(InlineKeyboardButton::url(button.text, url)),
            Err(e) => {
                warn!("Dropping button with invalid URL {}: {}", raw, e);
                None
            }
        },
    }
}
