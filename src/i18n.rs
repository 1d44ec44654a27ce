//! User-facing texts in Russian and English.
//!
//! Russian is the default language; English is picked for users whose
//! Telegram language code starts with `en`.

use chrono::{DateTime, Utc};

use crate::domain::{LinkStats, MessageStatus, UserStats};

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    Ru,
    En,
}

/// Picks the interface language for a Telegram language code.
#[must_use]
pub fn resolve_lang(language_code: Option<&str>) -> Lang {
    match language_code {
        Some(code) if code.to_ascii_lowercase().starts_with("en") => Lang::En,
        _ => Lang::Ru,
    }
}

/// Catalogue keys for fixed texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    GreetingMenu,
    InvalidLink,
    SendPrompt,
    RevealChoice,
    ChooseOption,
    EnterText,
    TextOnly,
    MessageLength,
    SessionExpired,
    MessageSent,
    ReplyPrompt,
    ReplyLength,
    ReplySent,
    NoMessages,
    UserNotFound,
    LinkNotFound,
    LinksHeader,
    NoLinks,
    EnterLinkLabel,
    EnterLinkPrompt,
    LinkCreated,
    LinkToggledOn,
    LinkToggledOff,
    StatsHeader,
    StatsPerLink,
    StatsLinksNone,
    MessagesHeader,
    ButtonExpired,
    MessageUnavailable,
    MessageNotFound,
    RevealForbidden,
    AuthorAnonymous,
    NoName,
    UnknownAction,
    InternalError,
    ButtonRevealAllow,
    ButtonRevealDeny,
    ButtonToggleLink,
    ButtonCreateLink,
    ButtonOpenValentine,
    ButtonReplyAnonymously,
    ButtonRevealAuthor,
    ButtonOpenChat,
    ButtonPrevious,
    ButtonNext,
}

impl Text {
    const fn pair(self) -> (&'static str, &'static str) {
        match self {
            Self::GreetingMenu => (
                "Привет! Главное меню:\n• Мои ссылки (/links)\n• Мои сообщения (/messages)\n• Статистика (/stats)\n• Помощь (/help)",
                "Hi! Main menu:\n• My links (/links)\n• My messages (/messages)\n• Statistics (/stats)\n• Help (/help)",
            ),
            Self::InvalidLink => (
                "Ссылка недействительна или выключена.",
                "The link is invalid or disabled.",
            ),
            Self::SendPrompt => ("Отправь анонимное сообщение.", "Send an anonymous message."),
            Self::RevealChoice => (
                "Выбери режим раскрытия автора:",
                "Choose author reveal mode:",
            ),
            Self::ChooseOption => ("Выберите один из вариантов.", "Choose one of the options."),
            Self::EnterText => (
                "Введите текст сообщения (1–2000 символов).",
                "Enter message text (1–2000 chars).",
            ),
            Self::TextOnly => (
                "Доступны только текстовые сообщения.",
                "Only text messages are allowed.",
            ),
            Self::MessageLength => (
                "Сообщение должно быть от 1 до 2000 символов.",
                "Message must be 1–2000 characters.",
            ),
            Self::SessionExpired => (
                "Сессия устарела, начните заново по ссылке.",
                "Session expired, start again via the link.",
            ),
            Self::MessageSent => ("Ваше сообщение отправлено!", "Your message has been sent!"),
            Self::ReplyPrompt => (
                "Введите текст ответа (1–2000 символов).",
                "Enter reply text (1–2000 chars).",
            ),
            Self::ReplyLength => (
                "Ответ должен быть от 1 до 2000 символов.",
                "Reply must be 1–2000 characters.",
            ),
            Self::ReplySent => ("Ответ отправлен.", "Reply sent."),
            Self::NoMessages => (
                "Сообщений не найдено по выбранным фильтрам.",
                "No messages found for selected filters.",
            ),
            Self::UserNotFound => ("Пользователь не найден.", "User not found."),
            Self::LinkNotFound => (
                "Ссылка не найдена или недоступна.",
                "Link not found or not available.",
            ),
            Self::LinksHeader => ("Мои ссылки:", "My links:"),
            Self::NoLinks => (
                "У вас нет ссылок. Нажмите 'Создать ссылку'.",
                "You have no links. Press 'Create link'.",
            ),
            Self::EnterLinkLabel => ("Введите название ссылки (label).", "Enter link label."),
            Self::EnterLinkPrompt => (
                "Введите промпт (опционально) или отправьте '-' чтобы пропустить.",
                "Enter prompt (optional) or send '-' to skip.",
            ),
            Self::LinkCreated => ("Ссылка создана:", "Link created:"),
            Self::LinkToggledOn => ("Ссылка включена.", "Link enabled."),
            Self::LinkToggledOff => ("Ссылка выключена.", "Link disabled."),
            Self::StatsHeader => ("Статистика:", "Statistics:"),
            Self::StatsPerLink => ("По ссылкам:", "Per-link:"),
            Self::StatsLinksNone => ("По ссылкам: нет данных", "Per-link: no data"),
            Self::MessagesHeader => ("Мои сообщения:", "My messages:"),
            Self::ButtonExpired => (
                "Кнопка больше не действительна.",
                "This button is no longer valid.",
            ),
            Self::MessageUnavailable => ("Сообщение недоступно.", "Message is not available."),
            Self::MessageNotFound => ("Сообщение не найдено.", "Message not found."),
            Self::RevealForbidden => (
                "Автор запретил раскрытие.",
                "The author does not allow revealing.",
            ),
            Self::AuthorAnonymous => ("Автор анонимен.", "The author is anonymous."),
            Self::NoName => ("без имени", "no name"),
            Self::UnknownAction => ("Неизвестное действие.", "Unknown action."),
            Self::InternalError => (
                "Что-то пошло не так, попробуйте позже.",
                "Something went wrong, please try again later.",
            ),
            Self::ButtonRevealAllow => ("Разрешить раскрытие", "Allow reveal"),
            Self::ButtonRevealDeny => ("Запретить раскрытие", "Deny reveal"),
            Self::ButtonToggleLink => ("Вкл/Выкл", "On/Off"),
            Self::ButtonCreateLink => ("Создать ссылку", "Create link"),
            Self::ButtonOpenValentine => ("Открыть валентинку", "Open valentine"),
            Self::ButtonReplyAnonymously => ("Ответить анонимно", "Reply anonymously"),
            Self::ButtonRevealAuthor => ("Раскрыть автора", "Reveal author"),
            Self::ButtonOpenChat => ("Перейти в чат", "Open chat"),
            Self::ButtonPrevious => ("◀️ Предыдущие", "◀️ Previous"),
            Self::ButtonNext => ("Следующие ▶️", "Next ▶️"),
        }
    }

    /// Whether `input` equals this text in any supported language.
    #[must_use]
    pub fn matches(self, input: &str) -> bool {
        let (ru, en) = self.pair();
        input == ru || input == en
    }
}

impl Lang {
    /// Returns a fixed text.
    #[must_use]
    pub const fn text(self, key: Text) -> &'static str {
        let (ru, en) = key.pair();
        match self {
            Self::Ru => ru,
            Self::En => en,
        }
    }

    #[must_use]
    pub fn link_prompt(self, prompt: &str) -> String {
        match self {
            Self::Ru => format!("Промпт: {prompt}"),
            Self::En => format!("Prompt: {prompt}"),
        }
    }

    /// Notification sent to a link owner about a new message.
    #[must_use]
    pub fn new_valentine(self, link_label: &str, preview: &str) -> String {
        match self {
            Self::Ru => format!("Новая валентинка по вашей ссылке \"{link_label}\":\n{preview}"),
            Self::En => format!("New valentine via your link \"{link_label}\":\n{preview}"),
        }
    }

    #[must_use]
    pub fn reply_received(self, preview: &str) -> String {
        match self {
            Self::Ru => format!("Вам ответили на валентинку:\n{preview}"),
            Self::En => format!("You got a reply to a valentine:\n{preview}"),
        }
    }

    /// Header of an opened message.
    #[must_use]
    pub fn valentine_via(self, link_label: &str) -> String {
        match self {
            Self::Ru => format!("Валентинка по ссылке \"{link_label}\":"),
            Self::En => format!("Valentine via link \"{link_label}\":"),
        }
    }

    #[must_use]
    pub fn author(self, name: &str) -> String {
        match self {
            Self::Ru => format!("Автор: {name}"),
            Self::En => format!("Author: {name}"),
        }
    }

    #[must_use]
    pub fn open_message_button(self, message_id: i64) -> String {
        match self {
            Self::Ru => format!("Открыть #{message_id}"),
            Self::En => format!("Open #{message_id}"),
        }
    }

    #[must_use]
    pub fn status_filter(self, status: MessageStatus) -> String {
        match self {
            Self::Ru => format!("Статус: {status}"),
            Self::En => format!("Status: {status}"),
        }
    }

    #[must_use]
    pub fn link_filter(self, label: &str) -> String {
        match self {
            Self::Ru => format!("Ссылка: {label}"),
            Self::En => format!("Link: {label}"),
        }
    }

    #[must_use]
    pub fn period_filter(self, from: DateTime<Utc>) -> String {
        let from = from.format("%Y-%m-%d %H:%M UTC");
        match self {
            Self::Ru => format!("Период: с {from}"),
            Self::En => format!("Period: since {from}"),
        }
    }

    /// Body of the `/stats` answer.
    #[must_use]
    pub fn stats(self, stats: &UserStats) -> String {
        let counters = match self {
            Self::Ru => [
                format!("Всего сообщений: {}", stats.total_messages),
                format!("Ответов: {}", stats.total_replies),
                format!("Раскрытий автора: {}", stats.total_revealed),
                format!("Жалоб: {}", stats.total_reported),
                format!("Ссылок: {}", stats.total_links),
            ],
            Self::En => [
                format!("Total messages: {}", stats.total_messages),
                format!("Replies: {}", stats.total_replies),
                format!("Author reveals: {}", stats.total_revealed),
                format!("Reports: {}", stats.total_reported),
                format!("Links: {}", stats.total_links),
            ],
        };

        let mut lines = vec![self.text(Text::StatsHeader).to_owned()];
        lines.extend(counters);
        lines.push(String::new());
        if stats.link_stats.is_empty() {
            lines.push(self.text(Text::StatsLinksNone).to_owned());
        } else {
            lines.push(self.text(Text::StatsPerLink).to_owned());
            lines.extend(stats.link_stats.iter().map(|item| self.link_stats_line(item)));
        }
        lines.join("\n")
    }

    fn link_stats_line(self, item: &LinkStats) -> String {
        match self {
            Self::Ru => format!(
                "- {}: сообщений {}, уникальных отправителей {}",
                item.label, item.messages_count, item.unique_senders
            ),
            Self::En => format!(
                "- {}: messages {}, unique senders {}",
                item.label, item.messages_count, item.unique_senders
            ),
        }
    }
}
