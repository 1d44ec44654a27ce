//! Slash commands understood by the bot.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::domain::MessageStatus;

/// Start payload prefix of a deep link.
pub const LINK_PAYLOAD_PREFIX: &str = "link_";

/// Filters accepted by `/messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilters {
    pub status: Option<MessageStatus>,
    pub link_slug: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
}

impl MessageFilters {
    /// Parses `key=value` arguments.
    ///
    /// Arguments without `=`, unknown keys, unknown statuses and malformed
    /// periods are ignored.
    #[must_use]
    pub fn parse<'a>(args: impl IntoIterator<Item = &'a str>, now: DateTime<Utc>) -> Self {
        let mut filters = Self::default();
        for arg in args {
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };
            match key.to_lowercase().as_str() {
                "status" => filters.status = value.parse().ok(),
                "link" => filters.link_slug = Some(value.to_owned()),
                "period" => filters.from_date = parse_period(value, now),
                _ => {}
            }
        }
        filters
    }
}

/// Parses `Nd` or `Nh` into the instant that far before `now`.
#[must_use]
pub fn parse_period(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let unit = value.chars().last()?;
    let amount = &value[..value.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: i64 = amount.parse().ok()?;
    let span = match unit {
        'd' => Duration::try_days(amount)?,
        'h' => Duration::try_hours(amount)?,
        _ => return None,
    };
    now.checked_sub_signed(span)
}

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the main menu.
    Start,

    /// Open a link to write an anonymous message.
    StartWithLink(String),

    /// List received messages.
    Messages(MessageFilters),

    /// List own links.
    Links,

    /// Show statistics.
    Stats,

    /// Show the main menu.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts an optional `@botname` suffix on the command and returns
    /// `None` for plain text and unknown commands.
    #[must_use]
    pub fn parse(text: &str, now: DateTime<Utc>) -> Option<Self> {
        let text = text.trim();
        let after_slash = text.strip_prefix('/')?;

        let (cmd, args) = match after_slash.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (after_slash, ""),
        };
        let cmd = cmd.split_once('@').map_or(cmd, |(name, _)| name);

        match cmd.to_lowercase().as_str() {
            "start" => Some(
                args.split_whitespace()
                    .next()
                    .and_then(|payload| payload.strip_prefix(LINK_PAYLOAD_PREFIX))
                    .map_or(Self::Start, |slug| Self::StartWithLink(slug.to_owned())),
            ),
            "messages" => Some(Self::Messages(MessageFilters::parse(
                args.split_whitespace(),
                now,
            ))),
            "links" => Some(Self::Links),
            "stats" => Some(Self::Stats),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name without the slash.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start | Self::StartWithLink(_) => "start",
            Self::Messages(_) => "messages",
            Self::Links => "links",
            Self::Stats => "stats",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartWithLink(slug) => write!(f, "/start {LINK_PAYLOAD_PREFIX}{slug}"),
            _ => write!(f, "/{}", self.name()),
        }
    }
}

/// Builds the deep link that opens a link in the bot.
#[must_use]
pub fn deeplink(bot_username: &str, slug: &str) -> String {
    format!("https://t.me/{bot_username}?start={LINK_PAYLOAD_PREFIX}{slug}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(BotCommand::parse("/start", now()), Some(BotCommand::Start));
        assert_eq!(
            BotCommand::parse("/start link_abc123", now()),
            Some(BotCommand::StartWithLink("abc123".to_owned()))
        );
        assert_eq!(
            BotCommand::parse("/start promo", now()),
            Some(BotCommand::Start)
        );
    }

    #[test]
    fn test_parse_bot_suffix() {
        assert_eq!(
            BotCommand::parse("/links@valentot_bot", now()),
            Some(BotCommand::Links)
        );
        assert_eq!(
            BotCommand::parse("/Stats", now()),
            Some(BotCommand::Stats)
        );
    }

    #[test]
    fn test_parse_not_a_command() {
        assert_eq!(BotCommand::parse("hello", now()), None);
        assert_eq!(BotCommand::parse("/unknown", now()), None);
    }

    #[test]
    fn test_parse_messages_filters() {
        let command = BotCommand::parse("/messages status=new link=abc period=7d", now());
        assert_eq!(
            command,
            Some(BotCommand::Messages(MessageFilters {
                status: Some(MessageStatus::New),
                link_slug: Some("abc".to_owned()),
                from_date: Some(Utc.with_ymd_and_hms(2024, 2, 7, 12, 0, 0).unwrap()),
            }))
        );
    }

    #[test]
    fn test_filters_ignore_garbage() {
        let filters = MessageFilters::parse(["status=unknown", "period=7w", "noise"], now());
        assert_eq!(filters, MessageFilters::default());
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(
            parse_period("12h", now()),
            Some(Utc.with_ymd_and_hms(2024, 2, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_period("h", now()), None);
        assert_eq!(parse_period("", now()), None);
        assert_eq!(parse_period("-1d", now()), None);
        assert_eq!(parse_period("7д", now()), None);
    }

    #[test]
    fn test_deeplink() {
        assert_eq!(
            deeplink("valentot_bot", "abc"),
            "https://t.me/valentot_bot?start=link_abc"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BotCommand::StartWithLink("abc".to_owned()).to_string(),
            "/start link_abc"
        );
        assert_eq!(BotCommand::Links.to_string(), "/links");
    }
}
