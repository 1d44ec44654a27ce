//! Enumerated value types shared by storage and the bot layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unknown enum name encountered while parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Delivery status of an anonymous message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    New,
    Delivered,
    Read,
    Blocked,
}

impl MessageStatus {
    /// Returns the name used in the database and in user filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Delivered => "DELIVERED",
            Self::Read => "READ",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "DELIVERED" => Ok(Self::Delivered),
            "READ" => Ok(Self::Read),
            "BLOCKED" => Ok(Self::Blocked),
            _ => Err(ParseEnumError {
                kind: "message status",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action bound to an inline button token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackTokenType {
    OpenMessage,
    Reply,
    RevealAuthor,
    Paginate,
    LinkToggle,
    LinkCreate,
}

impl CallbackTokenType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenMessage => "OPEN_MESSAGE",
            Self::Reply => "REPLY",
            Self::RevealAuthor => "REVEAL_AUTHOR",
            Self::Paginate => "PAGINATE",
            Self::LinkToggle => "LINK_TOGGLE",
            Self::LinkCreate => "LINK_CREATE",
        }
    }
}

impl FromStr for CallbackTokenType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN_MESSAGE" => Ok(Self::OpenMessage),
            "REPLY" => Ok(Self::Reply),
            "REVEAL_AUTHOR" => Ok(Self::RevealAuthor),
            "PAGINATE" => Ok(Self::Paginate),
            "LINK_TOGGLE" => Ok(Self::LinkToggle),
            "LINK_CREATE" => Ok(Self::LinkCreate),
            _ => Err(ParseEnumError {
                kind: "callback token type",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for CallbackTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_parse_is_case_insensitive() {
        assert_eq!("read".parse(), Ok(MessageStatus::Read));
        assert_eq!("New".parse(), Ok(MessageStatus::New));
        assert!("unknown".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_callback_token_type_names_match_database_enum() {
        let all = [
            CallbackTokenType::OpenMessage,
            CallbackTokenType::Reply,
            CallbackTokenType::RevealAuthor,
            CallbackTokenType::Paginate,
            CallbackTokenType::LinkToggle,
            CallbackTokenType::LinkCreate,
        ];
        for kind in all {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&MessageStatus::Delivered).unwrap();
        assert_eq!(json, "\"DELIVERED\"");
    }
}
