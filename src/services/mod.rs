//! Use cases of the bot.
//!
//! Each service borrows the storage ports it needs for the duration of one
//! update and exposes a single `execute` entry point.

mod callback_tokens;
mod links;
mod messages;
mod reveal;
mod users;

pub use callback_tokens::{CallbackTokenService, DEFAULT_TOKEN_TTL};
pub use links::{CreateLink, CreateLinkService, ListLinksService};
pub use messages::{
    GetUserMessagesService, GetUserStatsService, ReplyOutcome, ReplyToMessageService,
    SendAnonymousMessage, SendAnonymousMessageService,
};
pub use reveal::{RevealAuthorService, RevealedAuthor};
pub use users::UpsertUserService;

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generates a random string of ASCII letters and digits.
fn random_alphanumeric(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_alphanumeric() {
        let value = random_alphanumeric(32);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
