//! Telegram Bot API integration.
//!
//! Converts teloxide updates into [`crate::bot::Incoming`] values and
//! performs the returned actions, spacing out notifications to other users.

mod rate_limiter;
mod transport;

pub use rate_limiter::RateLimiter;
pub use transport::{TelegramError, TelegramTransport, UpdateSource};
