//! User registration.

use crate::domain::{StoreError, TelegramProfile, User, UserRepository};

/// Creates or refreshes a user from the Telegram profile of an update.
pub struct UpsertUserService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> UpsertUserService<'a> {
    pub fn new(users: &'a dyn UserRepository) -> Self {
        Self { users }
    }

    pub async fn execute(&self, profile: &TelegramProfile) -> Result<User, StoreError> {
        self.users.upsert_from_telegram(profile).await
    }
}
