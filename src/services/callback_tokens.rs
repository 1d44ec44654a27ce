//! Opaque tokens carried in inline button callback data.
//!
//! Telegram limits callback data to 64 bytes, so buttons carry a short
//! random token and the action it stands for is kept in storage.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::random_alphanumeric;
use crate::domain::{CallbackToken, CallbackTokenRepository, CallbackTokenType, StoreError};

/// Lifetime of a token when the caller has no specific need.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

const TOKEN_PREFIX: &str = "cb_";
const TOKEN_LENGTH: usize = 16;

pub struct CallbackTokenService<'a> {
    tokens: &'a dyn CallbackTokenRepository,
}

impl<'a> CallbackTokenService<'a> {
    pub fn new(tokens: &'a dyn CallbackTokenRepository) -> Self {
        Self { tokens }
    }

    /// Issues a new token expiring after `ttl`.
    pub async fn create_token(
        &self,
        kind: CallbackTokenType,
        entity_id: i64,
        extra_data: Option<Value>,
        ttl: Duration,
    ) -> Result<CallbackToken, StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::InvalidValue(format!("token ttl: {e}")))?;
        let expires_at = Utc::now() + ttl;

        let mut token = generate_token();
        while self.tokens.get(&token).await?.is_some() {
            debug!("Callback token collision, regenerating");
            token = generate_token();
        }
        self.tokens
            .create(&token, kind, entity_id, extra_data, Some(expires_at))
            .await
    }

    /// Looks a token up.
    ///
    /// Unknown and expired tokens yield `None`; an expired token is deleted
    /// on the way. One-time tokens are deleted once returned.
    pub async fn consume_token(
        &self,
        token: &str,
        one_time: bool,
    ) -> Result<Option<CallbackToken>, StoreError> {
        let Some(record) = self.tokens.get(token).await? else {
            return Ok(None);
        };
        if record.is_expired(Utc::now()) {
            self.tokens.delete(token).await?;
            return Ok(None);
        }
        if one_time {
            self.tokens.delete(token).await?;
        }
        Ok(Some(record))
    }

    /// Deletes every token expired by now.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.tokens.delete_expired(Utc::now()).await
    }
}

fn generate_token() -> String {
    format!("{TOKEN_PREFIX}{}", random_alphanumeric(TOKEN_LENGTH))
}
