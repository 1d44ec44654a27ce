//! PostgreSQL adapters for the storage ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::domain::{
    CallbackToken, CallbackTokenRepository, CallbackTokenType, DialogState, DialogStateStore, Link,
    LinkRepository, LinkStats, Message, MessageQuery, MessageRepository, MessageStatus,
    StoreError, TelegramProfile, Thread, ThreadMessage, ThreadMessageRepository, ThreadRepository,
    User, UserRepository, UserStats,
};

const USER_COLUMNS: &str = "id, telegram_user_id, username, first_name, last_name, language, \
                            is_blocked, created_at, updated_at";

const LINK_COLUMNS: &str =
    "id, owner_user_id, slug, label, prompt, is_active, created_at, updated_at, deleted_at";

const MESSAGE_COLUMNS: &str = "id, link_id, recipient_user_id, sender_user_id, text, \
                               is_reveal_allowed, is_revealed, status::text AS status, \
                               is_reported, created_at, delivered_at, read_at";

const THREAD_MESSAGE_COLUMNS: &str =
    "id, thread_id, from_user_id, to_user_id, text, created_at, read_at";

const TOKEN_COLUMNS: &str =
    "id, token, type::text AS kind, entity_id, extra_data, expires_at, created_at";

/// Opens a connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    info!(
        "Connecting to PostgreSQL at {}:{} (db={})",
        config.host, config.port, config.database
    );

    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    info!("Applying database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}

/// Every storage port implemented over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    telegram_user_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    language: Option<String>,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            telegram_user_id: row.telegram_user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            language: row.language,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LinkRow {
    id: i64,
    owner_user_id: i64,
    slug: String,
    label: String,
    prompt: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Self {
            id: row.id,
            owner_user_id: row.owner_user_id,
            slug: row.slug,
            label: row.label,
            prompt: row.prompt,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    link_id: i64,
    recipient_user_id: i64,
    sender_user_id: Option<i64>,
    text: String,
    is_reveal_allowed: bool,
    is_revealed: bool,
    status: String,
    is_reported: bool,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let status: MessageStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::InvalidValue(format!("{e}")))?;
        Ok(Self {
            id: row.id,
            link_id: row.link_id,
            recipient_user_id: row.recipient_user_id,
            sender_user_id: row.sender_user_id,
            text: row.text,
            is_reveal_allowed: row.is_reveal_allowed,
            is_revealed: row.is_revealed,
            status,
            is_reported: row.is_reported,
            created_at: row.created_at,
            delivered_at: row.delivered_at,
            read_at: row.read_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ThreadRow {
    id: i64,
    root_message_id: i64,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id,
            root_message_id: row.root_message_id,
            created_at: row.created_at,
            closed_at: row.closed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ThreadMessageRow {
    id: i64,
    thread_id: i64,
    from_user_id: i64,
    to_user_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl From<ThreadMessageRow> for ThreadMessage {
    fn from(row: ThreadMessageRow) -> Self {
        Self {
            id: row.id,
            thread_id: row.thread_id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            text: row.text,
            created_at: row.created_at,
            read_at: row.read_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TokenRow {
    id: i64,
    token: String,
    kind: String,
    entity_id: i64,
    extra_data: Option<Value>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for CallbackToken {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind: CallbackTokenType = row
            .kind
            .parse()
            .map_err(|e| StoreError::InvalidValue(format!("{e}")))?;
        Ok(Self {
            id: row.id,
            token: row.token,
            kind,
            entity_id: row.entity_id,
            extra_data: row.extra_data,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LinkStatsRow {
    link_id: i64,
    label: String,
    messages_count: i64,
    unique_senders: i64,
}

#[derive(Debug, FromRow)]
struct DialogRow {
    state: String,
    data: Option<Value>,
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get_by_telegram_id(&self, telegram_user_id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_user_id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(telegram_user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn upsert_from_telegram(&self, profile: &TelegramProfile) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (telegram_user_id, username, first_name, last_name, language) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (telegram_user_id) DO UPDATE SET \
                 username = EXCLUDED.username, \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 language = EXCLUDED.language, \
                 updated_at = now() \
             RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(profile.telegram_user_id)
            .bind(profile.username.as_deref())
            .bind(profile.first_name.as_deref())
            .bind(profile.last_name.as_deref())
            .bind(profile.language.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl LinkRepository for PgStore {
    async fn create(
        &self,
        owner_user_id: i64,
        slug: &str,
        label: &str,
        prompt: Option<&str>,
    ) -> Result<Link, StoreError> {
        let sql = format!(
            "INSERT INTO links (owner_user_id, slug, label, prompt) VALUES ($1, $2, $3, $4) \
             RETURNING {LINK_COLUMNS}"
        );
        let row: LinkRow = sqlx::query_as(&sql)
            .bind(owner_user_id)
            .bind(slug)
            .bind(label)
            .bind(prompt)
            .fetch_one(&self.pool)
            .await?;
        debug!("Created link {} for user {}", row.id, owner_user_id);
        Ok(row.into())
    }

    async fn list_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>, StoreError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links \
             WHERE owner_user_id = $1 AND deleted_at IS NULL ORDER BY id"
        );
        let rows: Vec<LinkRow> = sqlx::query_as(&sql)
            .bind(owner_user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError> {
        let sql =
            format!("SELECT {LINK_COLUMNS} FROM links WHERE slug = $1 AND deleted_at IS NULL");
        let row: Option<LinkRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Link::from))
    }

    async fn get_by_id(&self, link_id: i64) -> Result<Option<Link>, StoreError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1 AND deleted_at IS NULL");
        let row: Option<LinkRow> = sqlx::query_as(&sql)
            .bind(link_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Link::from))
    }

    async fn exists_slug(&self, slug: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM links WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn set_active(&self, link_id: i64, is_active: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE links SET is_active = $2, updated_at = now() WHERE id = $1")
            .bind(link_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for PgStore {
    async fn create(
        &self,
        link_id: i64,
        recipient_user_id: i64,
        sender_user_id: Option<i64>,
        text: &str,
        is_reveal_allowed: bool,
    ) -> Result<Message, StoreError> {
        let sql = format!(
            "INSERT INTO messages (link_id, recipient_user_id, sender_user_id, text, \
                                   is_reveal_allowed, status) \
             VALUES ($1, $2, $3, $4, $5, $6::message_status) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row: MessageRow = sqlx::query_as(&sql)
            .bind(link_id)
            .bind(recipient_user_id)
            .bind(sender_user_id)
            .bind(text)
            .bind(is_reveal_allowed)
            .bind(MessageStatus::New.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_by_id(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let row: Option<MessageRow> = sqlx::query_as(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Message::try_from).transpose()
    }

    async fn list_for_user(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError> {
        // NULL parameters disable their filter.
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE recipient_user_id = $1 \
               AND ($2::message_status IS NULL OR status = $2::message_status) \
               AND ($3::bigint IS NULL OR link_id = $3) \
               AND ($4::timestamptz IS NULL OR created_at >= $4) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5 OFFSET $6"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(query.user_id)
            .bind(query.status.map(MessageStatus::as_str))
            .bind(query.link_id)
            .bind(query.from_date)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn mark_revealed(&self, message_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE messages SET is_revealed = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_read(&self, message_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE messages SET status = 'READ', read_at = COALESCE(read_at, now()) WHERE id = $1",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_stats(&self, user_id: i64) -> Result<UserStats, StoreError> {
        let (total_messages, total_revealed, total_reported): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE is_revealed), \
                    COUNT(*) FILTER (WHERE is_reported) \
             FROM messages WHERE recipient_user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let total_replies: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM thread_messages WHERE from_user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(UserStats {
            total_messages,
            total_replies,
            total_revealed,
            total_reported,
            total_links: 0,
            link_stats: Vec::new(),
        })
    }

    async fn get_link_stats(&self, user_id: i64) -> Result<Vec<LinkStats>, StoreError> {
        let rows: Vec<LinkStatsRow> = sqlx::query_as(
            "SELECT l.id AS link_id, l.label AS label, \
                    COUNT(m.id) AS messages_count, \
                    COUNT(DISTINCT m.sender_user_id) AS unique_senders \
             FROM links l JOIN messages m ON m.link_id = l.id \
             WHERE l.owner_user_id = $1 \
             GROUP BY l.id, l.label \
             ORDER BY l.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| LinkStats {
                link_id: row.link_id,
                label: row.label,
                messages_count: row.messages_count,
                unique_senders: row.unique_senders,
            })
            .collect())
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    async fn get_by_root_message(&self, message_id: i64) -> Result<Option<Thread>, StoreError> {
        let row: Option<ThreadRow> = sqlx::query_as(
            "SELECT id, root_message_id, created_at, closed_at FROM threads \
             WHERE root_message_id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Thread::from))
    }

    async fn create(&self, root_message_id: i64) -> Result<Thread, StoreError> {
        let row: ThreadRow = sqlx::query_as(
            "INSERT INTO threads (root_message_id) VALUES ($1) \
             RETURNING id, root_message_id, created_at, closed_at",
        )
        .bind(root_message_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl ThreadMessageRepository for PgStore {
    async fn create(
        &self,
        thread_id: i64,
        from_user_id: i64,
        to_user_id: i64,
        text: &str,
    ) -> Result<ThreadMessage, StoreError> {
        let sql = format!(
            "INSERT INTO thread_messages (thread_id, from_user_id, to_user_id, text) \
             VALUES ($1, $2, $3, $4) RETURNING {THREAD_MESSAGE_COLUMNS}"
        );
        let row: ThreadMessageRow = sqlx::query_as(&sql)
            .bind(thread_id)
            .bind(from_user_id)
            .bind(to_user_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list_by_thread(&self, thread_id: i64) -> Result<Vec<ThreadMessage>, StoreError> {
        let sql = format!(
            "SELECT {THREAD_MESSAGE_COLUMNS} FROM thread_messages \
             WHERE thread_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows: Vec<ThreadMessageRow> = sqlx::query_as(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ThreadMessage::from).collect())
    }
}

#[async_trait]
impl CallbackTokenRepository for PgStore {
    async fn create(
        &self,
        token: &str,
        kind: CallbackTokenType,
        entity_id: i64,
        extra_data: Option<Value>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CallbackToken, StoreError> {
        let sql = format!(
            "INSERT INTO callback_tokens (token, type, entity_id, extra_data, expires_at) \
             VALUES ($1, $2::callback_token_type, $3, $4, $5) RETURNING {TOKEN_COLUMNS}"
        );
        let row: TokenRow = sqlx::query_as(&sql)
            .bind(token)
            .bind(kind.as_str())
            .bind(entity_id)
            .bind(extra_data)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get(&self, token: &str) -> Result<Option<CallbackToken>, StoreError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM callback_tokens WHERE token = $1");
        let row: Option<TokenRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CallbackToken::try_from).transpose()
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM callback_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM callback_tokens WHERE expires_at IS NOT NULL AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DialogStateStore for PgStore {
    async fn load(&self, user_id: i64) -> Result<Option<DialogState>, StoreError> {
        let row: Option<DialogRow> =
            sqlx::query_as("SELECT state, data FROM dialog_states WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|row| DialogState::from_record(user_id, &row.state, row.data))
            .transpose()
    }

    async fn save(&self, user_id: i64, state: &DialogState) -> Result<(), StoreError> {
        let data = state.to_data()?;
        sqlx::query(
            "INSERT INTO dialog_states (user_id, state, data) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 state = EXCLUDED.state, data = EXCLUDED.data, updated_at = now()",
        )
        .bind(user_id)
        .bind(state.name())
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM dialog_states WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
