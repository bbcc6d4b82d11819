//! Message Storage
//!
//! Append-only persistence for conversation messages. A `Message` row is
//! written once, after its turn fully resolves, and never mutated; the
//! metadata column carries the serialized telemetry contract the dashboard
//! aggregator reads back.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::warn;

use interview_core::MessageMetadata;

use crate::models::{Message, MessageRole};
use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// One assistant turn handed to the dashboard aggregator: the bot it
/// belongs to and its raw metadata blob. Content is deliberately absent;
/// the aggregator never inspects conversation text.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub bot_id: String,
    pub metadata: serde_json::Value,
}

/// A windowed slice of assistant turns, with a truncation signal when the
/// window held more rows than the cap.
#[derive(Debug, Clone)]
pub struct AssistantTurnSlice {
    pub turns: Vec<AssistantTurn>,
    pub truncated: bool,
}

/// SQLite-backed message store
#[derive(Clone)]
pub struct MessageStore {
    pool: DbPool,
}

impl MessageStore {
    /// Create a store from an existing connection pool
    pub fn from_pool(pool: DbPool) -> AppResult<Self> {
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) the store at a file path
    pub fn new(path: &std::path::Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::database(format!("Failed to create database directory: {}", e))
            })?;
        }
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;
        Self::from_pool(pool)
    }

    /// Create an in-memory store with the production schema, for tests
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;
        Self::from_pool(pool)
    }

    fn init_schema(&self) -> AppResult<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                bot_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages (conversation_id, created_at)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_role_created
             ON messages (role, created_at)",
            [],
        )?;

        Ok(())
    }

    fn connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Append one finalized message. Rows are atomic and complete: the
    /// metadata blob is serialized in full before the insert.
    pub fn append_message(&self, message: &Message) -> AppResult<()> {
        let metadata = serde_json::to_string(&message.metadata)?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO messages (id, conversation_id, bot_id, role, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.conversation_id,
                message.bot_id,
                message.role.as_str(),
                message.content,
                metadata,
                message.created_at,
            ],
        )?;
        Ok(())
    }

    /// Messages of one conversation, oldest first
    pub fn get_conversation_messages(&self, conversation_id: &str) -> AppResult<Vec<Message>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, bot_id, role, content, metadata, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let messages = stmt
            .query_map(params![conversation_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(
                |(id, conversation_id, bot_id, role, content, metadata, created_at)| Message {
                    id,
                    conversation_id,
                    bot_id,
                    role: MessageRole::from_str(&role),
                    content,
                    metadata: parse_metadata(&metadata),
                    created_at,
                },
            )
            .collect();

        Ok(messages)
    }

    /// Assistant turns within `[since, until)`, newest first, capped at
    /// `max_turns`. The truncation flag tells the aggregator its window
    /// was incomplete.
    pub fn fetch_assistant_turns(
        &self,
        since: &str,
        until: &str,
        max_turns: u32,
    ) -> AppResult<AssistantTurnSlice> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT bot_id, metadata
             FROM messages
             WHERE role = 'assistant' AND created_at >= ?1 AND created_at < ?2
             ORDER BY created_at DESC
             LIMIT ?3",
        )?;

        // Fetch one extra row to detect truncation
        let fetch_limit = i64::from(max_turns) + 1;
        let mut turns = stmt
            .query_map(params![since, until, fetch_limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(bot_id, metadata)| AssistantTurn {
                bot_id,
                metadata: serde_json::from_str(&metadata)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect::<Vec<_>>();

        let truncated = turns.len() > max_turns as usize;
        turns.truncate(max_turns as usize);

        Ok(AssistantTurnSlice { turns, truncated })
    }
}

/// Stored metadata blobs are not trusted: a corrupt one degrades to empty
/// metadata rather than failing the read.
fn parse_metadata(raw: &str) -> MessageMetadata {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Corrupt message metadata, using defaults");
        MessageMetadata::default()
    })
}
