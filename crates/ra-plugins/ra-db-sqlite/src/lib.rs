//! # ra-db-sqlite Implementation
//!
//! Durable `ThreadStore` on SQLite. Images, replies and metadata are stored
//! as JSON text columns rather than normalized tables.
//!
//! # Developer Note
//! One transaction per `save_thread`. Its first statement is the thread
//! upsert, a write, so SQLite takes the write lock before anything is read
//! and concurrent savers queue on `busy_timeout` instead of racing. Posts go
//! in with `ON CONFLICT DO NOTHING`; there is no read-then-insert step.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ra_core::error::{AppError, Result};
use ra_core::models::{Post, Thread};
use ra_core::traits::ThreadStore;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteThreadStore {
    pool: SqlitePool,
}

impl SqliteThreadStore {
    /// Opens (creating if needed) a database file in WAL mode and runs migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        info!(path = %path.as_ref().display(), "sqlite store opened");
        Self::with_pool(pool).await
    }

    /// A private in-memory database. The pool is pinned to a single
    /// connection that never expires, since each connection would otherwise
    /// see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage_error)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool and brings its schema up to date.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("migration failed: {e}")))?;
        Ok(Self { pool })
    }
}

/// Maps driver errors onto the storage part of the error taxonomy.
fn storage_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db)
            if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) =>
        {
            AppError::ConstraintViolation(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            AppError::Serialization(err.to_string())
        }
        _ => AppError::StorageUnavailable(err.to_string()),
    }
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: String,
    board: String,
    sticky: bool,
    closed: bool,
    metadata: String,
    updated_at: DateTime<Utc>,
}

impl ThreadRow {
    fn into_thread(self) -> Result<Thread> {
        let mut thread = Thread::new(self.id, self.board);
        thread.sticky = self.sticky;
        thread.closed = self.closed;
        thread.metadata = serde_json::from_str(&self.metadata)?;
        thread.updated_at = Some(self.updated_at);
        Ok(thread)
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    author: Option<String>,
    content: String,
    ts: DateTime<Utc>,
    images: String,
    replies: String,
    metadata: String,
}

impl PostRow {
    fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: self.id,
            author: self.author,
            content: self.content,
            timestamp: self.ts,
            images: serde_json::from_str(&self.images)?,
            replies: serde_json::from_str(&self.replies)?,
            metadata: serde_json::from_str(&self.metadata)?,
        })
    }
}

#[async_trait]
impl ThreadStore for SqliteThreadStore {
    async fn save_thread(&self, thread: &Thread) -> Result<usize> {
        let metadata = serde_json::to_string(&thread.metadata)?;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // 1. Upsert thread attributes (last write wins)
        sqlx::query(
            "INSERT INTO threads (id, board, sticky, closed, metadata, updated_at) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET board = excluded.board, sticky = excluded.sticky,
                 closed = excluded.closed, metadata = excluded.metadata, updated_at = excluded.updated_at",
        )
        .bind(&thread.id)
        .bind(&thread.board)
        .bind(thread.sticky)
        .bind(thread.closed)
        .bind(metadata)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        // 2. Insert posts not seen before; existing rows are never touched
        let mut inserted = 0;
        for post in &thread.posts {
            let result = sqlx::query(
                "INSERT INTO posts (id, thread_id, author, content, ts, images, replies, metadata)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id, thread_id) DO NOTHING",
            )
            .bind(&post.id)
            .bind(&thread.id)
            .bind(&post.author)
            .bind(&post.content)
            .bind(post.timestamp)
            .bind(serde_json::to_string(&post.images)?)
            .bind(serde_json::to_string(&post.replies)?)
            .bind(serde_json::to_string(&post.metadata)?)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(storage_error)?;
        debug!(thread_id = %thread.id, new_posts = inserted, "thread merged");
        Ok(inserted)
    }

    async fn get_thread(&self, id: &str) -> Result<Thread> {
        let row = sqlx::query_as::<_, ThreadRow>(
            "SELECT id, board, sticky, closed, metadata, updated_at FROM threads WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| AppError::thread_not_found(id))?;

        let mut thread = row.into_thread()?;
        thread.posts = sqlx::query_as::<_, PostRow>(
            "SELECT id, author, content, ts, images, replies, metadata FROM posts
             WHERE thread_id = ? ORDER BY ts ASC, rowid ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(PostRow::into_post)
        .collect::<Result<Vec<_>>>()?;
        // ts is stored as text; re-sort on the parsed value to be exact
        thread.sort_posts();
        Ok(thread)
    }

    async fn list_threads(&self, board: &str) -> Result<Vec<Thread>> {
        sqlx::query_as::<_, ThreadRow>(
            "SELECT id, board, sticky, closed, metadata, updated_at FROM threads
             WHERE board = ? ORDER BY updated_at DESC",
        )
        .bind(board)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(ThreadRow::into_thread)
        .collect()
    }
}
