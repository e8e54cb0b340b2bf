//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Thread, ThreadSummary};

/// Persistence contract for archived threads.
///
/// # Delta merge
/// Sources always return the full current state of a thread, so
/// `save_thread` derives the delta itself:
/// - thread attributes (board, sticky, closed, metadata) are overwritten,
///   last write wins, and `updated_at` is refreshed;
/// - a post whose `(id, thread_id)` is unknown is inserted as-is;
/// - a post that already exists is left untouched, even if the incoming copy
///   differs.
///
/// Implementations must stay correct when several saves for the same thread
/// id run concurrently, and a save either commits fully or fails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Merges `thread` into the store and returns how many posts were new.
    async fn save_thread(&self, thread: &Thread) -> Result<usize>;

    /// Full thread with posts in chronological order, or `AppError::NotFound`.
    async fn get_thread(&self, id: &str) -> Result<Thread>;

    /// Thread headers (no posts) for a board, most recently updated first.
    async fn list_threads(&self, board: &str) -> Result<Vec<Thread>>;
}

/// A pluggable provider of thread and catalog data from one external origin.
///
/// Implementations are expected to bound their own network calls; the
/// archiver applies no timeout of its own.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Registry key, e.g. `"4chan"`.
    fn name(&self) -> &'static str;

    /// Current full state of one thread.
    async fn fetch_thread(&self, board: &str, thread_id: &str) -> Result<Thread>;

    /// Catalog summaries for a board. `limit <= 0` means the source's default page size.
    async fn fetch_board(&self, board: &str, limit: i64) -> Result<Vec<ThreadSummary>>;
}
