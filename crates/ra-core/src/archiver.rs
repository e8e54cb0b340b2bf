//! # Archiver
//!
//! Owns the set of active watches and runs the loop that periodically
//! re-fetches them.
//!
//! ```text
//! run() ── every tick ──► scan watches (read lock, no I/O)
//!                              │ due? (elapsed since last fire >= every)
//!                              └─► tokio::spawn: source.fetch_thread ─► store.save_thread
//! ```
//!
//! The loop never waits for a fetch. A slow fetch can overlap the next one for
//! the same watch; that is safe because `ThreadStore::save_thread` merges
//! idempotently under concurrent writers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::error::{AppError, Result};
use crate::models::Thread;
use crate::registry::SourceRegistry;
use crate::traits::ThreadStore;

/// Period of the scheduling tick.
pub const DEFAULT_TICK: Duration = Duration::from_secs(2);

/// A standing intent to re-fetch one thread from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub source: String,
    pub board: String,
    pub thread_id: String,
    /// Minimum time between two fetches. Zero fires on every tick.
    #[serde(with = "crate::interval::serde_interval")]
    pub every: Duration,
}

impl Watch {
    pub fn new(
        source: impl Into<String>,
        board: impl Into<String>,
        thread_id: impl Into<String>,
        every: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            board: board.into(),
            thread_id: thread_id.into(),
            every,
        }
    }

    pub fn key(&self) -> WatchKey {
        WatchKey {
            source: self.source.clone(),
            board: self.board.clone(),
            thread_id: self.thread_id.clone(),
        }
    }
}

/// Registry key: the `source|board|thread_id` triple. The interval is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub source: String,
    pub board: String,
    pub thread_id: String,
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.source, self.board, self.thread_id)
    }
}

/// Outcome of [`Archiver::scan_board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub saved: usize,
}

pub struct Archiver {
    store: Arc<dyn ThreadStore>,
    sources: SourceRegistry,
    watches: RwLock<HashMap<WatchKey, Watch>>,
    tick: Duration,
}

impl Archiver {
    pub fn new(store: Arc<dyn ThreadStore>, sources: SourceRegistry) -> Self {
        Self {
            store,
            sources,
            watches: RwLock::new(HashMap::new()),
            tick: DEFAULT_TICK,
        }
    }

    /// Overrides the scheduling tick (clamped to at least 1ms).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Inserts or replaces the watch with the same key. Visible to the next tick.
    pub async fn add_watch(&self, watch: Watch) {
        info!(key = %watch.key(), every = ?watch.every, "watch registered");
        self.watches.write().await.insert(watch.key(), watch);
    }

    /// Removes the watch with the same key. Returns `false` if there was none.
    pub async fn remove_watch(&self, watch: &Watch) -> bool {
        let removed = self.watches.write().await.remove(&watch.key()).is_some();
        if removed {
            info!(key = %watch.key(), "watch removed");
        }
        removed
    }

    /// Snapshot of all registered watches, in no particular order.
    pub async fn list_watches(&self) -> Vec<Watch> {
        self.watches.read().await.values().cloned().collect()
    }

    /// Runs the scheduling loop until `shutdown` is cancelled.
    ///
    /// In-flight fetches are not awaited on shutdown; they run to completion
    /// on their own and still persist their result.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_fired: HashMap<WatchKey, Instant> = HashMap::new();

        info!(tick = ?self.tick, "archiver started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("archiver stopped");
                    return;
                }
                now = ticker.tick() => {
                    let due = {
                        let watches = self.watches.read().await;
                        collect_due(&watches, &mut last_fired, now)
                    };
                    for watch in due {
                        self.dispatch(watch);
                    }
                }
            }
        }
    }

    fn dispatch(&self, watch: Watch) {
        let store = Arc::clone(&self.store);
        let sources = self.sources.clone();
        let span = tracing::info_span!(
            "archive_fetch",
            source = %watch.source,
            board = %watch.board,
            thread_id = %watch.thread_id,
        );
        tokio::spawn(
            async move {
                let outcome = fetch_and_save(
                    store.as_ref(),
                    &sources,
                    &watch.source,
                    &watch.board,
                    &watch.thread_id,
                )
                .await;
                match outcome {
                    Ok((_, new_posts)) => debug!(new_posts, "watch refreshed"),
                    Err(err @ AppError::UnknownSource(_)) => {
                        error!(error = %err, "watch names an unregistered source")
                    }
                    Err(err) => warn!(error = %err, "watch refresh failed"),
                }
            }
            .instrument(span),
        );
    }

    /// Fetches one thread and saves it right away, returning what was fetched.
    ///
    /// An unknown source fails with `UnknownSource` before any network call.
    pub async fn fetch_now(&self, source: &str, board: &str, thread_id: &str) -> Result<Thread> {
        let (thread, new_posts) =
            fetch_and_save(self.store.as_ref(), &self.sources, source, board, thread_id).await?;
        info!(source, board, thread_id, new_posts, "thread fetched");
        Ok(thread)
    }

    /// Fetches a board's catalog, saves each full thread, and optionally
    /// registers a watch per catalog entry.
    ///
    /// Failures on individual threads are logged and leave them out of `saved`.
    pub async fn scan_board(
        &self,
        source: &str,
        board: &str,
        limit: i64,
        watch_every: Option<Duration>,
    ) -> Result<ScanReport> {
        let content = self.sources.get(source)?;
        let summaries = content.fetch_board(board, limit).await?;

        let mut saved = 0;
        for summary in &summaries {
            match content.fetch_thread(board, &summary.id).await {
                Ok(thread) => match self.store.save_thread(&thread).await {
                    Ok(_) => saved += 1,
                    Err(err) => {
                        let thread_id = summary.id.as_str();
                        warn!(source, board, thread_id, error = %err, "scan save failed")
                    }
                },
                Err(err) => {
                    warn!(source, board, thread_id = %summary.id, error = %err, "scan fetch failed")
                }
            }
            if let Some(every) = watch_every {
                self.add_watch(Watch::new(source, board, summary.id.clone(), every))
                    .await;
            }
        }

        let report = ScanReport {
            scanned: summaries.len(),
            saved,
        };
        info!(source, board, scanned = report.scanned, saved = report.saved, "board scanned");
        Ok(report)
    }
}

async fn fetch_and_save(
    store: &dyn ThreadStore,
    sources: &SourceRegistry,
    source: &str,
    board: &str,
    thread_id: &str,
) -> Result<(Thread, usize)> {
    let content = sources.get(source)?;
    let thread = content.fetch_thread(board, thread_id).await?;
    let new_posts = store.save_thread(&thread).await?;
    Ok((thread, new_posts))
}

/// Picks the watches due at `now` and records them as fired.
///
/// Bookkeeping for keys no longer registered is dropped, so a watch that is
/// removed and registered again is due on first sight.
fn collect_due(
    watches: &HashMap<WatchKey, Watch>,
    last_fired: &mut HashMap<WatchKey, Instant>,
    now: Instant,
) -> Vec<Watch> {
    last_fired.retain(|key, _| watches.contains_key(key));

    let mut due = Vec::new();
    for (key, watch) in watches {
        let is_due = match last_fired.get(key) {
            Some(last) => now.saturating_duration_since(*last) >= watch.every,
            None => true,
        };
        if is_due {
            last_fired.insert(key.clone(), now);
            due.push(watch.clone());
        }
    }
    due
}
