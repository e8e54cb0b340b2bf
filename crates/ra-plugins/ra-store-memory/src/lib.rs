//! # ra-store-memory
//!
//! Volatile implementation of `ThreadStore`. Everything lives in one map
//! behind a reader/writer lock; a save holds the write lock for the whole
//! merge, so concurrent saves of the same thread serialize and none is lost.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use ra_core::error::{AppError, Result};
use ra_core::models::{Post, Thread};
use ra_core::traits::ThreadStore;
use tokio::sync::RwLock;
use tracing::debug;

/// Stored form of a thread: header fields plus posts with an id index.
struct StoredThread {
    header: Thread,
    posts: Vec<Post>,
    post_ids: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<String, StoredThread>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn save_thread(&self, thread: &Thread) -> Result<usize> {
        let mut threads = self.threads.write().await;
        let stored = threads
            .entry(thread.id.clone())
            .or_insert_with(|| StoredThread {
                header: thread.header(),
                posts: Vec::new(),
                post_ids: HashSet::new(),
            });

        // Thread attributes: last write wins.
        stored.header = thread.header();
        stored.header.updated_at = Some(Utc::now());

        let mut inserted = 0;
        for post in &thread.posts {
            if stored.post_ids.insert(post.id.clone()) {
                stored.posts.push(post.clone());
                inserted += 1;
            }
        }
        debug!(thread_id = %thread.id, new_posts = inserted, "thread merged");
        Ok(inserted)
    }

    async fn get_thread(&self, id: &str) -> Result<Thread> {
        let threads = self.threads.read().await;
        let stored = threads
            .get(id)
            .ok_or_else(|| AppError::thread_not_found(id))?;

        let mut thread = stored.header.clone();
        thread.posts = stored.posts.clone();
        thread.sort_posts();
        Ok(thread)
    }

    async fn list_threads(&self, board: &str) -> Result<Vec<Thread>> {
        let threads = self.threads.read().await;
        let mut out: Vec<Thread> = threads
            .values()
            .filter(|stored| stored.header.board == board)
            .map(|stored| stored.header.clone())
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn post(id: &str, content: &str, secs: i64) -> Post {
        Post::new(id, content, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[tokio::test]
    async fn test_delta_absorption_keeps_first_content() {
        let store = MemoryThreadStore::new();
        let first =
            Thread::new("1", "g").with_posts(vec![post("a", "first", 1), post("b", "b", 2)]);
        assert_eq!(store.save_thread(&first).await.unwrap(), 2);

        let second = Thread::new("1", "g").with_posts(vec![
            post("a", "edited", 1),
            post("b", "b", 2),
            post("c", "c", 3),
        ]);
        assert_eq!(store.save_thread(&second).await.unwrap(), 1);

        let stored = store.get_thread("1").await.unwrap();
        let ids: Vec<&str> = stored.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(stored.posts[0].content, "first");
    }

    #[tokio::test]
    async fn test_attributes_last_write_wins() {
        let store = MemoryThreadStore::new();
        store.save_thread(&Thread::new("1", "g")).await.unwrap();

        let mut update = Thread::new("1", "g");
        update.sticky = true;
        update.closed = true;
        update.metadata.insert("subject".into(), serde_json::json!("pinned"));
        store.save_thread(&update).await.unwrap();

        let stored = store.get_thread("1").await.unwrap();
        assert!(stored.sticky && stored.closed);
        assert_eq!(stored.metadata["subject"], "pinned");
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = MemoryThreadStore::new();
        assert!(matches!(
            store.get_thread("nope").await,
            Err(AppError::NotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_list_threads_filters_by_board_without_posts() {
        let store = MemoryThreadStore::new();
        store
            .save_thread(&Thread::new("1", "g").with_posts(vec![post("a", "", 1)]))
            .await
            .unwrap();
        store.save_thread(&Thread::new("2", "v")).await.unwrap();

        let listed = store.list_threads("g").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "1");
        assert!(listed[0].posts.is_empty());
        assert!(store.list_threads("x").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_lose_nothing() {
        let store = Arc::new(MemoryThreadStore::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let thread = Thread::new("1", "g")
                        .with_posts(vec![post("op", "op", 0), post(&format!("p{i}"), "", i)]);
                    store.save_thread(&thread).await.unwrap()
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            inserted += handle.await.unwrap();
        }
        assert_eq!(inserted, 33);
        assert_eq!(store.get_thread("1").await.unwrap().posts.len(), 33);
    }
}
