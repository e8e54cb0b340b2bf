//! # ra-source-demo
//!
//! Offline `ContentSource` that fabricates a fixed two-post thread for any id.
//! Handy for exercising watches and the API without network access.

use async_trait::async_trait;
use chrono::Utc;
use ra_core::error::Result;
use ra_core::models::{Post, Thread, ThreadSummary};
use ra_core::traits::ContentSource;

const DEFAULT_PAGE_SIZE: i64 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct DemoSource;

impl DemoSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentSource for DemoSource {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn fetch_thread(&self, board: &str, thread_id: &str) -> Result<Thread> {
        let now = Utc::now();
        Ok(Thread::new(thread_id, board).with_posts(vec![
            Post::new("1", "Hello, archive!", now).with_author("anon"),
            Post::new("2", "This is a demo thread.", now).with_author("anon"),
        ]))
    }

    async fn fetch_board(&self, board: &str, limit: i64) -> Result<Vec<ThreadSummary>> {
        let limit = if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit };
        Ok((1..=limit)
            .map(|i| ThreadSummary::new(format!("{board}-{i}"), board))
            .collect())
    }
}
