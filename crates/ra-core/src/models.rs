//! # Content Model
//!
//! These structs are the shared shape passed between content sources, the
//! archiver and the thread stores. Identifiers are the upstream source's own
//! strings (e.g. 4chan post numbers), never generated locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open-ended JSON object attached to threads, posts and images.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An attachment embedded by value inside a [`Post`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Content hash as published by the source (base64 MD5 on 4chan)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Image {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            thumbnail: None,
            md5: None,
            metadata: Metadata::new(),
        }
    }
}

/// A single post. Immutable once stored under a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Free text, may contain source-specific markup
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    /// Ids of the posts this one quotes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author: None,
            content: content.into(),
            timestamp,
            images: Vec::new(),
            replies: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// The current known state of one discussion topic.
///
/// Identity is `id` alone: the stores key threads by id regardless of board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub board: String,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Maintained by the store on every save; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Thread {
    pub fn new(id: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board: board.into(),
            posts: Vec::new(),
            sticky: false,
            closed: false,
            metadata: Metadata::new(),
            updated_at: None,
        }
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    /// Orders posts chronologically. Posts with equal timestamps keep their
    /// relative order.
    pub fn sort_posts(&mut self) {
        self.posts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    /// A copy of the thread-level attributes without any posts.
    pub fn header(&self) -> Thread {
        Thread {
            id: self.id.clone(),
            board: self.board.clone(),
            posts: Vec::new(),
            sticky: self.sticky,
            closed: self.closed,
            metadata: self.metadata.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// A catalog entry returned by [`crate::ContentSource::fetch_board`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub board: String,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl ThreadSummary {
    pub fn new(id: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board: board.into(),
            sticky: false,
            closed: false,
            metadata: Metadata::new(),
        }
    }
}
