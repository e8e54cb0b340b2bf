//! Wire types of the 4chan read-only JSON API and their mapping onto the
//! content model.

use chrono::{DateTime, Utc};
use ra_core::error::{AppError, Result};
use ra_core::models::{Image, Metadata, Post, Thread, ThreadSummary};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    #[serde(default)]
    posts: Vec<ApiPost>,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    no: i64,
    time: i64,
    #[serde(default)]
    name: Option<String>,
    /// Comment HTML
    #[serde(default)]
    com: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    trip: Option<String>,
    #[serde(default)]
    capcode: Option<String>,
    /// Upload timestamp, doubles as the media file id
    #[serde(default)]
    tim: Option<i64>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    fsize: Option<i64>,
    #[serde(default)]
    w: Option<i64>,
    #[serde(default)]
    h: Option<i64>,
    #[serde(default)]
    sticky: Option<i64>,
    #[serde(default)]
    closed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    threads: Vec<CatalogThread>,
}

#[derive(Debug, Deserialize)]
struct CatalogThread {
    no: i64,
    #[serde(default)]
    last_modified: Option<i64>,
    #[serde(default)]
    sticky: Option<i64>,
    #[serde(default)]
    closed: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    replies: Option<i64>,
}

fn flag(value: Option<i64>) -> bool {
    value == Some(1)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::Source(format!("invalid post time {secs}")))
}

/// Parses `/{board}/thread/{id}.json`.
pub fn parse_thread(board: &str, thread_id: &str, media_base: &str, body: &str) -> Result<Thread> {
    let response: ThreadResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Source(format!("malformed thread JSON: {e}")))?;

    let mut thread = Thread::new(thread_id, board);
    if let Some(op) = response.posts.first() {
        thread.sticky = flag(op.sticky);
        thread.closed = flag(op.closed);
        if let Some(subject) = &op.sub {
            thread.metadata.insert("subject".into(), json!(subject));
        }
    }

    thread.posts = response
        .posts
        .into_iter()
        .map(|p| convert_post(board, media_base, p))
        .collect::<Result<_>>()?;
    Ok(thread)
}

fn convert_post(board: &str, media_base: &str, p: ApiPost) -> Result<Post> {
    let content = p.com.unwrap_or_default();
    let mut post = Post::new(p.no.to_string(), content, timestamp(p.time)?);
    post.author = p.name;
    post.replies = quoted_ids(&post.content);

    let mut metadata = Metadata::new();
    if let Some(trip) = p.trip {
        metadata.insert("trip".into(), json!(trip));
    }
    if let Some(capcode) = p.capcode {
        metadata.insert("capcode".into(), json!(capcode));
    }
    post.metadata = metadata;

    if let (Some(tim), Some(ext)) = (p.tim, p.ext.filter(|e| !e.is_empty())) {
        let mut image = Image::new(format!("{media_base}/{board}/{tim}{ext}"));
        image.thumbnail = Some(format!("{media_base}/{board}/{tim}s.jpg"));
        image.md5 = p.md5;
        if let Some(filename) = p.filename {
            image.metadata.insert("filename".into(), json!(format!("{filename}{ext}")));
        }
        for (key, value) in [("fsize", p.fsize), ("w", p.w), ("h", p.h)] {
            if let Some(value) = value {
                image.metadata.insert(key.into(), json!(value));
            }
        }
        post.images.push(image);
    }
    Ok(post)
}

/// Post numbers referenced by same-thread quote links (`href="#p123"`), in
/// order of first appearance. Cross-thread links (`/g/thread/1#p2`) are skipped.
pub fn quoted_ids(html: &str) -> Vec<String> {
    let selector = match Selector::parse(r##"a[href^="#p"]"##) {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    let fragment = Html::parse_fragment(html);
    let mut ids: Vec<String> = Vec::new();
    for href in fragment.select(&selector).filter_map(|el| el.value().attr("href")) {
        let id = &href[2..];
        let numeric = !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
        if numeric && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Parses `/{board}/catalog.json`; `limit > 0` caps the number of entries.
pub fn parse_catalog(board: &str, limit: i64, body: &str) -> Result<Vec<ThreadSummary>> {
    let pages: Vec<CatalogPage> = serde_json::from_str(body)
        .map_err(|e| AppError::Source(format!("malformed catalog JSON: {e}")))?;

    let cap = if limit > 0 { limit as usize } else { usize::MAX };
    Ok(pages
        .into_iter()
        .flat_map(|page| page.threads)
        .take(cap)
        .map(|t| {
            let mut summary = ThreadSummary::new(t.no.to_string(), board);
            summary.sticky = flag(t.sticky);
            summary.closed = flag(t.closed);
            if let Some(last_modified) = t.last_modified {
                summary.metadata.insert("last_modified".into(), json!(last_modified));
            }
            if let Some(subject) = t.sub {
                summary.metadata.insert("subject".into(), json!(subject));
            }
            if let Some(replies) = t.replies {
                summary.metadata.insert("replies".into(), json!(replies));
            }
            summary
        })
        .collect())
}
