//! Row types read straight out of SQLite, kept separate from the quill-types
//! API models: rows hold timestamps as stored text and carry the password
//! hash, which never leaves this crate.

use chrono::{DateTime, SecondsFormat, Utc};
use quill_types::models::{Article, Comment, Session, User};
use tracing::warn;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub expires_at: String,
}

pub struct ArticleRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub published_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub article_id: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: parse_timestamp(&self.created_at, "users.created_at"),
        }
    }
}

impl SessionRow {
    pub fn into_session(self) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            // A corrupt expiry parses to the epoch, so the session reads as
            // long expired rather than as valid.
            expires_at: parse_timestamp(&self.expires_at, "sessions.expires_at"),
        }
    }
}

impl ArticleRow {
    pub fn into_article(self) -> Article {
        Article {
            id: self.id,
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            published_at: parse_timestamp(&self.published_at, "articles.published_at"),
        }
    }
}

impl CommentRow {
    pub fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            content: self.content,
            author_id: self.author_id,
            article_id: self.article_id,
            created_at: parse_timestamp(&self.created_at, "comments.created_at"),
        }
    }
}

/// Timestamps are stored as RFC 3339 UTC with fixed microsecond width so that
/// lexicographic order in SQL matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, column: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", column, raw, e);
        DateTime::default()
    })
}
