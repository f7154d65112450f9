use crate::Database;
use crate::models::{ArticleRow, CommentRow, SessionRow, UserRow, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Outcome of a guarded comment deletion. `NotFound` and `Forbidden` are
/// distinct here; the HTTP layer renders them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentDelete {
    Deleted,
    NotFound,
    Forbidden,
}

impl Database {
    // -- Users --

    /// Insert a new user. Returns `false` when the email is already taken:
    /// the unique index on `lower(email)` is what actually closes the signup
    /// race, any application-level existence check is only a fast path.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, email, password_hash, format_timestamp(created_at)],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Delete a user account and everything it owns: sessions, comments under
    /// the user's articles, the user's own comments elsewhere, the articles,
    /// then the user row. One transaction, so a failure partway removes
    /// nothing.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM sessions WHERE user_id = ?1", [id])?;
            tx.execute(
                "DELETE FROM comments
                 WHERE article_id IN (SELECT id FROM articles WHERE author_id = ?1)",
                [id],
            )?;
            tx.execute("DELETE FROM comments WHERE author_id = ?1", [id])?;
            tx.execute("DELETE FROM articles WHERE author_id = ?1", [id])?;
            let rows = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(rows > 0)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (id, user_id, format_timestamp(expires_at)),
            )?;
            Ok(())
        })
    }

    /// Look up a session together with its owning user in one query. Expiry
    /// is not checked here; the caller decides what an expired row means.
    pub fn get_session_with_user(&self, id: &str) -> Result<Option<(SessionRow, UserRow)>> {
        self.with_conn(|conn| query_session_with_user(conn, id))
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let rows = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(rows > 0)
        })
    }

    /// Guarded variant of [`Database::delete_session`]: deletes only when the
    /// session belongs to `user_id`. `false` means "no such owned session",
    /// covering both a foreign session and one already revoked.
    pub fn delete_user_session(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let rows = conn.execute(
                "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(rows > 0)
        })
    }

    // -- Articles --

    pub fn create_article(
        &self,
        id: &str,
        title: &str,
        content: &str,
        author_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO articles (id, title, content, author_id, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, content, author_id, format_timestamp(published_at)],
            )?;
            Ok(())
        })
    }

    pub fn get_article(&self, id: &str) -> Result<Option<ArticleRow>> {
        self.with_conn(|conn| query_article_by_id(conn, id))
    }

    pub fn list_articles(&self, limit: i64, offset: i64) -> Result<Vec<ArticleRow>> {
        self.with_conn(|conn| query_articles_page(conn, limit, offset))
    }

    /// Total article count, computed independently of any page query. Under
    /// concurrent writes the count may not match the page it is served with.
    pub fn count_articles(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
            Ok(n)
        })
    }

    /// The statement itself gates on `id AND author_id`; a zero-row result
    /// covers both "no such article" and "not the author".
    pub fn update_article(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        content: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let rows = conn.execute(
                "UPDATE articles SET title = ?3, content = ?4 WHERE id = ?1 AND author_id = ?2",
                rusqlite::params![id, author_id, title, content],
            )?;
            Ok(rows > 0)
        })
    }

    /// Ownership-gated delete, same conflated zero-row rule as
    /// [`Database::update_article`]. Comments go first in the transaction
    /// (they reference the article), but only when the requester owns it.
    pub fn delete_article(&self, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM comments
                 WHERE article_id = ?1
                   AND EXISTS (SELECT 1 FROM articles WHERE id = ?1 AND author_id = ?2)",
                (id, author_id),
            )?;
            let rows = tx.execute(
                "DELETE FROM articles WHERE id = ?1 AND author_id = ?2",
                (id, author_id),
            )?;
            tx.commit()?;
            Ok(rows > 0)
        })
    }

    // -- Comments --

    /// No existence check on the article: a bad `article_id` fails on the
    /// foreign key and surfaces as an ordinary error.
    pub fn create_comment(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
        article_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, content, author_id, article_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, content, author_id, article_id, format_timestamp(created_at)],
            )?;
            Ok(())
        })
    }

    pub fn list_comments(&self, article_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments_for_article(conn, article_id))
    }

    /// Delete a comment on behalf of `requester_id`. The delete runs first
    /// (RETURNING the ownership columns) so that under concurrent deleters
    /// exactly one caller observes the row; authorization is then decided
    /// from what came back. A requester who is neither the comment's author
    /// nor the article's gets the whole transaction rolled back — the delete
    /// is never observable.
    pub fn delete_comment(&self, id: &str, requester_id: &str) -> Result<CommentDelete> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let deleted: Option<(String, String)> = tx
                .query_row(
                    "DELETE FROM comments WHERE id = ?1 RETURNING author_id, article_id",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((author_id, article_id)) = deleted else {
                return Ok(CommentDelete::NotFound);
            };

            if author_id != requester_id {
                // Moderation override: the article's author may remove any
                // comment under their article.
                let owns_article: Option<String> = tx
                    .query_row(
                        "SELECT id FROM articles WHERE id = ?1 AND author_id = ?2",
                        (article_id.as_str(), requester_id),
                        |row| row.get(0),
                    )
                    .optional()?;

                if owns_article.is_none() {
                    return Ok(CommentDelete::Forbidden);
                }
            }

            tx.commit()?;
            Ok(CommentDelete::Deleted)
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, password, created_at FROM users WHERE lower(email) = lower(?1)",
    )?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, password, created_at FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_session_with_user(conn: &Connection, id: &str) -> Result<Option<(SessionRow, UserRow)>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.user_id, s.expires_at, u.id, u.email, u.password, u.created_at
         FROM sessions s
         JOIN users u ON s.user_id = u.id
         WHERE s.id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok((
                SessionRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    expires_at: row.get(2)?,
                },
                UserRow {
                    id: row.get(3)?,
                    email: row.get(4)?,
                    password: row.get(5)?,
                    created_at: row.get(6)?,
                },
            ))
        })
        .optional()?;

    Ok(row)
}

fn query_article_by_id(conn: &Connection, id: &str) -> Result<Option<ArticleRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, author_id, published_at FROM articles WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ArticleRow {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                author_id: row.get(3)?,
                published_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_articles_page(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<ArticleRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, author_id, published_at
         FROM articles
         ORDER BY published_at DESC
         LIMIT ?1 OFFSET ?2",
    )?;

    let rows = stmt
        .query_map([limit, offset], |row| {
            Ok(ArticleRow {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                author_id: row.get(3)?,
                published_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_comments_for_article(conn: &Connection, article_id: &str) -> Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, author_id, article_id, created_at
         FROM comments
         WHERE article_id = ?1
         ORDER BY created_at",
    )?;

    let rows = stmt
        .query_map([article_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                content: row.get(1)?,
                author_id: row.get(2)?,
                article_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
