use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            -- Uniqueness must hold case-insensitively at the storage layer,
            -- not just in application checks.
            CREATE UNIQUE INDEX idx_users_email ON users (lower(email));

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE articles (
                id            TEXT PRIMARY KEY,
                title         TEXT NOT NULL,
                content       TEXT NOT NULL,
                author_id     TEXT NOT NULL REFERENCES users(id),
                published_at  TEXT NOT NULL
            );

            CREATE INDEX idx_articles_published ON articles(published_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                content     TEXT NOT NULL,
                author_id   TEXT NOT NULL REFERENCES users(id),
                article_id  TEXT NOT NULL REFERENCES articles(id),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_article ON comments(article_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
