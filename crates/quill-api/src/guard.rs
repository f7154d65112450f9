use axum::http::{HeaderMap, header};
use chrono::Utc;
use quill_db::Database;
use quill_types::models::AuthSession;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Gate for protected handlers, called before any other work: resolves the
/// bearer token to its user and session. Missing header, malformed value,
/// unknown token and expired session all collapse to `Unauthorized`.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthSession, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    run_db(state, move |db| resolve_session(db, &token))
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// Look up a bearer token with its owning user. An expired session is
/// deleted on sight — there is no background sweeper — and reads as absent.
pub fn resolve_session(db: &Database, token: &str) -> anyhow::Result<Option<AuthSession>> {
    let Some((session_row, user_row)) = db.get_session_with_user(token)? else {
        return Ok(None);
    };

    let session = session_row.into_session();
    if session.expires_at <= Utc::now() {
        db.delete_session(token)?;
        return Ok(None);
    }

    Ok(Some(AuthSession {
        user: user_row.into_user(),
        session,
    }))
}
