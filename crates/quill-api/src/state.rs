use std::sync::Arc;

use argon2::Argon2;
use quill_db::Database;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Configured once at startup; cost factors come from the environment.
    pub argon2: Argon2<'static>,
}

/// Run a blocking database closure off the async runtime. Failures are
/// logged here and surface as a bare internal error.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            error!("Database error: {:#}", e);
            ApiError::Internal
        })
}
