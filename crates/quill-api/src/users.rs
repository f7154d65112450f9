use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use tracing::info;

use quill_types::api::{MessageResponse, UserResponse};

use crate::error::ApiError;
use crate::guard;
use crate::state::{AppState, run_db};

/// GET /api/user/{id} — public profile subset. No authentication required.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(UserResponse {
        success: true,
        user: row.into_user(),
    }))
}

/// DELETE /api/user — delete the caller's account along with every session,
/// article and comment it owns.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;

    let user_id = auth.user.id.clone();
    run_db(&state, move |db| db.delete_user(&user_id)).await?;

    info!("User {} deleted their account", auth.user.id);
    Ok(Json(MessageResponse {
        success: true,
        message: "User has been successfully deleted".to_string(),
    }))
}
