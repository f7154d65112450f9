use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use quill_db::queries::CommentDelete;
use quill_types::api::{CommentListResponse, CreateCommentRequest, ErrorResponse, MessageResponse};

use crate::error::ApiError;
use crate::guard;
use crate::state::{AppState, run_db};
use crate::validation;

/// GET /api/comments/{article_id} — public, in creation order. An unknown
/// article simply has no comments.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| db.list_comments(&article_id)).await?;

    let comments = rows.into_iter().map(|row| row.into_comment()).collect();

    Ok(Json(CommentListResponse {
        success: true,
        comments,
    }))
}

/// POST /api/comments/{article_id} — comment under the caller's identity.
/// There is no existence pre-check on the article; a bad id fails on the
/// foreign key and surfaces as an internal error.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;
    validation::comment_content(&req.content)?;

    let id = Uuid::new_v4().to_string();
    let author_id = auth.user.id;
    run_db(&state, move |db| {
        db.create_comment(&id, &req.content, &author_id, &article_id, Utc::now())
    })
    .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Comment has been successfully created".to_string(),
    }))
}

/// DELETE /api/comments/{id} — allowed for the comment's author and for the
/// author of the parent article (moderation). Anyone else gets the same
/// response as a missing comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;

    let requester_id = auth.user.id;
    let outcome = run_db(&state, move |db| db.delete_comment(&id, &requester_id)).await?;

    match outcome {
        CommentDelete::Deleted => Ok(Json(MessageResponse {
            success: true,
            message: "Comment has been successfully deleted".to_string(),
        })
        .into_response()),
        CommentDelete::NotFound | CommentDelete::Forbidden => Ok(Json(ErrorResponse {
            success: false,
            error: "Comment not found".to_string(),
        })
        .into_response()),
    }
}
