use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use quill_types::api::{
    ArticleListResponse, ArticleResponse, CreateArticleRequest, ErrorResponse, MessageResponse,
    UpdateArticleRequest,
};

use crate::error::ApiError;
use crate::guard;
use crate::state::{AppState, run_db};
use crate::validation;

/// Raw query strings; [`validation::page`] owns the parsing so that a bad
/// value gets the same envelope as any other validation failure.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GET /api/articles — public listing, newest first, plus an independently
/// computed total.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = validation::page(query.limit.as_deref(), query.offset.as_deref())?;

    let rows = run_db(&state, move |db| db.list_articles(limit, offset)).await?;
    let count = run_db(&state, |db| db.count_articles()).await?;

    let articles = rows.into_iter().map(|row| row.into_article()).collect();

    Ok(Json(ArticleListResponse {
        success: true,
        count,
        articles,
    }))
}

/// GET /api/articles/{id} — public fetch.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| db.get_article(&id))
        .await?
        .ok_or(ApiError::NotFound("Article not found"))?;

    Ok(Json(ArticleResponse {
        success: true,
        article: row.into_article(),
    }))
}

/// POST /api/articles — publish under the caller's identity.
pub async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;
    validation::article_title(&req.title)?;
    validation::article_content(&req.content)?;

    let id = Uuid::new_v4().to_string();
    let author_id = auth.user.id;
    run_db(&state, move |db| {
        db.create_article(&id, &req.title, &req.content, &author_id, Utc::now())
    })
    .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Article has been successfully created".to_string(),
    }))
}

/// PATCH /api/articles/{id} — owner only. A missing article and someone
/// else's article produce the same response.
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateArticleRequest>,
) -> Result<Response, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;
    validation::article_title(&req.title)?;

    let author_id = auth.user.id;
    let updated = run_db(&state, move |db| {
        db.update_article(&id, &author_id, &req.title, &req.content)
    })
    .await?;

    if !updated {
        return Ok(Json(ErrorResponse {
            success: false,
            error: "Article not found".to_string(),
        })
        .into_response());
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "Article has been successfully edited".to_string(),
    })
    .into_response())
}

/// DELETE /api/articles/{id} — owner only, same conflated miss rule. The
/// article's comments go with it.
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;

    let author_id = auth.user.id;
    let deleted = run_db(&state, move |db| db.delete_article(&id, &author_id)).await?;

    if !deleted {
        return Ok(Json(ErrorResponse {
            success: false,
            error: "Article not found".to_string(),
        })
        .into_response());
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "Article has been successfully deleted".to_string(),
    })
    .into_response())
}
