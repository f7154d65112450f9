use serde::{Deserialize, Serialize};

use crate::models::{Article, Comment, Session, User};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The session id doubles as the bearer token for subsequent requests.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session: Session,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

// -- Articles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateArticleRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub success: bool,
    pub article: Article,
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub success: bool,
    pub count: i64,
    pub articles: Vec<Article>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub success: bool,
    pub comments: Vec<Comment>,
}

// -- Envelopes --

/// Generic `{success, message}` body for mutations that only acknowledge.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Generic `{success: false, error}` body for request-level failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
