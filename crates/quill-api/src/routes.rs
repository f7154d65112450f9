use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;
use crate::{articles, auth, comments, users};

/// Build the full application router. Protected handlers run the access
/// guard themselves, so public and protected methods can share a path.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/logout/{id}", get(auth::logout_by_id))
        .route("/user/{id}", get(users::get_user))
        .route("/user", delete(users::delete_user))
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(articles::get_article)
                .patch(articles::update_article)
                .delete(articles::delete_article),
        )
        // One pattern serves both shapes: list/create read {id} as an
        // article id, delete reads it as a comment id.
        .route(
            "/comments/{id}",
            get(comments::list_comments)
                .post(comments::create_comment)
                .delete(comments::delete_comment),
        )
        .with_state(state);

    Router::new().route("/health", get(health)).nest("/api", api)
}

async fn health() -> &'static str {
    "ok"
}
