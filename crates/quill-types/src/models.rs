use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public user profile. The password hash never leaves the database layer —
/// this type is what handlers see and what goes on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A login session. The `id` is the opaque bearer token itself; a session is
/// valid only while `expires_at` is in the future and the row still exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Serialized rich-text document. Opaque to the server.
    pub content: String,
    pub author_id: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub article_id: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity resolved from a bearer token, passed explicitly
/// into every protected handler.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub session: Session,
}
