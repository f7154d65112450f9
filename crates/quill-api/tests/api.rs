//! Integration tests: drive the full router in-process, one request at a
//! time, and pin the wire contract — status codes, envelopes, and the
//! ownership rules — end to end against a real temp-file database.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use quill_api::routes::create_router;
use quill_api::state::{AppState, AppStateInner};
use quill_db::Database;

const PASSWORD: &str = "correct-horse-battery";

fn test_app() -> (Router, AppState) {
    let path = std::env::temp_dir().join(format!("quill-api-test-{}.db", Uuid::new_v4()));
    let db = Database::open(&path).unwrap();

    // Minimum argon2 cost so the suite stays fast
    let params = Params::new(8, 1, 1, None).unwrap();
    let state = Arc::new(AppStateInner {
        db,
        argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
    });

    (create_router(state.clone()), state)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Sign up a fresh user and log in; returns (token, user_id).
async fn signup_and_login(app: &Router, email: &str) -> (String, String) {
    let payload = json!({ "email": email, "password": PASSWORD });
    let (status, _) = send(app, request("POST", "/api/signup", None, Some(payload.clone()))).await;
    assert_eq!(status, StatusCode::OK);

    login(app, email).await
}

async fn login(app: &Router, email: &str) -> (String, String) {
    let payload = json!({ "email": email, "password": PASSWORD });
    let (status, body) = send(app, request("POST", "/api/login", None, Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let token = body["session"]["id"].as_str().unwrap().to_string();
    let user_id = body["session"]["userId"].as_str().unwrap().to_string();
    (token, user_id)
}

/// The create endpoint only acknowledges, so the article id comes from the
/// public listing.
async fn create_article(app: &Router, token: &str, title: &str) -> String {
    let payload = json!({ "title": title, "content": "{\"blocks\":[]}" });
    let (status, body) = send(app, request("POST", "/api/articles", Some(token), Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Article has been successfully created");

    let (_, listing) = send(app, request("GET", "/api/articles?limit=100&offset=0", None, None)).await;
    listing["articles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["title"] == title)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_comment(app: &Router, token: &str, article_id: &str, content: &str) -> String {
    let payload = json!({ "content": content });
    let uri = format!("/api/comments/{article_id}");
    let (status, body) = send(app, request("POST", &uri, Some(token), Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment has been successfully created");

    let (_, listing) = send(app, request("GET", &uri, None, None)).await;
    listing["comments"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["content"] == content)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_endpoint_is_public_and_plain() {
    let (app, _) = test_app();

    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn signup_then_login_roundtrip() {
    let (app, _) = test_app();

    let payload = json!({ "email": "Writer@Example.com", "password": PASSWORD });
    let (status, body) = send(&app, request("POST", "/api/signup", None, Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User has been successfully created");

    // Same address in a different casing is already taken
    let dup = json!({ "email": "writer@example.COM", "password": PASSWORD });
    let (status, body) = send(&app, request("POST", "/api/signup", None, Some(dup))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email already in use");

    let (_, user_id) = login(&app, "Writer@Example.com").await;

    // Public profile carries the subset and nothing else
    let (status, body) = send(&app, request("GET", &format!("/api/user/{user_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "Writer@Example.com");
    assert!(body["user"]["createdAt"].is_string());
    assert!(body["user"].get("password").is_none());

    let (status, body) = send(&app, request("GET", "/api/user/no-such-user", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _) = test_app();
    signup_and_login(&app, "real@example.com").await;

    let wrong_password = json!({ "email": "real@example.com", "password": "not-the-password" });
    let (status_a, body_a) = send(&app, request("POST", "/api/login", None, Some(wrong_password))).await;

    let unknown_email = json!({ "email": "ghost@example.com", "password": PASSWORD });
    let (status_b, body_b) = send(&app, request("POST", "/api/login", None, Some(unknown_email))).await;

    assert_eq!(status_a, StatusCode::BAD_REQUEST);
    assert_eq!(status_b, StatusCode::BAD_REQUEST);
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["error"], "Invalid email or password");
}

#[tokio::test]
async fn session_expiry_is_fourteen_days() {
    let (app, _) = test_app();
    signup_and_login(&app, "timer@example.com").await;

    let payload = json!({ "email": "timer@example.com", "password": PASSWORD });
    let (_, body) = send(&app, request("POST", "/api/login", None, Some(payload))).await;

    let expires_at: chrono::DateTime<chrono::Utc> =
        body["session"]["expiresAt"].as_str().unwrap().parse().unwrap();
    let ttl = expires_at - chrono::Utc::now();
    assert!(ttl > chrono::Duration::days(13));
    assert!(ttl <= chrono::Duration::days(14));
}

#[tokio::test]
async fn validation_failures_are_field_scoped() {
    let (app, _) = test_app();
    let (token, _) = signup_and_login(&app, "valid@example.com").await;

    let cases: Vec<(&str, &str, Option<&str>, Value, &str)> = vec![
        (
            "POST",
            "/api/signup",
            None,
            json!({ "email": "not-an-email", "password": PASSWORD }),
            "email",
        ),
        (
            "POST",
            "/api/signup",
            None,
            json!({ "email": "ok@example.com", "password": "short" }),
            "password",
        ),
        (
            "POST",
            "/api/login",
            None,
            json!({ "email": "ok@example.com", "password": "short" }),
            "password",
        ),
        (
            "POST",
            "/api/articles",
            Some(token.as_str()),
            json!({ "title": "t".repeat(256), "content": "x" }),
            "title",
        ),
        (
            "POST",
            "/api/articles",
            Some(token.as_str()),
            json!({ "title": "fine", "content": "" }),
            "content",
        ),
    ];

    for (method, uri, token, payload, field) in cases {
        let (status, body) = send(&app, request(method, uri, token, Some(payload))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} should reject {field}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["field"], field);
    }

    // Paging parameters are validated the same way
    for (query, field) in [
        ("?offset=0", "limit"),
        ("?limit=101&offset=0", "limit"),
        ("?limit=-1&offset=0", "limit"),
        ("?limit=20", "offset"),
        ("?limit=20&offset=-1", "offset"),
    ] {
        let uri = format!("/api/articles{query}");
        let (status, body) = send(&app, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["field"], field);
    }
}

#[tokio::test]
async fn unauthenticated_requests_get_uniform_401() {
    let (app, _) = test_app();

    let attempts = [
        request("GET", "/api/logout", None, None),
        request("GET", "/api/logout", Some("no-such-token"), None),
        request("DELETE", "/api/user", None, None),
        request(
            "POST",
            "/api/articles",
            Some("stale"),
            Some(json!({ "title": "t", "content": "c" })),
        ),
    ];

    for req in attempts {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
    }

    // A non-Bearer scheme is malformed, same envelope
    let basic = Request::builder()
        .method("GET")
        .uri("/api/logout")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, basic).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn logout_revokes_the_bearer_session() {
    let (app, _) = test_app();
    let (token, _) = signup_and_login(&app, "leaver@example.com").await;

    let (status, body) = send(&app, request("GET", "/api/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    // The token is dead from here on
    let (status, body) = send(&app, request("GET", "/api/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn logout_by_id_only_touches_owned_sessions() {
    let (app, _) = test_app();
    let (alice_1, _) = signup_and_login(&app, "alice@example.com").await;
    let (alice_2, _) = login(&app, "alice@example.com").await;
    let (bob, _) = signup_and_login(&app, "bob@example.com").await;

    // Bob cannot revoke Alice's session; it reads as absent
    let uri = format!("/api/logout/{alice_2}");
    let (status, body) = send(&app, request("GET", &uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Session not found");

    // Alice's second session still authenticates
    let (status, body) = send(&app, request("GET", "/api/logout/unknown-id", Some(&alice_2), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Session not found");

    // Alice revokes it for real
    let (status, body) = send(&app, request("GET", &uri, Some(&alice_1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully logged out");

    // Revoking it again reports not-found, never an error
    let (status, body) = send(&app, request("GET", &uri, Some(&alice_1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Session not found");

    // The revoked session is unusable, the revoking one is untouched
    let (status, _) = send(&app, request("GET", "/api/logout", Some(&alice_2), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, request("GET", "/api/logout", Some(&alice_1), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_sessions_are_rejected_and_swept() {
    let (app, state) = test_app();
    let (_, user_id) = signup_and_login(&app, "sleeper@example.com").await;

    // Plant a session that expired a second ago
    let expired = chrono::Utc::now() - chrono::Duration::seconds(1);
    state.db.create_session("tok-expired", &user_id, expired).unwrap();

    let (status, body) = send(&app, request("GET", "/api/logout", Some("tok-expired"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    // The rejected attempt deleted the row
    assert!(state.db.get_session_with_user("tok-expired").unwrap().is_none());
}

#[tokio::test]
async fn article_crud_with_ownership_conflation() {
    let (app, _) = test_app();
    let (alice, alice_id) = signup_and_login(&app, "alice@example.com").await;
    let (bob, _) = signup_and_login(&app, "bob@example.com").await;

    let article_id = create_article(&app, &alice, "Original title").await;

    let (status, body) = send(&app, request("GET", &format!("/api/articles/{article_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["article"]["title"], "Original title");
    assert_eq!(body["article"]["authorId"], alice_id.as_str());
    assert!(body["article"]["publishedAt"].is_string());

    // A non-owner's edit fails exactly like a missing article: HTTP 200,
    // success false
    let edit = json!({ "title": "Hijacked", "content": "{}" });
    let uri = format!("/api/articles/{article_id}");
    let (status, body_foreign) = send(&app, request("PATCH", &uri, Some(&bob), Some(edit.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_foreign, json!({ "success": false, "error": "Article not found" }));

    let (_, body_missing) =
        send(&app, request("PATCH", "/api/articles/missing", Some(&bob), Some(edit.clone()))).await;
    assert_eq!(body_foreign, body_missing);

    let (_, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(body["article"]["title"], "Original title");

    // The owner's edit goes through
    let (status, body) = send(&app, request("PATCH", &uri, Some(&alice), Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Article has been successfully edited");
    let (_, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(body["article"]["title"], "Hijacked");

    // Same conflation for delete
    let (status, body) = send(&app, request("DELETE", &uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "error": "Article not found" }));

    let (status, body) = send(&app, request("DELETE", &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Article has been successfully deleted");

    let (status, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Article not found");
}

#[tokio::test]
async fn article_listing_pages_newest_first() {
    let (app, _) = test_app();

    let (status, body) = send(&app, request("GET", "/api/articles?limit=20&offset=0", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["articles"], json!([]));

    let (alice, _) = signup_and_login(&app, "alice@example.com").await;
    for title in ["First", "Second", "Third"] {
        create_article(&app, &alice, title).await;
    }

    let (_, body) = send(&app, request("GET", "/api/articles?limit=2&offset=0", None, None)).await;
    assert_eq!(body["count"], 3);
    let titles: Vec<&str> =
        body["articles"].as_array().unwrap().iter().map(|a| a["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Third", "Second"]);

    let (_, body) = send(&app, request("GET", "/api/articles?limit=2&offset=2", None, None)).await;
    assert_eq!(body["count"], 3);
    let titles: Vec<&str> =
        body["articles"].as_array().unwrap().iter().map(|a| a["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["First"]);

    // A zero limit is a valid empty page
    let (_, body) = send(&app, request("GET", "/api/articles?limit=0&offset=0", None, None)).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["articles"], json!([]));
}

#[tokio::test]
async fn comment_moderation_rules() {
    let (app, _) = test_app();
    let (alice, _) = signup_and_login(&app, "alice@example.com").await;
    let (bob, bob_id) = signup_and_login(&app, "bob@example.com").await;
    let (carol, _) = signup_and_login(&app, "carol@example.com").await;

    let article_id = create_article(&app, &alice, "Moderated").await;
    let comment_id = create_comment(&app, &bob, &article_id, "hot take").await;

    let (_, listing) = send(&app, request("GET", &format!("/api/comments/{article_id}"), None, None)).await;
    assert_eq!(listing["comments"][0]["authorId"], bob_id.as_str());
    assert_eq!(listing["comments"][0]["articleId"], article_id.as_str());

    // A third party cannot delete it, and the response admits nothing
    let uri = format!("/api/comments/{comment_id}");
    let (status, body) = send(&app, request("DELETE", &uri, Some(&carol), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "error": "Comment not found" }));
    let (_, listing) = send(&app, request("GET", &format!("/api/comments/{article_id}"), None, None)).await;
    assert_eq!(listing["comments"].as_array().unwrap().len(), 1);

    // The article's author moderates it away
    let (status, body) = send(&app, request("DELETE", &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment has been successfully deleted");

    // Gone means gone, even for the author who would have been allowed
    let (status, body) = send(&app, request("DELETE", &uri, Some(&carol), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "error": "Comment not found" }));

    // A commenter can always delete their own
    let own_id = create_comment(&app, &bob, &article_id, "second thoughts").await;
    let (status, body) =
        send(&app, request("DELETE", &format!("/api/comments/{own_id}"), Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment has been successfully deleted");
}

#[tokio::test]
async fn comment_on_missing_article_is_a_generic_failure() {
    let (app, _) = test_app();
    let (token, _) = signup_and_login(&app, "early@example.com").await;

    let payload = json!({ "content": "first!" });
    let (status, body) =
        send(&app, request("POST", "/api/comments/no-such-article", Some(&token), Some(payload))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn deleting_an_account_cascades_through_the_api() {
    let (app, _) = test_app();
    let (alice, alice_id) = signup_and_login(&app, "alice@example.com").await;
    let (bob, _) = signup_and_login(&app, "bob@example.com").await;

    let alices_article = create_article(&app, &alice, "Hers").await;
    let bobs_article = create_article(&app, &bob, "His").await;
    create_comment(&app, &bob, &alices_article, "bob was here").await;
    create_comment(&app, &alice, &bobs_article, "alice was here").await;

    let (status, body) = send(&app, request("DELETE", "/api/user", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User has been successfully deleted");

    // Sessions died with the account
    let (status, _) = send(&app, request("GET", "/api/logout", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Profile, article and her comments elsewhere are gone
    let (status, _) = send(&app, request("GET", &format!("/api/user/{alice_id}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        send(&app, request("GET", &format!("/api/articles/{alices_article}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listing) =
        send(&app, request("GET", &format!("/api/comments/{bobs_article}"), None, None)).await;
    assert_eq!(listing["comments"], json!([]));

    // Bob's world is intact
    let (status, body) =
        send(&app, request("GET", &format!("/api/articles/{bobs_article}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["article"]["title"], "His");
    let (_, body) = send(&app, request("GET", "/api/articles?limit=10&offset=0", None, None)).await;
    assert_eq!(body["count"], 1);
}
