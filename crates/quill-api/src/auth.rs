use argon2::{
    PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::{error, info};
use uuid::Uuid;

use quill_types::api::{LoginRequest, LoginResponse, MessageResponse, SignupRequest};
use quill_types::models::Session;

use crate::error::ApiError;
use crate::guard;
use crate::state::{AppState, run_db};
use crate::validation;

const SESSION_TTL_DAYS: i64 = 14;

/// POST /api/signup — create an account.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::email(&req.email)?;
    validation::password(&req.password)?;

    // Fast-path duplicate check. The unique index on lower(email) is what
    // actually closes the race between concurrent signups.
    let email = req.email.clone();
    let exists = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .is_some();
    if exists {
        return Err(ApiError::EmailTaken);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = state
        .argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let user_id = Uuid::new_v4().to_string();
    let email = req.email.clone();
    let created = run_db(&state, move |db| {
        db.create_user(&user_id, &email, &password_hash, Utc::now())
    })
    .await?;
    if !created {
        // Lost the race to another signup with the same email
        return Err(ApiError::EmailTaken);
    }

    info!("New user signed up: {}", req.email);
    Ok(Json(MessageResponse {
        success: true,
        message: "User has been successfully created".to_string(),
    }))
}

/// POST /api/login — verify credentials and mint a session. Unknown email
/// and wrong password produce byte-identical error bodies.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::email(&req.email)?;
    validation::password(&req.password)?;

    let email = req.email.clone();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("Corrupt password hash for user {}: {}", user.id, e);
        ApiError::Internal
    })?;

    state
        .argon2
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

    let session_id = token.clone();
    let user_id = user.id.clone();
    run_db(&state, move |db| {
        db.create_session(&session_id, &user_id, expires_at)
    })
    .await?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        success: true,
        session: Session {
            id: token,
            user_id: user.id,
            expires_at,
        },
    }))
}

/// GET /api/logout — revoke the current session.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;

    let session_id = auth.session.id;
    run_db(&state, move |db| db.delete_session(&session_id)).await?;

    info!("User {} logged out", auth.user.id);
    Ok(Json(MessageResponse {
        success: true,
        message: "Successfully logged out".to_string(),
    }))
}

/// GET /api/logout/{id} — revoke one of the caller's sessions by id. A
/// session that is not the caller's reads as absent rather than forbidden.
pub async fn logout_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth = guard::authenticate(&state, &headers).await?;

    let user_id = auth.user.id.clone();
    let revoked = run_db(&state, move |db| db.delete_user_session(&id, &user_id)).await?;

    if !revoked {
        return Ok(Json(MessageResponse {
            success: false,
            message: "Session not found".to_string(),
        }));
    }

    // Session ids are bearer tokens, so the revoked id stays out of the log
    info!("User {} revoked one of their sessions", auth.user.id);
    Ok(Json(MessageResponse {
        success: true,
        message: "Successfully logged out".to_string(),
    }))
}

/// Mint an opaque bearer token: 32 bytes from the thread-local CSPRNG,
/// base64url without padding.
fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
