//! Input validation, checked before any storage access.
//!
//! Length limits count characters, not bytes, so multi-byte input is not
//! penalized.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ApiError;

pub fn email(value: &str) -> Result<(), ApiError> {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(value) {
        return Err(ApiError::Validation {
            field: "email",
            message: "Invalid email format",
        });
    }

    Ok(())
}

pub fn password(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if !(8..=50).contains(&len) {
        return Err(ApiError::Validation {
            field: "password",
            message: "Password must be between 8 and 50 characters",
        });
    }

    Ok(())
}

pub fn article_title(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if !(1..=255).contains(&len) {
        return Err(ApiError::Validation {
            field: "title",
            message: "Title must be between 1 and 255 characters",
        });
    }

    Ok(())
}

/// The document itself is opaque; only emptiness is rejected.
pub fn article_content(value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::Validation {
            field: "content",
            message: "Content must not be empty",
        });
    }

    Ok(())
}

pub fn comment_content(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if !(1..=255).contains(&len) {
        return Err(ApiError::Validation {
            field: "content",
            message: "Content must be between 1 and 255 characters",
        });
    }

    Ok(())
}

/// Both paging parameters are required; `limit` is capped at 100.
pub fn page(limit: Option<&str>, offset: Option<&str>) -> Result<(i64, i64), ApiError> {
    let limit = match limit.map(str::parse::<i64>) {
        Some(Ok(n)) if (0..=100).contains(&n) => n,
        Some(_) => {
            return Err(ApiError::Validation {
                field: "limit",
                message: "Limit must be an integer between 0 and 100",
            });
        }
        None => {
            return Err(ApiError::Validation {
                field: "limit",
                message: "Limit is required",
            });
        }
    };

    let offset = match offset.map(str::parse::<i64>) {
        Some(Ok(n)) if n >= 0 => n,
        Some(_) => {
            return Err(ApiError::Validation {
                field: "offset",
                message: "Offset must be a non-negative integer",
            });
        }
        None => {
            return Err(ApiError::Validation {
                field: "offset",
                message: "Offset is required",
            });
        }
    };

    Ok((limit, offset))
}
