//! Response adapter: pipeline results → HTTP responses.
//!
//! * [`MemoDocument`] → `200 OK`, `application/pdf`, attachment disposition
//! * [`ApiError`]     → `500` (`401` for authentication) plus
//!   `{ "error": "<message>" }`
//!
//! Error messages can quote remote response bodies, and some services echo
//! request headers back. Before a message leaves the process it goes through
//! a [`Redactor`] holding every configured secret.

use crate::auth::AuthError;
use crate::error::MemoError;
use crate::orchestrator::MemoDocument;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

static RE_UNSAFE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 ._-]").unwrap());

const REDACTED: &str = "[redacted]";

/// Values shorter than this are never scrubbed.
pub const MIN_SECRET_LEN: usize = 6;

/// Replaces configured secret values inside outbound messages.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .filter(|s| {
                let usable = s.trim().chars().count() >= MIN_SECRET_LEN;
                if !usable && !s.trim().is_empty() {
                    warn!("Ignoring a {}-character secret for redaction", s.chars().count());
                }
                usable
            })
            .collect();
        // Longest first so a secret containing another is replaced whole.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        secrets.dedup();
        Self { secrets }
    }

    pub fn scrub(&self, message: &str) -> String {
        self.secrets
            .iter()
            .fold(message.to_string(), |msg, secret| msg.replace(secret.as_str(), REDACTED))
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

/// JSON error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failure ready to be sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Every pipeline failure, including a bad intake, is a `500` with the
    /// scrubbed message.
    pub fn from_memo(error: &MemoError, redactor: &Redactor) -> Self {
        Self::internal(redactor.scrub(&error.to_string()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Self::unauthorized(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// `Content-Disposition` value for `filename`.
///
/// The quoted `filename` keeps only `[A-Za-z0-9 ._-]`; if anything had to be
/// replaced, an RFC 5987 `filename*` carries the exact name as well.
pub fn content_disposition(filename: &str) -> String {
    let safe = RE_UNSAFE_FILENAME.replace_all(filename, "_");
    if safe == filename {
        format!("attachment; filename=\"{safe}\"")
    } else {
        format!(
            "attachment; filename=\"{safe}\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}

impl IntoResponse for MemoDocument {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&content_disposition(&self.filename))
            .unwrap_or_else(|e| {
                warn!("Unusable filename '{}': {}", self.filename, e);
                HeaderValue::from_static("attachment")
            });
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}
