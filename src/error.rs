//! Error types for the securememo library.
//!
//! Every failure in the document pipeline is reported through one enum,
//! [`MemoError`]. The pipeline never returns a partial artifact: the first
//! failing stage short-circuits the run and its error travels to the caller
//! unchanged in kind.
//!
//! Stage errors carry the [`Stage`] they originated from and, when the
//! remote service answered, its HTTP status plus the response body truncated
//! to [`MAX_BODY_BYTES`]. Whether a caller should re-run the whole pipeline
//! is answered by [`MemoError::is_retryable`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the response-body excerpt stored inside an error.
pub const MAX_BODY_BYTES: usize = 512;

/// The remote stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Generation,
    Upload,
    Protection,
    Polling,
    Download,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generation => "generation",
            Stage::Upload => "upload",
            Stage::Protection => "protection",
            Stage::Polling => "polling",
            Stage::Download => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors returned by the securememo library.
#[derive(Debug, Error)]
pub enum MemoError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// Credentials or other required settings are missing or invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// The template asset could not be read.
    #[error("Template '{path}' is unavailable: {reason}\nCheck MEMO_TEMPLATE_PATH points at a readable file.")]
    TemplateUnavailable { path: PathBuf, reason: String },

    /// The intake record is missing required data.
    #[error("Invalid intake record: {0}")]
    InvalidIntake(String),

    // ── Remote stage errors ───────────────────────────────────────────────
    /// The generation surface answered with a non-success status.
    #[error("Document generation failed ({status}): {body}")]
    GenerationFailed { status: u16, body: String },

    /// The upload endpoint answered with a non-success status.
    #[error("Document upload failed ({status}): {body}")]
    UploadFailed { status: u16, body: String },

    /// The protection request was rejected.
    #[error("Password protection request failed ({status}): {body}")]
    ProtectionRequestFailed { status: u16, body: String },

    /// A task-status request was rejected.
    #[error("Task status check failed ({status}): {body}")]
    StatusCheckFailed { status: u16, body: String },

    /// A success response lacked the field the stage needs.
    #[error("Malformed {stage} response: {detail}")]
    MalformedResponse {
        stage: Stage,
        detail: String,
        body: String,
    },

    /// The service reported the protection task as failed.
    #[error("Protection task {task_id} failed: {detail}")]
    TaskFailed { task_id: String, detail: String },

    /// The task never reached a terminal state within the attempt cap.
    #[error("Protection task {task_id} did not finish after {attempts} status checks ({}ms)", .elapsed.as_millis())]
    PollingTimeout {
        task_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The download endpoint answered with a non-success status.
    #[error("Protected document download failed ({status}): {body}")]
    DownloadFailed { status: u16, body: String },

    /// The request never produced an HTTP response (connect, TLS, timeout).
    #[error("Network error during {stage}: {detail}")]
    Transport { stage: Stage, detail: String },

    // ── Caller-side termination ───────────────────────────────────────────
    /// The caller cancelled the run.
    #[error("Document generation was cancelled")]
    Cancelled,

    /// The caller's deadline elapsed before the run finished.
    #[error("Document generation exceeded its {}ms deadline", .0.as_millis())]
    DeadlineExceeded(Duration),
}

impl MemoError {
    /// The stage this error originated from, if it came from a stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MemoError::GenerationFailed { .. } => Some(Stage::Generation),
            MemoError::UploadFailed { .. } => Some(Stage::Upload),
            MemoError::ProtectionRequestFailed { .. } => Some(Stage::Protection),
            MemoError::StatusCheckFailed { .. }
            | MemoError::TaskFailed { .. }
            | MemoError::PollingTimeout { .. } => Some(Stage::Polling),
            MemoError::DownloadFailed { .. } => Some(Stage::Download),
            MemoError::MalformedResponse { stage, .. } | MemoError::Transport { stage, .. } => {
                Some(*stage)
            }
            MemoError::Configuration(_)
            | MemoError::TemplateUnavailable { .. }
            | MemoError::InvalidIntake(_)
            | MemoError::Cancelled
            | MemoError::DeadlineExceeded(_) => None,
        }
    }

    /// Build the HTTP-failure variant matching `stage`.
    ///
    /// `body` is truncated to [`MAX_BODY_BYTES`].
    pub fn http_failure(stage: Stage, status: u16, body: &[u8]) -> Self {
        let body = truncate_body(body);
        match stage {
            Stage::Generation => MemoError::GenerationFailed { status, body },
            Stage::Upload => MemoError::UploadFailed { status, body },
            Stage::Protection => MemoError::ProtectionRequestFailed { status, body },
            Stage::Polling => MemoError::StatusCheckFailed { status, body },
            Stage::Download => MemoError::DownloadFailed { status, body },
        }
    }

    /// Build a [`MemoError::MalformedResponse`] with a truncated body excerpt.
    pub fn malformed(stage: Stage, detail: impl Into<String>, body: &[u8]) -> Self {
        MemoError::MalformedResponse {
            stage,
            detail: detail.into(),
            body: truncate_body(body),
        }
    }

    /// Whether re-running the whole pipeline with the same input may succeed.
    ///
    /// Timeouts and network trouble are worth another attempt with a fresh
    /// task; an explicit task failure or a 4xx answer is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            MemoError::PollingTimeout { .. }
            | MemoError::Transport { .. }
            | MemoError::DeadlineExceeded(_) => true,
            MemoError::GenerationFailed { status, .. }
            | MemoError::UploadFailed { status, .. }
            | MemoError::ProtectionRequestFailed { status, .. }
            | MemoError::StatusCheckFailed { status, .. }
            | MemoError::DownloadFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Lossily decode `body` and cut it to at most [`MAX_BODY_BYTES`] bytes,
/// never splitting a UTF-8 character.
pub fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_BODY_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_BODY_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failure_maps_to_stage_variant() {
        let e = MemoError::http_failure(Stage::Upload, 413, b"too large");
        assert!(matches!(e, MemoError::UploadFailed { status: 413, .. }));
        assert_eq!(e.stage(), Some(Stage::Upload));
        assert!(e.to_string().contains("413"));
        assert!(e.to_string().contains("too large"));

        let e = MemoError::http_failure(Stage::Download, 404, b"");
        assert!(matches!(e, MemoError::DownloadFailed { status: 404, .. }));
    }

    #[test]
    fn every_stage_round_trips_through_http_failure() {
        for stage in [
            Stage::Generation,
            Stage::Upload,
            Stage::Protection,
            Stage::Polling,
            Stage::Download,
        ] {
            assert_eq!(MemoError::http_failure(stage, 500, b"").stage(), Some(stage));
        }
    }

    #[test]
    fn local_failures_have_no_stage() {
        let e = MemoError::TemplateUnavailable {
            path: PathBuf::from("public/template.docx"),
            reason: "not found".into(),
        };
        assert_eq!(e.stage(), None);
        assert_eq!(MemoError::InvalidIntake("x".into()).stage(), None);
    }

    #[test]
    fn malformed_response_names_stage() {
        let e = MemoError::malformed(Stage::Protection, "no task id", b"{}");
        assert_eq!(e.stage(), Some(Stage::Protection));
        assert!(e.to_string().contains("protection"), "got: {e}");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_BODY_BYTES);
        let cut = truncate_body(body.as_bytes());
        assert!(cut.ends_with('\u{2026}'));
        assert!(cut.len() <= MAX_BODY_BYTES + '\u{2026}'.len_utf8());

        assert_eq!(truncate_body(b"short"), "short");
    }

    #[test]
    fn timeout_is_retryable_but_task_failure_is_not() {
        let timeout = MemoError::PollingTimeout {
            task_id: "t".into(),
            attempts: 15,
            elapsed: Duration::from_millis(21_000),
        };
        assert!(timeout.is_retryable());
        assert!(timeout.to_string().contains("15 status checks"));

        let failed = MemoError::TaskFailed {
            task_id: "t".into(),
            detail: "bad pdf".into(),
        };
        assert!(!failed.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(MemoError::http_failure(Stage::Generation, 503, b"").is_retryable());
        assert!(!MemoError::http_failure(Stage::Generation, 401, b"").is_retryable());
    }

    #[test]
    fn caller_side_errors_have_no_stage() {
        assert_eq!(MemoError::Cancelled.stage(), None);
        assert_eq!(
            MemoError::DeadlineExceeded(Duration::from_secs(5)).stage(),
            None
        );
    }
}
